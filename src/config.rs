use chrono::Duration;
use std::fmt;

use crate::password::PasswordPolicy;
use crate::shared::AppError;

const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 15;
const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 30;

/// Settings consumed by the identity layer
#[derive(Clone)]
pub struct AuthConfig {
    signing_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub password_policy: PasswordPolicy,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    pub fn new(
        signing_secret: impl Into<String>,
        access_token_ttl: Duration,
        refresh_token_ttl: Duration,
    ) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            access_token_ttl,
            refresh_token_ttl,
            password_policy: PasswordPolicy::default(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Reads settings from the environment. `JWT_SECRET` is required;
    /// everything else falls back to defaults.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let signing_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| AppError::Config("JWT_SECRET must be set and non-empty".to_string()))?;

        let parse = |key: &str| lookup(key).and_then(|s| s.parse().ok());
        let access_minutes = parse("ACCESS_TOKEN_TTL_MINUTES")
            .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_MINUTES);
        let refresh_days =
            parse("REFRESH_TOKEN_TTL_DAYS").unwrap_or(DEFAULT_REFRESH_TOKEN_TTL_DAYS);

        let mut password_policy = PasswordPolicy::default();
        if let Some(min_length) = lookup("PASSWORD_MIN_LENGTH").and_then(|s| s.parse().ok()) {
            password_policy.min_length = min_length;
        }

        Ok(Self {
            signing_secret,
            access_token_ttl: Duration::minutes(access_minutes),
            refresh_token_ttl: Duration::days(refresh_days),
            password_policy,
            bcrypt_cost: lookup("BCRYPT_COST")
                .and_then(|s| s.parse().ok())
                .unwrap_or(bcrypt::DEFAULT_COST),
        })
    }

    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn signing_secret(&self) -> &[u8] {
        self.signing_secret.as_bytes()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("signing_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("password_policy", &self.password_policy)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_missing_secret_is_a_config_error() {
        let result = AuthConfig::from_lookup(lookup_from(&[("ACCESS_TOKEN_TTL_MINUTES", "5")]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_blank_secret_is_a_config_error() {
        let result = AuthConfig::from_lookup(lookup_from(&[("JWT_SECRET", "   ")]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_lookup_applies_overrides_and_defaults() {
        let config = AuthConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "from-env"),
            ("ACCESS_TOKEN_TTL_MINUTES", "5"),
            ("PASSWORD_MIN_LENGTH", "12"),
            ("BCRYPT_COST", "not-a-number"),
        ]))
        .unwrap();

        assert_eq!(config.signing_secret(), b"from-env");
        assert_eq!(config.access_token_ttl, Duration::minutes(5));
        assert_eq!(config.refresh_token_ttl, Duration::days(DEFAULT_REFRESH_TOKEN_TTL_DAYS));
        assert_eq!(config.password_policy.min_length, 12);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = AuthConfig::new("super-secret", Duration::minutes(5), Duration::days(1));
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_new_uses_default_policy_and_cost() {
        let config = AuthConfig::new("secret", Duration::minutes(5), Duration::days(1));

        assert_eq!(config.password_policy.min_length, 8);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.signing_secret(), b"secret");
    }
}
