use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::types::{TokenClaims, TokenKind};
use crate::config::AuthConfig;
use crate::shared::AppError;
use crate::user::UserModel;

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// A freshly signed token together with the claims inside it
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
    pub expires_at: DateTime<Utc>,
}

/// Stateless signer and verifier for bearer tokens
///
/// Knows nothing about persisted revocation state: a token that verifies here
/// may still have been revoked in the refresh token store.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(
            config.signing_secret(),
            config.access_token_ttl,
            config.refresh_token_ttl,
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn generate_access(&self, user: &UserModel) -> Result<IssuedToken, AppError> {
        self.generate(user, TokenKind::Access, self.access_ttl)
    }

    pub fn generate_refresh(&self, user: &UserModel) -> Result<IssuedToken, AppError> {
        self.generate(user, TokenKind::Refresh, self.refresh_ttl)
    }

    pub fn validate_access(&self, token: &str) -> Result<TokenClaims, AppError> {
        self.validate(token, TokenKind::Access)
    }

    pub fn validate_refresh(&self, token: &str) -> Result<TokenClaims, AppError> {
        self.validate(token, TokenKind::Refresh)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    fn generate(
        &self,
        user: &UserModel,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = TokenClaims {
            sub: user.id,
            email: user.email.clone(),
            jti: Uuid::new_v4(),
            token_type: kind,
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        debug!(
            token_id = %claims.jti,
            exp_timestamp = claims.exp,
            "Signing token"
        );

        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| {
                debug!(error = %e, "Failed to encode JWT token");
                AppError::JwtError(e.to_string())
            })?;

        Ok(IssuedToken {
            token,
            claims,
            expires_at,
        })
    }

    /// Signature, algorithm, time window and claim shape; every failure is `InvalidToken`
    #[instrument(skip(self, token))]
    fn validate(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, AppError> {
        let header = decode_header(token).map_err(|e| {
            debug!(error = %e, "Malformed token header");
            AppError::InvalidToken
        })?;
        if header.alg != SIGNING_ALGORITHM {
            debug!(alg = ?header.alg, "Rejecting token signed with unexpected algorithm");
            return Err(AppError::InvalidToken);
        }

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &Self::validation())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Failed to decode JWT token");
                AppError::InvalidToken
            })?;

        if claims.token_type != expected {
            debug!(
                token_id = %claims.jti,
                actual = ?claims.token_type,
                "Token kind does not match"
            );
            return Err(AppError::InvalidToken);
        }

        debug!(user_id = %claims.sub, token_id = %claims.jti, "JWT token decoded successfully");
        Ok(claims)
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);
        validation
    }
}
