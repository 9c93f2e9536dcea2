use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserProfile;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Distinguishes short-lived access tokens from long-lived refresh tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried inside every issued token; never persisted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub email: String,
    pub jti: Uuid,
    pub token_type: TokenKind,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Carries a raw password, so no Debug
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Username or email
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_claims_serialization() {
        let claims = TokenClaims {
            sub: Uuid::new_v4(),
            email: "e1@x.com".to_string(),
            jti: Uuid::new_v4(),
            token_type: TokenKind::Refresh,
            iat: 1234567800,
            nbf: 1234567800,
            exp: 1234567890,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("\"token_type\":\"refresh\""));
        assert!(json.contains("e1@x.com"));

        let deserialized: TokenClaims = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, claims);
    }

    #[test]
    fn test_unknown_token_kind_rejected() {
        let json = r#""session""#;
        assert!(serde_json::from_str::<TokenKind>(json).is_err());
    }
}
