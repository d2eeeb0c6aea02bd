//! JWT utility module.
//!
//! Session tokens are issued by the desk's authentication service and
//! verified here with the shared secret.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::config::{get_env, APP_CONFIG};
use crate::error::AppResult;

/// Minimum recommended length for JWT secrets.
const MIN_SECRET_LENGTH: usize = 32;

static JWT_SECRET: Lazy<String> = Lazy::new(|| {
    let secret = get_env("JWT_SECRET", None);

    if secret.is_empty() {
        assert!(
            !APP_CONFIG.is_production,
            "JWT_SECRET must be set in production environment"
        );
        tracing::warn!(
            "JWT_SECRET not set - using insecure default. \
             Set RUST_ENV=production to enforce security requirements."
        );
        "default-secret-change-me-in-production".to_string()
    } else if secret.len() < MIN_SECRET_LENGTH {
        tracing::warn!(
            "JWT_SECRET is shorter than {} characters. \
             Consider using a longer secret for better security.",
            MIN_SECRET_LENGTH
        );
        secret
    } else {
        secret
    }
});

static JWT_EXPIRATION: Lazy<i64> = Lazy::new(|| {
    get_env("JWT_EXPIRATION_HOURS", Some("12"))
        .parse()
        .unwrap_or(12)
});

/// Session claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Login id of the desk user
    pub sub: String,
    /// Access level (`L1`, `L2`, `ADMIN`) when the issuer includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Issues a session token for `subject`.
#[must_use = "the generated token should be used"]
pub fn gen_token(subject: &str, level: Option<&str>) -> AppResult<String> {
    let now = chrono::Utc::now().timestamp();
    let exp = now + (*JWT_EXPIRATION * 3600);

    let claims = Claims {
        sub: subject.to_string(),
        level: level.map(str::to_string),
        exp,
        iat: now,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )?;

    Ok(token)
}

/// Parses and validates a session token.
#[must_use = "the parsed claims should be used"]
pub fn parse_token(token: &str) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
