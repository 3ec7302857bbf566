//! Admin session tokens (HS256 JWTs)

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

use super::claims::{Claims, ADMIN_AUDIENCE, ADMIN_ROLE};
use crate::domain::admin::AdminUser;

/// A freshly issued session token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies admin session tokens
#[derive(Clone)]
pub struct SessionSigner {
    keys: Arc<Keys>,
    issuer: String,
    ttl: Duration,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionSigner {
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
            issuer: issuer.into(),
            ttl: Duration::seconds(ttl_seconds as i64),
        }
    }

    pub fn issue(&self, admin: &AdminUser) -> Result<IssuedToken> {
        self.issue_at(admin, Utc::now())
    }

    fn issue_at(&self, admin: &AdminUser, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: admin.id.to_string(),
            aud: ADMIN_AUDIENCE.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            email: admin.email.clone(),
            name: Some(admin.full_name.clone()),
            role: ADMIN_ROLE.to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .context("Failed to sign session token")?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, issuer, audience and expiry
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[ADMIN_AUDIENCE]);
        validation.validate_exp = true;
        validation.leeway = 30;

        let data = decode::<Claims>(token, &self.keys.decoding, &validation)
            .context("Session token validation failed")?;

        Ok(data.claims)
    }
}
