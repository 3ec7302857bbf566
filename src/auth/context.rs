use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Claims;

/// Authenticated admin extracted from a session token
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub admin_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl AdminContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        if claims.role != super::claims::ADMIN_ROLE {
            return Err("Token does not carry the admin role");
        }

        let admin_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid admin ID in token")?;
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or("Invalid expiry in token")?;

        Ok(Self {
            admin_id,
            email: claims.email.clone(),
            name: claims.name.clone(),
            expires_at,
        })
    }
}
