use serde::{Deserialize, Serialize};

/// Role claim carried by every back-office session
pub const ADMIN_ROLE: &str = "admin";

/// Audience of back-office session tokens
pub const ADMIN_AUDIENCE: &str = "folio-admin";

/// JWT claims of an admin session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (admin user ID)
    pub sub: String,

    pub aud: String,

    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    pub email: String,

    /// Display name
    #[serde(default)]
    pub name: Option<String>,

    pub role: String,
}
