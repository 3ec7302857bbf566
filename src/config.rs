use anyhow::{bail, Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `LOG_FORMAT` when set, otherwise JSON in production only.
    pub fn resolve(value: Option<&str>, env: &Environment) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("json") => Self::Json,
            Some("pretty") | Some("text") => Self::Pretty,
            _ if env.is_prod() => Self::Json,
            _ => Self::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,
    pub log_format: LogFormat,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,
    pub run_migrations: bool,

    // Redis
    pub redis_url: String,
    pub redis_cache_ttl_seconds: u64,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Admin sessions
    pub admin_jwt_secret: String,
    pub admin_jwt_issuer: String,
    pub admin_session_ttl_seconds: u64,

    // Transactional email
    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub admin_notification_email: Option<String>,
    pub email_timeout_seconds: u64,

    // Public site (used for shared quotation links)
    pub public_site_url: String,
}

/// Minimum length of the HMAC secret used to sign admin sessions.
pub const MIN_JWT_SECRET_LEN: usize = 32;

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let log_format = LogFormat::resolve(env::var("LOG_FORMAT").ok().as_deref(), &env);

        // Database
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let database_max_connections = parse_or("DATABASE_MAX_CONNECTIONS", 10);
        let run_migrations = env::var("RUN_MIGRATIONS")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        // Redis
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://redis:6379/0".to_string());
        let redis_cache_ttl_seconds = parse_or("REDIS_CACHE_TTL_SECONDS", 3600);

        // CORS
        let cors_allow_origins = split_list(
            &env::var("CORS_ALLOW_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
        );

        // Admin sessions
        let admin_jwt_secret =
            env::var("ADMIN_JWT_SECRET").context("ADMIN_JWT_SECRET must be set")?;
        if admin_jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!(
                "ADMIN_JWT_SECRET must be at least {} bytes long",
                MIN_JWT_SECRET_LEN
            );
        }
        let admin_jwt_issuer =
            env::var("ADMIN_JWT_ISSUER").unwrap_or_else(|_| "folio-backend".to_string());
        let admin_session_ttl_seconds = parse_or("ADMIN_SESSION_TTL_SECONDS", 28_800); // 8 hours

        // Transactional email
        let email_api_url =
            env::var("EMAIL_API_URL").unwrap_or_else(|_| "https://api.resend.com".to_string());
        let email_api_key = non_empty(env::var("EMAIL_API_KEY").ok());
        let email_from =
            env::var("EMAIL_FROM").unwrap_or_else(|_| "Folio <noreply@localhost>".to_string());
        let admin_notification_email = non_empty(env::var("ADMIN_NOTIFICATION_EMAIL").ok());
        let email_timeout_seconds = parse_or("EMAIL_TIMEOUT_SECONDS", 15);

        let public_site_url = env::var("PUBLIC_SITE_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        url::Url::parse(&public_site_url).context("PUBLIC_SITE_URL must be a valid URL")?;

        Ok(Settings {
            env,
            server_addr,
            log_format,
            database_url,
            database_max_connections,
            run_migrations,
            redis_url,
            redis_cache_ttl_seconds,
            cors_allow_origins,
            admin_jwt_secret,
            admin_jwt_issuer,
            admin_session_ttl_seconds,
            email_api_url,
            email_api_key,
            email_from,
            admin_notification_email,
            email_timeout_seconds,
            public_site_url,
        })
    }

    /// Public link for a shared quotation.
    pub fn shared_quotation_url(&self, share_token: &str) -> String {
        format!(
            "{}/q/{}",
            self.public_site_url.trim_end_matches('/'),
            share_token
        )
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        env: Environment::Dev,
        server_addr: "127.0.0.1:0".to_string(),
        log_format: LogFormat::Pretty,
        database_url: "postgres://localhost/folio_test".to_string(),
        database_max_connections: 1,
        run_migrations: false,
        redis_url: "redis://127.0.0.1:6379/0".to_string(),
        redis_cache_ttl_seconds: 60,
        cors_allow_origins: vec!["http://localhost:3000".to_string()],
        admin_jwt_secret: "test-secret-test-secret-test-secret!".to_string(),
        admin_jwt_issuer: "folio-test".to_string(),
        admin_session_ttl_seconds: 3600,
        email_api_url: "http://127.0.0.1:9".to_string(),
        email_api_key: None,
        email_from: "Folio <noreply@example.com>".to_string(),
        admin_notification_email: Some("owner@example.com".to_string()),
        email_timeout_seconds: 5,
        public_site_url: "https://folio.example.com/".to_string(),
    }
}
