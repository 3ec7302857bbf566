//! Service layer modules for external integrations.
//!
//! Redis caching, the transactional email API client with its message
//! builders, and PDF rendering.

pub mod cache;
pub mod email;
pub mod mailer;
pub mod pdf;

pub use cache::RedisCache;
pub use email::EmailClient;
