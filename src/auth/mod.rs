pub mod claims;
pub mod context;
pub mod middleware;
pub mod tokens;

pub use claims::Claims;
pub use context::AdminContext;
pub use middleware::RequireAdmin;
pub use tokens::SessionSigner;
