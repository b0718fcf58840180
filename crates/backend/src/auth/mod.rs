//! Authentication module for JWT-based auth.
//!
//! Credential checks live with the identity provider; this module only
//! resolves an inbound request to a user identity:
//! - JWT token creation and validation
//! - `require_auth` middleware for protecting routes
//! - `extract_auth_user` for handlers that need the caller's identity

mod handlers;
pub mod jwt;
mod middleware;
pub mod types;

pub use handlers::auth_me;
pub use middleware::{extract_auth_user, require_auth};
