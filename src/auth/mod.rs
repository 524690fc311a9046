pub mod password;
pub mod session;
pub mod token;

pub use password::{hash_password, verify_password, PasswordError};
pub use session::Session;
pub use token::{AccessTokenClaims, TokenService};

/// Inserted into request extensions by `auth_middleware` alongside the
/// authenticated `User`, so handlers that need to revoke the current
/// session (logout) don't have to re-parse the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct CurrentSession(pub uuid::Uuid);
