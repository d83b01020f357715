//! `plantops-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it issues and
//! verifies signed session credentials and answers role questions about them.

pub mod claims;
pub mod codec;
pub mod password;
pub mod roles;
pub mod service;

pub use claims::SessionClaims;
pub use codec::{TokenCodec, TokenError};
pub use password::{PasswordError, hash_password, verify_password};
pub use roles::Role;
pub use service::{AuthError, TokenService, authorize_role};
