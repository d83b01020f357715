use plantops_auth::{Role, SessionClaims};
use plantops_core::UserId;

/// Authenticated identity for a request, derived from verified claims by the
/// auth middleware and carried as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

impl From<SessionClaims> for CurrentUser {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.subject_id,
            email: claims.email,
            role: claims.role,
        }
    }
}
