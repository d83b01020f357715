//! Domain-level token issuance and checking.

use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;

use plantops_core::UserId;

use crate::{Role, SessionClaims, TokenCodec};

/// Fixed issuance policy: tokens live for seven days.
const TOKEN_TTL_DAYS: i64 = 7;

const ISSUER: &str = "plantops";
const AUDIENCE: &str = "plantops-clients";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, malformed, tampered or expired credential.
    #[error("unauthorized")]
    Unauthorized,

    /// Valid credential whose role is not in the allowed set.
    #[error("forbidden")]
    Forbidden,
}

/// Issues and checks session tokens for this application.
///
/// The signing secret is injected at construction; nothing in this crate
/// reads process-global state.
pub struct TokenService {
    codec: TokenCodec,
}

impl TokenService {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            codec: TokenCodec::new(secret),
        }
    }

    /// Issue a token for an authenticated user.
    ///
    /// Timestamps are truncated to whole seconds so a decoded claims set
    /// compares equal to the issued one.
    pub fn issue(&self, subject_id: UserId, email: &str, role: Role) -> String {
        let issued_at = whole_seconds(Utc::now());
        let claims = SessionClaims {
            subject_id,
            email: email.to_string(),
            role,
            issued_at,
            expires_at: issued_at + Duration::days(TOKEN_TTL_DAYS),
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
        };
        self.codec.encode(&claims)
    }

    /// Verify a presented token.
    ///
    /// Every codec failure collapses to `Unauthorized`; the HTTP boundary
    /// turns that into a 401. The reason is still recorded for operators.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.codec.decode(token, Utc::now()).map_err(|e| {
            tracing::warn!(reason = %e, "token verification failed");
            AuthError::Unauthorized
        })
    }

    /// Verify a token and require that its role is one of `allowed`.
    pub fn require_role(&self, token: &str, allowed: &[Role]) -> Result<SessionClaims, AuthError> {
        let claims = self.verify(token)?;
        authorize_role(claims.role, allowed)?;
        Ok(claims)
    }
}

/// The single role-gate policy check.
///
/// Every role-gated surface routes through this function instead of
/// re-implementing membership tests per endpoint.
pub fn authorize_role(role: Role, allowed: &[Role]) -> Result<(), AuthError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

fn whole_seconds(now: DateTime<Utc>) -> DateTime<Utc> {
    match Utc.timestamp_opt(now.timestamp(), 0) {
        chrono::offset::LocalResult::Single(t) => t,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies() {
        let tokens = TokenService::new(b"svc-secret".to_vec());
        let token = tokens.issue(UserId::new(7), "lead@example.com", Role::Manager);

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.subject_id, UserId::new(7));
        assert_eq!(claims.email, "lead@example.com");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.issuer, "plantops");
        assert_eq!(claims.audience, "plantops-clients");
        assert_eq!(
            claims.expires_at - claims.issued_at,
            Duration::days(TOKEN_TTL_DAYS)
        );
    }

    #[test]
    fn verify_collapses_failures_to_unauthorized() {
        let tokens = TokenService::new(b"svc-secret".to_vec());
        let other = TokenService::new(b"another-secret".to_vec());
        let token = other.issue(UserId::new(1), "a@b.com", Role::Admin);

        assert_eq!(tokens.verify("not-a-token"), Err(AuthError::Unauthorized));
        assert_eq!(tokens.verify(&token), Err(AuthError::Unauthorized));
    }

    #[test]
    fn viewer_is_forbidden_for_admin_surface() {
        let tokens = TokenService::new(b"svc-secret".to_vec());
        let token = tokens.issue(UserId::new(9), "v@example.com", Role::Viewer);

        let result = tokens.require_role(&token, &[Role::Admin, Role::Owner]);
        assert_eq!(result.unwrap_err(), AuthError::Forbidden);
    }

    #[test]
    fn allowed_role_passes_gate() {
        let tokens = TokenService::new(b"svc-secret".to_vec());
        let token = tokens.issue(UserId::new(9), "o@example.com", Role::Owner);

        let claims = tokens
            .require_role(&token, &[Role::Admin, Role::Owner])
            .unwrap();
        assert_eq!(claims.role, Role::Owner);
    }

    #[test]
    fn role_gate_is_exact_membership() {
        assert!(authorize_role(Role::Admin, &[Role::Admin]).is_ok());
        assert_eq!(
            authorize_role(Role::ProductionManager, &[Role::Admin, Role::Manager]),
            Err(AuthError::Forbidden)
        );
    }
}
