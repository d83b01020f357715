//! Role gates for the HTTP surface.
//!
//! Every role-gated handler routes through [`require_role`] with one of the
//! tier constants below; no handler carries its own role-list literals.

use axum::http::StatusCode;
use axum::response::Response;

use plantops_auth::Role;

use crate::app::errors::json_error;
use crate::context::CurrentUser;

/// Account administration, config and destructive operations.
pub const ADMIN_TIER: &[Role] = &[Role::Admin, Role::Owner];

/// Day-to-day business record management.
pub const MANAGE_TIER: &[Role] = &[Role::Admin, Role::Manager, Role::Owner];

/// Production-batch planning.
pub const PRODUCTION_TIER: &[Role] = &[Role::Admin, Role::Owner, Role::ProductionManager];

/// Check the authenticated user's role against an allowed set.
pub fn require_role(user: &CurrentUser, allowed: &[Role]) -> Result<(), Response> {
    plantops_auth::authorize_role(user.role, allowed).map_err(|_| {
        tracing::warn!(user_id = %user.user_id, role = %user.role, "role gate refused request");
        json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "access denied: insufficient permissions",
        )
    })
}
