use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plantops_core::UserId;

use crate::Role;

/// Session claims carried by every issued token.
///
/// Immutable once issued; a claims set dies by expiry only (there is no
/// server-side revocation in this design).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the authenticated user.
    #[serde(rename = "sub")]
    pub subject_id: UserId,

    /// Email of the subject at issue time.
    pub email: String,

    /// Role granted to the subject at issue time.
    pub role: Role,

    /// Issued-at timestamp (serialized as Unix seconds).
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp (serialized as Unix seconds).
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    /// Issuer identifier.
    #[serde(rename = "iss")]
    pub issuer: String,

    /// Intended audience.
    #[serde(rename = "aud")]
    pub audience: String,
}

impl SessionClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
