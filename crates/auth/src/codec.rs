//! Compact token codec: HMAC-SHA256 over base64url segments.
//!
//! A token is `base64url(header) . base64url(payload) . base64url(mac)`,
//! all segments unpadded. The MAC covers the first two segments exactly as
//! they appear in the token, so verification never re-serializes the payload.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::SessionClaims;

type HmacSha256 = Hmac<Sha256>;

/// Fixed header segment; the codec speaks exactly one algorithm.
const HEADER: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The string does not have the expected three-segment shape, or a
    /// segment is not decodable.
    #[error("malformed token")]
    Malformed,

    /// The supplied signature does not match the recomputed MAC.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Signature is valid but `expires_at` is in the past.
    #[error("token has expired")]
    Expired,
}

/// Encodes and decodes signed claims with a server-held secret.
///
/// Pure function pair: no IO, no clock of its own (`decode` takes `now`).
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl TokenCodec {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Serialize and sign a claims set.
    pub fn encode(&self, claims: &SessionClaims) -> String {
        let payload =
            serde_json::to_vec(claims).expect("session claims always serialize to JSON");

        let header_b64 = URL_SAFE_NO_PAD.encode(HEADER.as_bytes());
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload);

        let mac = self.mac_over(&header_b64, &payload_b64).finalize().into_bytes();
        let signature_b64 = URL_SAFE_NO_PAD.encode(mac);

        format!("{header_b64}.{payload_b64}.{signature_b64}")
    }

    /// Verify signature and expiry, returning the embedded claims.
    ///
    /// Failure order: shape errors first, then signature (constant-time
    /// compare), then expiry. A token with a bad signature is never reported
    /// as expired.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let mut segments = token.split('.');
        let (header_b64, payload_b64, signature_b64) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(h), Some(p), Some(s), None) => (h, p, s),
                _ => return Err(TokenError::Malformed),
            };

        // An undecodable signature segment can never match the recomputed
        // MAC, so it is classified as a signature failure, not a shape one.
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::InvalidSignature)?;

        self.mac_over(header_b64, payload_b64)
            .verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: SessionClaims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.is_expired(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn mac_over(&self, header_b64: &str, payload_b64: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use chrono::{Duration, TimeZone};
    use plantops_core::UserId;
    use proptest::prelude::*;

    fn claims_at(issued: DateTime<Utc>) -> SessionClaims {
        SessionClaims {
            subject_id: UserId::new(42),
            email: "ops@example.com".to_string(),
            role: Role::Supervisor,
            issued_at: issued,
            expires_at: issued + Duration::days(7),
            issuer: "plantops".to_string(),
            audience: "plantops-clients".to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn round_trip_preserves_claims() {
        let codec = TokenCodec::new(b"test-secret".to_vec());
        let claims = claims_at(now());

        let token = codec.encode(&claims);
        let decoded = codec.decode(&token, now()).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let codec = TokenCodec::new(b"test-secret".to_vec());

        assert_eq!(codec.decode("", now()), Err(TokenError::Malformed));
        assert_eq!(codec.decode("a.b", now()), Err(TokenError::Malformed));
        assert_eq!(codec.decode("a.b.c.d", now()), Err(TokenError::Malformed));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let codec = TokenCodec::new(b"test-secret".to_vec());
        let token = codec.encode(&claims_at(now()));

        // Flip one character in every position of the signature segment.
        let dot = token.rfind('.').unwrap();
        let (head, signature) = (&token[..dot], &token[dot + 1..]);
        for i in 0..signature.len() {
            let mut sig: Vec<u8> = signature.bytes().collect();
            sig[i] = if sig[i] == b'A' { b'B' } else { b'A' };
            let tampered = format!("{}.{}", head, String::from_utf8(sig).unwrap());
            assert_eq!(
                codec.decode(&tampered, now()),
                Err(TokenError::InvalidSignature),
                "tamper at signature byte {i} must be detected"
            );
        }
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let codec = TokenCodec::new(b"test-secret".to_vec());
        let token = codec.encode(&claims_at(now()));

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"sub":1,"email":"x","role":"admin"}"#);
        parts[1] = &forged_payload;
        let forged = parts.join(".");

        assert_eq!(codec.decode(&forged, now()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn different_secret_is_rejected() {
        let codec = TokenCodec::new(b"secret-a".to_vec());
        let other = TokenCodec::new(b"secret-b".to_vec());
        let token = codec.encode(&claims_at(now()));

        assert_eq!(other.decode(&token, now()), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn expired_token_with_valid_signature_is_expired() {
        let codec = TokenCodec::new(b"test-secret".to_vec());
        let issued = now() - Duration::days(30);
        let token = codec.encode(&claims_at(issued));

        assert_eq!(codec.decode(&token, now()), Err(TokenError::Expired));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let codec = TokenCodec::new(b"test-secret".to_vec());
        let claims = claims_at(now());
        let token = codec.encode(&claims);

        // One second before expiry decodes; at expiry it does not.
        assert!(codec.decode(&token, claims.expires_at - Duration::seconds(1)).is_ok());
        assert_eq!(
            codec.decode(&token, claims.expires_at),
            Err(TokenError::Expired)
        );
    }

    proptest! {
        #[test]
        fn round_trip_any_subject(subject in 1i64..1_000_000, email in "[a-z]{1,12}@[a-z]{1,8}\\.com") {
            let codec = TokenCodec::new(b"prop-secret".to_vec());
            let mut claims = claims_at(now());
            claims.subject_id = UserId::new(subject);
            claims.email = email;

            let decoded = codec.decode(&codec.encode(&claims), now()).unwrap();
            prop_assert_eq!(decoded, claims);
        }

        #[test]
        fn garbage_never_panics(token in "\\PC{0,64}") {
            let codec = TokenCodec::new(b"prop-secret".to_vec());
            let _ = codec.decode(&token, now());
        }
    }
}
