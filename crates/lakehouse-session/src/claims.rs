//! # Credential Decoding
//!
//! Structural parsing of a bearer credential's payload segment.
//!
//! ## Trust boundary
//!
//! The client never holds the verification key. The signature segment is
//! ignored and `exp` is not compared against the clock. Decoded claims are
//! advisory: they pick which screen to show and what name to display.
//! Every authorization decision stays on the server, which re-validates
//! the credential on each request.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::credential::Credential;
use crate::error::DecodeError;

/// Role carried by a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sees every user's documents.
    Admin,
    /// Sees only their own uploads.
    User,
}

impl Role {
    /// Parse the role claim as issued by the backend.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    /// Wire name of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity attributes decoded from a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username the credential was issued to.
    pub subject: String,
    /// Role used for dashboard routing.
    pub role: Role,
    /// Expiry, seconds since the Unix epoch.
    pub expiry: u64,
    /// Numeric account id, when the issuer includes one.
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl Claims {
    /// Whether the role claim is `admin`.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Decode the payload segment of `credential` into [`Claims`].
///
/// Purely structural: no signature check, no expiry check, no I/O.
///
/// # Errors
///
/// * [`DecodeError::Malformed`] - not exactly three dot-separated segments
/// * [`DecodeError::InvalidEncoding`] - payload is not base64url
/// * [`DecodeError::InvalidPayload`] - payload is not a JSON object
/// * [`DecodeError::MissingClaim`] - `sub`/`username`, `role` or `exp` absent
/// * [`DecodeError::UnknownRole`] - role is neither `admin` nor `user`
pub fn decode(credential: &Credential) -> Result<Claims, DecodeError> {
    let payload = payload_segment(credential.as_str())?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))?;

    let object: Map<String, Value> = match serde_json::from_slice(&bytes) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(DecodeError::InvalidPayload(
                "payload is not a JSON object".to_string(),
            ))
        }
        Err(e) => return Err(DecodeError::InvalidPayload(e.to_string())),
    };

    let subject = ["sub", "username"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .ok_or(DecodeError::MissingClaim("sub"))?
        .to_string();

    let role_claim = object
        .get("role")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingClaim("role"))?;
    let role =
        Role::parse(role_claim).ok_or_else(|| DecodeError::UnknownRole(role_claim.to_string()))?;

    let expiry = object
        .get("exp")
        .and_then(expiry_seconds)
        .ok_or(DecodeError::MissingClaim("exp"))?;

    let user_id = object.get("id").and_then(Value::as_i64);

    Ok(Claims {
        subject,
        role,
        expiry,
        user_id,
    })
}

fn payload_segment(token: &str) -> Result<&str, DecodeError> {
    let mut segments = token.split('.');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(_), Some(payload), Some(_), None) if !payload.is_empty() => Ok(payload),
        _ => Err(DecodeError::Malformed(
            "expected three dot-separated segments".to_string(),
        )),
    }
}

// Issuers may emit `exp` as a float; fractional seconds are dropped.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn expiry_seconds(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    proptest! {
        /// Property: arbitrary input never panics, and only three-segment input decodes
        #[test]
        fn prop_decode_is_fail_safe(raw in ".{0,200}") {
            if decode(&Credential::new(raw.clone())).is_ok() {
                prop_assert_eq!(raw.split('.').count(), 3);
            }
        }

        /// Property: a well-formed token decodes to the role and subject it was issued with
        #[test]
        fn prop_well_formed_token_preserves_claims(
            subject in "[a-z][a-z0-9_]{0,20}",
            admin in any::<bool>(),
            exp in 0u64..4_000_000_000
        ) {
            let role = if admin { "admin" } else { "user" };
            let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"HS256\"}");
            let body = URL_SAFE_NO_PAD
                .encode(json!({"sub": subject, "role": role, "exp": exp}).to_string());
            let claims = decode(&Credential::new(format!("{header}.{body}.sig"))).unwrap();

            prop_assert_eq!(claims.subject, subject);
            prop_assert_eq!(claims.role.as_str(), role);
            prop_assert_eq!(claims.expiry, exp);
        }
    }
}
