//! # Credentials
//!
//! The bearer credential and the transient username/password form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque bearer credential issued by the identity endpoint.
///
/// The value is never printed by `Debug`; use [`Credential::as_str`] when
/// the raw token is actually needed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Username and password sent as the login/register body.
///
/// Never persisted.
#[derive(Clone, Serialize)]
pub struct LoginForm {
    /// Account name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

impl LoginForm {
    /// Build a form from borrowed strings.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
