//! # Errors
//!
//! Error taxonomy for the session core.
//!
//! None of these are fatal: a [`DecodeError`] is always recovered by
//! dropping the session, and [`AuthError`] collapses to `false` at the
//! `login`/`register` boundary.

use thiserror::Error;

/// A credential could not be parsed into claims.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The credential is not a three-part dotted token.
    #[error("malformed credential: {0}")]
    Malformed(String),

    /// The payload segment is not valid base64url.
    #[error("invalid payload encoding: {0}")]
    InvalidEncoding(String),

    /// The payload segment is not a JSON object.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A required claim is absent or has the wrong type.
    #[error("missing claim: {0}")]
    MissingClaim(&'static str),

    /// The role claim names a role this client does not know.
    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Login, registration or password change was not accepted.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity endpoint refused the request.
    #[error("rejected by server: {status} - {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the server.
        message: String,
    },

    /// Registration conflicted with an existing account.
    #[error("username already taken: {0}")]
    Conflict(String),

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response did not carry the expected body.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The server issued a credential that does not decode.
    #[error("issued credential rejected: {0}")]
    Decode(#[from] DecodeError),

    /// The operation needs a current credential and there is none.
    #[error("not authenticated")]
    NotAuthenticated,
}

impl AuthError {
    /// Whether this failure came from the network rather than the server.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors raised by collaborator requests made through the interceptor.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("server error: {status} - {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error message from the server.
        message: String,
    },

    /// Failed to deserialize response.
    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    /// The request was refused locally before being sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for login/register operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type for collaborator operations.
pub type ApiResult<T> = Result<T, ApiError>;
