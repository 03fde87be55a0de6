//! Error types used throughout the crate.
//!
//! All variants carry owned string payloads so the error stays [`Clone`]:
//! a single in-flight authentication run delivers the *same* failure to every
//! caller joined on it (see [`crate::singleflight`]).

use thiserror::Error;

/// Main error type for authentication operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The token endpoint reported a failure: a non-2xx HTTP status, or an
    /// `error` field in the decoded response body.
    #[error("token exchange failed: {error}{}", description.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Exchange {
        /// Provider error code (e.g. `invalid_grant`), or the HTTP status
        /// text when the body carried no error code.
        error: String,
        /// Provider error description, when present.
        description: Option<String>,
        /// HTTP status of the token response, when one was received.
        status: Option<u16>,
    },

    /// The HTTP request itself failed (connect, timeout, TLS).
    #[error("http transport error: {0}")]
    Http(String),

    /// The interactive login surface was dismissed before producing a result.
    #[error("login flow cancelled")]
    LoginCancelled,

    /// The login redirect lacked an expected field (e.g. the grant code).
    #[error("login response missing field `{field}`")]
    MalformedResponse {
        /// Name of the missing field.
        field: String,
    },

    /// Setup invariant violation. Raised synchronously, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The secure store failed to read or write the cached profile.
    #[error("secure store error: {0}")]
    Store(String),

    /// The token endpoint returned a body that could not be decoded.
    #[error("malformed token response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    //! Unit tests for error display.
    use super::*;

    /// Validates `AuthError::Exchange` display for the provider error with
    /// description scenario.
    ///
    /// Assertions:
    /// - Ensures the message contains the provider error code.
    /// - Ensures the message contains the provider description.
    #[test]
    fn test_exchange_error_display() {
        let err = AuthError::Exchange {
            error: "invalid_grant".to_string(),
            description: Some("The refresh token is invalid".to_string()),
            status: Some(400),
        };

        let message = err.to_string();
        assert!(message.contains("invalid_grant"));
        assert!(message.contains("The refresh token is invalid"));
    }

    /// Validates `AuthError::Exchange` display for the no-description
    /// scenario.
    #[test]
    fn test_exchange_error_display_without_description() {
        let err = AuthError::Exchange {
            error: "invalid_request".to_string(),
            description: None,
            status: Some(400),
        };

        assert_eq!(err.to_string(), "token exchange failed: invalid_request");
    }

    /// Validates that errors can be cloned and compared, which the
    /// single-flight primitive relies on to fan one failure out to all
    /// joined callers.
    #[test]
    fn test_errors_are_cloneable() {
        let err = AuthError::MalformedResponse { field: "code".to_string() };
        assert_eq!(err.clone(), err);
    }
}
