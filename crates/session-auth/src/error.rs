//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity provider rejected the request. The message is the
    /// provider's own text and is shown to the user verbatim.
    #[error("{0}")]
    Provider(String),

    /// The identity provider failed with a 5xx. Shown like `Provider`, but
    /// retryable.
    #[error("{message}")]
    Unavailable { status: u16, message: String },

    /// Refresh retries exhausted
    #[error("Token refresh failed after {0} attempts")]
    RefreshExhausted(u32),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Connection failures, timeouts and 5xx responses are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::Unavailable { .. } => true,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                e.status().is_some_and(|status| status.is_server_error())
            }
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = AuthError::Provider("Invalid login credentials".to_string());
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[test]
    fn test_is_not_transient_provider_rejection() {
        assert!(!AuthError::Provider("Email not confirmed".to_string()).is_transient());
    }

    #[test]
    fn test_unavailable_is_transient_and_shows_message() {
        let err = AuthError::Unavailable {
            status: 503,
            message: "Service temporarily unavailable".to_string(),
        };
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Service temporarily unavailable");
    }

    #[test]
    fn test_is_not_transient_refresh_exhausted() {
        assert!(!AuthError::RefreshExhausted(3).is_transient());
    }
}
