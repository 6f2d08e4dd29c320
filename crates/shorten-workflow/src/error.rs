//! Shortening error types.

use thiserror::Error;

/// The only message shown for a failed shortening call.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to shorten the URL.";

#[derive(Error, Debug)]
pub enum ShortenError {
    /// No session at submission time.
    #[error("Sign in to shorten URLs.")]
    Unauthorized,

    #[error("Enter a URL to shorten.")]
    EmptyUrl,

    #[error("A URL is already being shortened.")]
    AlreadyPending,

    /// The session carries no bearer credential (sign-up awaiting confirmation).
    #[error("Session has no access token")]
    MissingCredential,

    #[error("Shortening service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Shortening service response has no short_url")]
    MalformedResponse,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The session changed while the call was in flight; its outcome was dropped.
    #[error("Request superseded by a session change")]
    Superseded,
}

impl ShortenError {
    /// True for failures of the shortening call itself.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            ShortenError::MissingCredential
                | ShortenError::Status { .. }
                | ShortenError::MalformedResponse
                | ShortenError::Http(_)
        )
    }

    /// Text for the error slot. Request failures collapse to one generic
    /// message; the cause is only logged.
    pub fn user_message(&self) -> String {
        if self.is_request_failure() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

pub type ShortenResult<T> = Result<T, ShortenError>;
