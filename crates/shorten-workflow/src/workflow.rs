//! The shortening request lifecycle.
//!
//! ```text
//!  Idle ──submit──► Pending ──ok──► Succeeded(short_url)
//!   ▲                  │
//!   │                  └──err──► Failed(message)
//!   └──────── reset (from any state)
//! ```
//!
//! Every submission is stamped with a generation. `reset()` bumps the
//! generation, so a call that completes afterwards finds a newer generation
//! and its outcome is dropped instead of written back.

use crate::{ShortenEndpoint, ShortenError, ShortenResult};
use parking_lot::Mutex;
use serde::Serialize;
use session_auth::Session;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ShortenStatus {
    #[default]
    Idle,
    Pending,
    Succeeded(String),
    Failed(String),
}

impl ShortenStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, ShortenStatus::Pending)
    }

    pub fn short_url(&self) -> Option<&str> {
        match self {
            ShortenStatus::Succeeded(url) => Some(url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ShortenStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// The current (or last) shortening request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ShortenRequest {
    pub input_url: String,
    pub status: ShortenStatus,
}

pub struct ShortenRequestWorkflow {
    endpoint: Arc<dyn ShortenEndpoint>,
    state: Mutex<ShortenRequest>,
    generation: AtomicU64,
}

impl ShortenRequestWorkflow {
    pub fn new(endpoint: Arc<dyn ShortenEndpoint>) -> Self {
        Self {
            endpoint,
            state: Mutex::new(ShortenRequest::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> ShortenRequest {
        self.state.lock().clone()
    }

    pub fn status(&self) -> ShortenStatus {
        self.state.lock().status.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.state.lock().status.is_pending()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Shorten `url` with the credential of `session`.
    ///
    /// The session is read once, here; it is never cached. Without a session
    /// the request fails with `Unauthorized` and nothing is sent.
    /// The URL is sent exactly as given; blank input is rejected.
    pub async fn submit(&self, url: &str, session: Option<&Session>) -> ShortenResult<String> {
        let Some(session) = session else {
            return Err(self.reject(url, ShortenError::Unauthorized));
        };

        let generation = {
            let mut state = self.state.lock();
            if state.status.is_pending() {
                debug!(url = %url, "Ignoring submission while a request is pending");
                return Err(ShortenError::AlreadyPending);
            }
            if url.trim().is_empty() {
                drop(state);
                return Err(self.reject(url, ShortenError::EmptyUrl));
            }

            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = ShortenRequest {
                input_url: url.to_string(),
                status: ShortenStatus::Pending,
            };
            generation
        };
        debug!(url = %url, generation, user_id = %session.user.id, "Shortening request pending");

        let outcome = match session.bearer_token() {
            Some(token) => self.endpoint.shorten(url, token).await,
            None => Err(ShortenError::MissingCredential),
        };

        self.complete(generation, outcome)
    }

    /// Drop the current request and any in-flight outcome.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if *state != ShortenRequest::default() {
            debug!(generation, "Shortening request reset");
        }
        *state = ShortenRequest::default();
    }

    /// Fail a submission before any call is made.
    fn reject(&self, url: &str, error: ShortenError) -> ShortenError {
        let mut state = self.state.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *state = ShortenRequest {
            input_url: url.to_string(),
            status: ShortenStatus::Failed(error.user_message()),
        };
        debug!(error = %error, "Shortening request rejected");
        error
    }

    fn complete(&self, generation: u64, outcome: ShortenResult<String>) -> ShortenResult<String> {
        let mut state = self.state.lock();
        let current = self.generation.load(Ordering::SeqCst);
        if current != generation {
            debug!(generation, current, "Discarding superseded shortening outcome");
            return Err(ShortenError::Superseded);
        }

        match outcome {
            Ok(short_url) => {
                info!(short_url = %short_url, "URL shortened");
                state.status = ShortenStatus::Succeeded(short_url.clone());
                Ok(short_url)
            }
            Err(e) => {
                warn!(error = %e, "Shortening request failed");
                state.status = ShortenStatus::Failed(e.user_message());
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ShortenRequestWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortenRequestWorkflow")
            .field("state", &*self.state.lock())
            .field("generation", &self.generation())
            .finish()
    }
}
