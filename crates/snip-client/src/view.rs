//! What the presentation layer renders.

use serde::{Serialize, Serializer};
use session_auth::{AuthStatus, AuthViewState, User};
use shorten_workflow::ShortenStatus;

/// Everything a UI needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppView {
    #[serde(serialize_with = "serialize_auth")]
    pub auth: AuthViewState,
    /// The one message to show, if any.
    pub error: Option<String>,
    pub status: ShortenStatus,
    pub short_url: Option<String>,
    /// True while signing in/up or while a URL is being shortened. Input
    /// should be refused while set.
    pub busy: bool,
}

impl AppView {
    pub fn user(&self) -> Option<&User> {
        self.auth.session().map(|s| &s.user)
    }
}

fn serialize_auth<S: Serializer>(auth: &AuthViewState, serializer: S) -> Result<S::Ok, S::Error> {
    #[derive(Serialize)]
    struct AuthView<'a> {
        state: AuthStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        user: Option<&'a User>,
    }

    AuthView {
        state: auth.status(),
        user: auth.session().map(|s| &s.user),
    }
    .serialize(serializer)
}
