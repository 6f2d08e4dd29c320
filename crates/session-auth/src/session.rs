//! Session data and the derived authentication view.

use crate::auth_fsm::AuthStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sessions closer than this to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// Identity record issued by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }

    /// Identifier shown to the user: the email when known, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}

/// An authenticated identity plus its bearer credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    /// `None` only after a sign-up the provider has not confirmed yet.
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user: User, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: Some(access_token.into()),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// A session for a user whose credential is withheld pending email
    /// confirmation.
    pub fn unconfirmed(user: User) -> Self {
        Self {
            user,
            access_token: None,
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// The bearer credential, if the provider issued a non-empty one.
    pub fn bearer_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Whether the session has expired (or is about to) at `now`.
    /// Sessions without an expiry never expire locally.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "[redacted]");
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What the presentation layer renders for authentication.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthViewState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(Session),
}

impl AuthViewState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthViewState::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthViewState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    pub fn status(&self) -> AuthStatus {
        match self {
            AuthViewState::Unauthenticated => AuthStatus::Unauthenticated,
            AuthViewState::Authenticating => AuthStatus::Authenticating,
            AuthViewState::Authenticated(_) => AuthStatus::Authenticated,
        }
    }
}
