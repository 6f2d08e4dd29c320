//! Identity-provider contract.
//!
//! The provider owns the credential exchange and pushes session changes to
//! subscribers. Listeners are invoked in emission order, outside the
//! registry lock, so a listener may call back into the provider.

use crate::session::{Session, User};
use crate::AuthResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

/// Kind of session change a provider reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Result of a successful credential exchange.
///
/// `session` is `None` when the provider created the user but withholds a
/// credential until the email address is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub user: User,
    pub session: Option<Session>,
}

/// Callback invoked for every provider notification.
pub type SessionListener = Arc<dyn Fn(AuthChangeEvent, Option<Session>) + Send + Sync>;

/// Remote identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session snapshot, if any.
    async fn get_current_session(&self) -> AuthResult<Option<Session>>;

    /// Register a standing listener for session changes.
    fn subscribe(&self, listener: SessionListener) -> Subscription;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthResult<AuthOutcome>;

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<AuthOutcome>;

    async fn sign_out(&self) -> AuthResult<()>;
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, SessionListener>,
}

/// Listener bookkeeping shared by provider implementations.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Listeners>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: SessionListener) -> Subscription {
        let mut listeners = self.inner.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, listener);

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver one notification to every registered listener.
    pub fn emit(&self, event: AuthChangeEvent, session: Option<Session>) {
        let listeners: Vec<SessionListener> =
            self.inner.lock().entries.values().cloned().collect();

        for listener in listeners {
            listener(event, session.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for a registered listener.
///
/// Dropping the handle leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Remove the listener. Returns false if it was already gone or the
    /// registry no longer exists.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.lock().entries.remove(&self.id).is_some(),
            None => false,
        }
    }
}
