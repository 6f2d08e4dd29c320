//! Session controller: the local, authoritative mirror of the provider's
//! session.
//!
//! All authentication state changes go through one FSM transition. Each
//! transition updates the session slot and the error slot under a single
//! lock, then (after the lock is released) notifies the state callback if the
//! view changed and fires the invalidation hook when the signed-in identity
//! changed or the caller signed out.
//!
//! The controller never holds its lock across an await.

use crate::auth_fsm::{
    AuthMachine, AuthMachineInput, AuthMachineState, AuthStateChangedPayload, AuthStatus,
};
use crate::provider::{IdentityProvider, SessionListener, Subscription};
use crate::session::{AuthViewState, Session, User};
use crate::AuthResult;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fired when work tied to the current session must be discarded.
pub type InvalidationHook = Box<dyn Fn() + Send + Sync>;

/// Callback type for auth state change notifications.
pub type AuthStateCallback = Box<dyn Fn(AuthStateChangedPayload) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Initialized,
    TornDown,
}

enum ErrorUpdate {
    Keep,
    Clear,
    Set(String),
}

#[derive(Debug, Clone, Copy)]
enum Attempt {
    SignIn,
    SignUp,
}

impl Attempt {
    fn label(self) -> &'static str {
        match self {
            Attempt::SignIn => "sign-in",
            Attempt::SignUp => "sign-up",
        }
    }
}

struct ControllerState {
    fsm: AuthMachine,
    /// Present exactly when the FSM is `Authenticated`.
    session: Option<Session>,
    last_error: Option<String>,
    /// Count of transitions applied so far, from any source.
    transitions: u64,
}

impl ControllerState {
    fn view(&self) -> AuthViewState {
        match (self.fsm.state(), &self.session) {
            (AuthMachineState::Authenticated, Some(session)) => {
                AuthViewState::Authenticated(session.clone())
            }
            (AuthMachineState::Authenticating, _) => AuthViewState::Authenticating,
            _ => AuthViewState::Unauthenticated,
        }
    }

    fn step(
        &mut self,
        input: AuthMachineInput,
        session: Option<Session>,
        error: ErrorUpdate,
    ) -> Change {
        let before = self.view();

        // Every input is accepted in every state.
        let _ = self.fsm.consume(&input);
        self.transitions += 1;
        self.session = match self.fsm.state() {
            AuthMachineState::Authenticated => session,
            _ => None,
        };
        match error {
            ErrorUpdate::Keep => {}
            ErrorUpdate::Clear => self.last_error = None,
            ErrorUpdate::Set(message) => self.last_error = Some(message),
        }

        Change {
            before,
            after: self.view(),
        }
    }
}

struct Change {
    before: AuthViewState,
    after: AuthViewState,
}

impl Change {
    fn identity_changed(&self) -> bool {
        let user_id = |view: &AuthViewState| view.session().map(|s| s.user.id.clone());
        user_id(&self.before) != user_id(&self.after)
    }
}

/// Mirrors the identity provider's session and exposes the credential
/// exchange operations.
///
/// Hooks are invoked synchronously and must not install hooks themselves.
pub struct SessionController {
    provider: Arc<dyn IdentityProvider>,
    state: Mutex<ControllerState>,
    lifecycle: Mutex<Lifecycle>,
    subscription: Mutex<Option<Subscription>>,
    invalidation_hook: Mutex<Option<InvalidationHook>>,
    state_callback: Mutex<Option<AuthStateCallback>>,
}

impl SessionController {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            state: Mutex::new(ControllerState {
                fsm: AuthMachine::new(),
                session: None,
                last_error: None,
                transitions: 0,
            }),
            lifecycle: Mutex::new(Lifecycle::Created),
            subscription: Mutex::new(None),
            invalidation_hook: Mutex::new(None),
            state_callback: Mutex::new(None),
        }
    }

    /// Install the hook fired on sign-out and on every change of signed-in
    /// identity.
    pub fn set_invalidation_hook(&self, hook: InvalidationHook) {
        *self.invalidation_hook.lock() = Some(hook);
    }

    /// Set a callback to be notified whenever the view changes.
    pub fn set_state_callback(&self, callback: AuthStateCallback) {
        *self.state_callback.lock() = Some(callback);
    }

    pub fn view_state(&self) -> AuthViewState {
        self.state.lock().view()
    }

    pub fn status(&self) -> AuthStatus {
        AuthStatus::from(self.state.lock().fsm.state())
    }

    /// The session the workflow should read its credential from.
    pub fn current_session(&self) -> Option<Session> {
        self.state.lock().session.clone()
    }

    /// Message from the most recent failed sign-in or sign-up.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    /// Subscribe to provider notifications and load the current session.
    ///
    /// Any transition applied while the snapshot is loading (a provider
    /// notification or a sign-in/up/out result) is newer than the snapshot,
    /// so the snapshot is then dropped. Failure to load
    /// leaves the controller `Unauthenticated` without recording an error.
    pub async fn initialize(self: &Arc<Self>) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle != Lifecycle::Created {
                warn!(lifecycle = ?*lifecycle, "Session controller already initialized");
                return;
            }
            *lifecycle = Lifecycle::Initialized;
        }

        let controller = Arc::downgrade(self);
        let listener: SessionListener = Arc::new(move |event, session| {
            if let Some(controller) = controller.upgrade() {
                debug!(event = ?event, "Provider auth event");
                controller.on_provider_event(session);
            }
        });
        *self.subscription.lock() = Some(self.provider.subscribe(listener));

        let seen = self.state.lock().transitions;
        let snapshot = self.provider.get_current_session().await;

        if *self.lifecycle.lock() == Lifecycle::TornDown {
            debug!("Controller torn down while loading session, ignoring snapshot");
            return;
        }

        let session = match snapshot {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to load current session");
                None
            }
        };

        let change = {
            let mut state = self.state.lock();
            if state.transitions != seen {
                debug!("State changed during initialization, dropping snapshot");
                return;
            }
            match session {
                Some(session) => {
                    info!(user_id = %session.user.id, "Restored session");
                    state.step(AuthMachineInput::SessionObserved, Some(session), ErrorUpdate::Keep)
                }
                None => state.step(AuthMachineInput::SessionCleared, None, ErrorUpdate::Keep),
            }
        };
        self.publish(change, false);
    }

    /// Apply a provider notification. Replaying the current session is a
    /// no-op.
    pub fn on_provider_event(&self, session: Option<Session>) {
        if *self.lifecycle.lock() == Lifecycle::TornDown {
            debug!("Ignoring provider event after teardown");
            return;
        }

        let change = {
            let mut state = self.state.lock();
            match session {
                Some(session) => {
                    state.step(AuthMachineInput::SessionObserved, Some(session), ErrorUpdate::Keep)
                }
                None => state.step(AuthMachineInput::SessionCleared, None, ErrorUpdate::Keep),
            }
        };
        self.publish(change, false);
    }

    /// Sign in with email and password.
    ///
    /// On failure the controller returns to `Unauthenticated` and the
    /// provider's message becomes the current error.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<User> {
        self.authenticate(Attempt::SignIn, email, password).await
    }

    /// Register a new account. Succeeds into `Authenticated` even when the
    /// provider withholds the credential pending email confirmation.
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<User> {
        self.authenticate(Attempt::SignUp, email, password).await
    }

    /// Sign out. Local state is cleared whatever the provider answers.
    pub async fn sign_out(&self) {
        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "Provider sign-out failed, clearing local session anyway");
        }

        self.transition(AuthMachineInput::SignedOut, None, ErrorUpdate::Clear, true);
        info!("Signed out");
    }

    /// Drop the provider subscription. Later notifications are ignored.
    pub fn teardown(&self) {
        {
            let mut lifecycle = self.lifecycle.lock();
            if *lifecycle == Lifecycle::TornDown {
                warn!("Session controller already torn down");
                return;
            }
            *lifecycle = Lifecycle::TornDown;
        }

        if let Some(subscription) = self.subscription.lock().take() {
            if !subscription.unsubscribe() {
                debug!("Provider subscription was already gone");
            }
        }
        debug!("Session controller torn down");
    }

    async fn authenticate(&self, attempt: Attempt, email: &str, password: &str) -> AuthResult<User> {
        self.transition(
            AuthMachineInput::CredentialsSubmitted,
            None,
            ErrorUpdate::Clear,
            false,
        );
        debug!(attempt = attempt.label(), email = %email, "Submitting credentials");

        let result = match attempt {
            Attempt::SignIn => self.provider.sign_in_with_password(email, password).await,
            Attempt::SignUp => self.provider.sign_up(email, password).await,
        };

        match result {
            Ok(outcome) => {
                let session = outcome
                    .session
                    .unwrap_or_else(|| Session::unconfirmed(outcome.user.clone()));
                if session.bearer_token().is_none() {
                    info!(user_id = %outcome.user.id, "Account awaiting email confirmation");
                }
                self.transition(
                    AuthMachineInput::CredentialsAccepted,
                    Some(session),
                    ErrorUpdate::Clear,
                    false,
                );
                info!(attempt = attempt.label(), user_id = %outcome.user.id, "Authenticated");
                Ok(outcome.user)
            }
            Err(e) => {
                warn!(attempt = attempt.label(), error = %e, "Authentication failed");
                self.transition(
                    AuthMachineInput::CredentialsRejected,
                    None,
                    ErrorUpdate::Set(e.to_string()),
                    false,
                );
                Err(e)
            }
        }
    }

    fn transition(
        &self,
        input: AuthMachineInput,
        session: Option<Session>,
        error: ErrorUpdate,
        force_invalidate: bool,
    ) {
        let change = self.state.lock().step(input, session, error);
        self.publish(change, force_invalidate);
    }

    fn publish(&self, change: Change, force_invalidate: bool) {
        if change.before != change.after {
            debug!(
                old_state = ?change.before.status(),
                new_state = ?change.after.status(),
                "Auth state transition"
            );
            self.notify_state_change(&change.after);
        }

        if force_invalidate || change.identity_changed() {
            if let Some(hook) = self.invalidation_hook.lock().as_ref() {
                hook();
            }
        }
    }

    fn notify_state_change(&self, view: &AuthViewState) {
        if let Some(callback) = self.state_callback.lock().as_ref() {
            let user = view.session().map(|s| &s.user);
            callback(AuthStateChangedPayload {
                state: view.status(),
                user_id: user.map(|u| u.id.clone()),
                email: user.and_then(|u| u.email.clone()),
            });
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            let _ = subscription.unsubscribe();
        }
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("status", &self.status())
            .field("lifecycle", &*self.lifecycle.lock())
            .finish()
    }
}
