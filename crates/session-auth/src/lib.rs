//! Authentication for the snip client.
//!
//! This crate provides:
//! - An explicit FSM for the local authentication status
//! - `SessionController`, the single authoritative mirror of provider session state
//! - The identity-provider contract (`IdentityProvider`) with typed subscriptions
//! - A Supabase (GoTrue) provider over reqwest, with on-disk session persistence

mod auth_fsm;
mod controller;
mod error;
mod provider;
mod session;
mod store;
mod supabase;

#[cfg(test)]
mod tests;

pub use auth_fsm::auth_machine;
pub use auth_fsm::{
    AuthMachine, AuthMachineInput, AuthMachineState, AuthStateChangedPayload, AuthStatus,
};
pub use controller::{AuthStateCallback, InvalidationHook, SessionController};
pub use error::{AuthError, AuthResult};
pub use provider::{
    AuthChangeEvent, AuthOutcome, IdentityProvider, ListenerRegistry, SessionListener,
    Subscription,
};
pub use session::{AuthViewState, Session, User};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
pub use supabase::{RefreshConfig, SupabaseAuthProvider};
