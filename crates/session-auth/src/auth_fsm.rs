//! Authentication state machine using rust-fsm.
//!
//! The machine tracks only the status; the session itself lives next to it
//! in the controller and is present exactly when the machine is in
//! `Authenticated`.
//!
//! ## State Diagram
//!
//! ```text
//!                    CredentialsSubmitted
//! ┌─────────────────┐ ─────────────────► ┌─────────────────┐
//! │ Unauthenticated │                    │ Authenticating  │
//! └─────────────────┘ ◄───────────────── └─────────────────┘
//!      ▲      │        CredentialsRejected         │
//!      │      │        SessionCleared              │ CredentialsAccepted
//!      │      │        SignedOut                   │ SessionObserved
//!      │      │ SessionObserved                    ▼
//!      │      │ CredentialsAccepted       ┌─────────────────┐
//!      │      └─────────────────────────► │  Authenticated  │
//!      └───────────────────────────────── └─────────────────┘
//!         SignedOut / SessionCleared / CredentialsRejected
//! ```
//!
//! Every input is accepted in every state. Provider notifications arrive
//! asynchronously and concurrent sign-in attempts may complete in any order,
//! so the last event to arrive decides the state.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(Unauthenticated)

    Unauthenticated => {
        CredentialsSubmitted => Authenticating,
        CredentialsAccepted => Authenticated,
        CredentialsRejected => Unauthenticated,
        SessionObserved => Authenticated,
        SessionCleared => Unauthenticated,
        SignedOut => Unauthenticated
    },
    Authenticating => {
        CredentialsSubmitted => Authenticating,
        CredentialsAccepted => Authenticated,
        CredentialsRejected => Unauthenticated,
        SessionObserved => Authenticated,
        SessionCleared => Unauthenticated,
        SignedOut => Unauthenticated
    },
    Authenticated => {
        CredentialsSubmitted => Authenticating,
        CredentialsAccepted => Authenticated,
        CredentialsRejected => Unauthenticated,
        SessionObserved => Authenticated,
        SessionCleared => Unauthenticated,
        SignedOut => Unauthenticated
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Data-free authentication status for rendering and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

impl AuthStatus {
    /// Returns true only for `Authenticated`.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated)
    }

    /// Returns true while a credential exchange is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, AuthStatus::Authenticating)
    }
}

impl From<&AuthMachineState> for AuthStatus {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::Unauthenticated => AuthStatus::Unauthenticated,
            AuthMachineState::Authenticating => AuthStatus::Authenticating,
            AuthMachineState::Authenticated => AuthStatus::Authenticated,
        }
    }
}

/// Payload for auth state change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStateChangedPayload {
    pub state: AuthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
