//! Integration tests for session-auth.
//!
//! - `harness.rs`   - Scriptable fake provider and fixture helpers
//! - `controller.rs` - SessionController: mirroring, sign-in/up/out, lifecycle
//! - `supabase.rs`  - SupabaseAuthProvider against wiremock GoTrue endpoints

mod supabase;
