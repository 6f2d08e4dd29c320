//! End-to-end tests of the presentation surface.
//!
//! - `harness.rs` - Fake identity provider and fake shortening endpoint
//! - `app.rs`     - Intents and the rendered view across session changes
