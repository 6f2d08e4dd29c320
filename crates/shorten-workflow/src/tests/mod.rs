//! Integration tests for shorten-workflow.
//!
//! - `harness.rs`     - Gated fake endpoint and fixture helpers
//! - `http_client.rs` - HttpShortenClient wire contract
//! - `workflow.rs`    - Gating, lifecycle and stale-response suppression
