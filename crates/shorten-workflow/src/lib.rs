//! Session-gated URL shortening.
//!
//! `ShortenRequestWorkflow` performs one authenticated call per submission
//! against a `ShortenEndpoint`, tracks the request's status, and discards the
//! outcome of any call that was superseded by `reset()`.

mod endpoint;
mod error;
mod workflow;

#[cfg(test)]
mod tests;

pub use endpoint::{HttpShortenClient, ShortenEndpoint};
pub use error::{ShortenError, ShortenResult, GENERIC_FAILURE_MESSAGE};
pub use workflow::{ShortenRequest, ShortenRequestWorkflow, ShortenStatus};
