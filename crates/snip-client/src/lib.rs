//! Client facade for snip.
//!
//! `ShortenerApp` owns the session controller and the shortening workflow,
//! connects the controller's invalidation hook to the workflow's reset, and
//! exposes the presentation surface: the intents a UI can send and the
//! `AppView` it renders.

mod app;
mod view;

#[cfg(test)]
mod tests;

pub use app::ShortenerApp;
pub use view::AppView;
