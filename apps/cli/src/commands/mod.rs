//! CLI command implementations.

mod auth;
mod shorten;

pub use auth::{login, logout, signup, status};
pub use shorten::shorten;

use anyhow::Result;
use session_auth::{FileSessionStore, IdentityProvider, SupabaseAuthProvider};
use shorten_workflow::{HttpShortenClient, ShortenEndpoint};
use snip_client::ShortenerApp;
use snip_config::{Config, Paths};
use std::sync::Arc;
use tracing::warn;

/// Wire the Supabase provider (with the on-disk session) and the HTTP
/// shortening client into an app.
pub fn build_app(config: &Config, paths: &Paths) -> Result<ShortenerApp> {
    paths.ensure_dirs()?;

    let supabase_url = config.supabase_url()?;
    let store = FileSessionStore::new(paths.session_file());
    let provider = SupabaseAuthProvider::new(
        supabase_url.as_str(),
        &config.supabase_publishable_key,
        Box::new(store),
    );

    // A bad base URL only makes shortening fail; signing in still works.
    if let Err(e) = config.shortener_base_url() {
        warn!(
            base_url = %config.shortener_base_url,
            error = %e,
            "Shortening backend URL is invalid, requests will fail"
        );
    }
    let endpoint = HttpShortenClient::new(&config.shortener_base_url);

    Ok(ShortenerApp::new(
        Arc::new(provider) as Arc<dyn IdentityProvider>,
        Arc::new(endpoint) as Arc<dyn ShortenEndpoint>,
    ))
}
