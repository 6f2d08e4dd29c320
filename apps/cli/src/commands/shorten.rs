//! Shortening command.

use crate::output::{self, OutputFormat};
use anyhow::Result;
use snip_client::ShortenerApp;
use tracing::debug;

/// Shorten `url` with the stored session.
pub async fn shorten(app: &ShortenerApp, url: &str, format: &OutputFormat) -> Result<bool> {
    app.start().await;

    if let Err(e) = app.submit_url(url).await {
        debug!(error = %e, "Shortening did not succeed");
    }

    let ok = output::print_view(&app.view(), format);
    app.shutdown();
    Ok(ok)
}
