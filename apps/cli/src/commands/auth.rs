//! Authentication commands.

use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use snip_client::ShortenerApp;
use std::io::{self, Write};

const PASSWORD_ENV: &str = "SNIP_PASSWORD";

/// Email from `--email`/`SNIP_EMAIL`, else prompted; password from
/// `SNIP_PASSWORD`, else prompted without echo.
fn credentials(email: Option<&str>) -> Result<(String, String)> {
    let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(email) => email.to_string(),
        None => {
            print!("Email: ");
            io::stdout().flush()?;
            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            input.trim().to_string()
        }
    };
    if email.is_empty() {
        bail!("Email is required");
    }

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => password,
        _ => rpassword::prompt_password("Password: ")?,
    };
    if password.is_empty() {
        bail!("Password is required");
    }

    Ok((email, password))
}

/// Sign in with email and password.
pub async fn login(app: &ShortenerApp, email: Option<&str>, format: &OutputFormat) -> Result<bool> {
    app.start().await;

    if let Some(session) = app.controller().current_session() {
        output::print_notice(
            &format!("Already logged in as {}", session.user.display_name()),
            format,
        );
        app.shutdown();
        return Ok(true);
    }

    let (email, password) = credentials(email)?;
    // The error, if any, is in the view.
    let _ = app.login(&email, &password).await;

    let ok = output::print_view(&app.view(), format);
    app.shutdown();
    Ok(ok)
}

/// Create an account.
pub async fn signup(app: &ShortenerApp, email: Option<&str>, format: &OutputFormat) -> Result<bool> {
    app.start().await;

    let (email, password) = credentials(email)?;
    let result = app.signup(&email, &password).await;

    if let (Ok(_), Some(session)) = (&result, app.controller().current_session()) {
        if session.bearer_token().is_none() {
            output::print_notice("Check your email to confirm your account.", format);
        }
    }

    let ok = output::print_view(&app.view(), format);
    app.shutdown();
    Ok(ok)
}

/// Sign out and clear the stored session.
pub async fn logout(app: &ShortenerApp, format: &OutputFormat) -> Result<bool> {
    app.start().await;
    app.logout().await;

    let ok = output::print_view(&app.view(), format);
    app.shutdown();
    Ok(ok)
}

/// Show who is signed in.
pub async fn status(app: &ShortenerApp, format: &OutputFormat) -> Result<bool> {
    app.start().await;

    let ok = output::print_view(&app.view(), format);
    app.shutdown();
    Ok(ok)
}
