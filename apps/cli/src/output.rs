//! Output formatting for the CLI.

use clap::ValueEnum;
use session_auth::AuthViewState;
use shorten_workflow::ShortenStatus;
use snip_client::AppView;

/// Output format.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print the view and return whether it is free of errors.
pub fn print_view(view: &AppView, format: &OutputFormat) -> bool {
    match format {
        OutputFormat::Text => {
            let text = render_text(view);
            if view.error.is_some() {
                eprint!("{}", text);
            } else {
                print!("{}", text);
            }
        }
        OutputFormat::Json => match serde_json::to_string_pretty(view) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: {}", e),
        },
    }
    view.error.is_none()
}

/// Print a plain notice.
pub fn print_notice(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "status": "ok", "message": message }));
        }
    }
}

pub fn render_text(view: &AppView) -> String {
    let mut out = String::new();

    let auth = match &view.auth {
        AuthViewState::Unauthenticated => "not signed in".to_string(),
        AuthViewState::Authenticating => "signing in...".to_string(),
        AuthViewState::Authenticated(session) => {
            format!("signed in as {}", session.user.display_name())
        }
    };
    out.push_str(&row("Auth", &auth));

    match &view.status {
        ShortenStatus::Idle => {}
        ShortenStatus::Pending => out.push_str(&row("Request", "pending")),
        ShortenStatus::Succeeded(short_url) => out.push_str(&row("Short URL", short_url)),
        ShortenStatus::Failed(_) => out.push_str(&row("Request", "failed")),
    }

    if let Some(error) = &view.error {
        out.push_str(&format!("Error: {}\n", error));
    }

    out
}

fn row(label: &str, value: &str) -> String {
    format!("{:<11}{}\n", format!("{}:", label), value)
}
