//! snip CLI - sign in and shorten URLs.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use snip_config::{init_logging, parse_level, Config, Paths};
use tracing::debug;

/// snip - Shorten URLs with your account.
#[derive(Parser)]
#[command(name = "snip")]
#[command(about = "Session-gated URL shortener")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error); defaults to the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Account email (prompted for when omitted)
    #[arg(long, env = "SNIP_EMAIL", global = true)]
    email: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login,

    /// Create an account
    Signup,

    /// Sign out and clear the stored session
    Logout,

    /// Show who is signed in
    Status,

    /// Shorten a URL
    Shorten {
        /// The URL to shorten
        url: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = run(cli).await;

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when the rendered view carries an error.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let paths = Paths::new()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let verbose = parse_level(&level) >= tracing::Level::DEBUG;
    init_logging("cli", &level, &paths, verbose);
    debug!(base_dir = %paths.base_dir().display(), "Configuration loaded");

    let app = commands::build_app(&config, &paths)?;
    let email = cli.email.as_deref();

    match cli.command {
        Commands::Login => commands::login(&app, email, &cli.format).await,
        Commands::Signup => commands::signup(&app, email, &cli.format).await,
        Commands::Logout => commands::logout(&app, &cli.format).await,
        Commands::Status => commands::status(&app, &cli.format).await,
        Commands::Shorten { url } => commands::shorten(&app, &url, &cli.format).await,
    }
}
