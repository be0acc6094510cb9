//! chosung-admin - command-line admin dashboard for the 143 chosung word game.
//!
//! Every data command passes the route guard first, then talks to the
//! admin API through the authenticated client, which renews expired
//! access tokens on its own.

mod commands;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use chosung_admin_core::guard::TracingNavigator;
use chosung_admin_core::{AdminClient, ApiError, Config, FileCookieStore};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, commands::USAGE);
            std::process::exit(2);
        }
    };
    if command == Command::Help {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let mut config = Config::load()?;
    let cookie_path = config.cookie_path()?;
    let cookies = Arc::new(FileCookieStore::new(cookie_path));
    let client = AdminClient::from_config(&config, cookies, Arc::new(TracingNavigator))
        .context("Failed to create admin API client")?;

    info!(api_url = %config.api_url, ?command, "chosung-admin starting");
    let result = commands::run(&client, &mut config, command).await;

    if let Err(ref e) = result {
        if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_session_ending) {
            eprintln!("Session ended. Run `chosung-admin login` to sign in again.");
        }
    }
    result
}
