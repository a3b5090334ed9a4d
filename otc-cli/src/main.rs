//! OTC CLI entry point
//!
//! Authentication against the cloud's identity service: federated
//! browser-based login or direct IAM credentials, temporary access-key
//! issuance, and the local token cache. All heavy lifting lives in the
//! `otc-auth` crate; this binary is flag parsing and flow orchestration.

mod cli;
mod commands;

use clap::Parser;
use colored::Colorize;
use std::process;

#[tokio::main]
async fn main() {
    init_logging();

    let cli = cli::Cli::parse();

    let result = match cli.command {
        cli::Commands::Login(args) => commands::login(args).await,
        cli::Commands::Logout => commands::logout().await,
        cli::Commands::Credentials(args) => commands::credentials(args).await,
        cli::Commands::Projects(args) => commands::projects(args).await,
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", "error:".red().bold());
        process::exit(1);
    }
}

/// Structured logs go to stderr and stay quiet unless RUST_LOG says
/// otherwise; the terminal lines the commands print are the primary UI.
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
