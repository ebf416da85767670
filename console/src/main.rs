//! Ticket Verifier command-line console

use clap::Parser;
use ticket_verifier::cli::{self, Cli};
use ticket_verifier::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    cli::run(Cli::parse(), config).await
}
