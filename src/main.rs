//! armt-auth CLI binary entry point.

use armt_auth::cli::Cli;
use clap::Parser;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

#[tokio::main]
async fn main() {
    let log_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = armt_auth::cli::auth::run(cli).await {
        eprintln!("Error: {e}");
        if e.requires_login() {
            eprintln!("Run `armt-auth login` to sign in again.");
        }
        std::process::exit(1);
    }
}
