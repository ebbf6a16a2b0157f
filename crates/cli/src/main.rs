use clap::Parser;
use reslot_cli::commands::{Cmd, Command};
use tracing_subscriber::EnvFilter;

/// Reslot CLI
///
/// Reslot rewrites an EVM contract's storage image when its declared data
/// layout changes: it applies reorganization directives against a committed
/// slot snapshot and can check fixture directories against expected images.
#[derive(Parser)]
#[command(name = "reslot")]
#[command(about = "Reslot: storage layout reorganizer")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Reslot CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    cli.command.execute().await
}
