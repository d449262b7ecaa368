use clap::Parser;
use tracing_subscriber::EnvFilter;
use walletd::cli::Cli;
use walletd::commands;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let name = cli.command.name();

    if let Err(e) = commands::run(cli.command).await {
        tracing::error!(error = %e, command = name, "command failed");
        eprintln!("walletd {name}: {e}");
        std::process::exit(1);
    }
}
