//! Turnstile gateway entry point.
//!
//! Binary name: `turnstile`
//!
//! Parses CLI arguments, loads `.env`, sets up tracing, then either prints
//! shell completions or runs the HTTP gateway.

mod cli;
mod http;
mod lifecycle;
mod state;

use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use turnstile_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "turnstile", &mut std::io::stdout());
        return Ok(());
    }

    let dotenv = dotenvy::dotenv();

    let Commands::Serve(args) = cli.command else {
        unreachable!("handled above");
    };

    let mut tracing_options = TracingOptions::from_verbosity(cli.verbose, cli.quiet);
    tracing_options.json = args.log_json;
    tracing_options.otel = args.otel;
    init_tracing(&tracing_options).map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    if let Err(e) = dotenv {
        tracing::warn!("No .env file loaded: {e}");
    }

    let result = cli::serve::serve(args).await;
    if let Err(e) = &result {
        tracing::error!("{e:#}");
    }

    shutdown_tracing();
    result
}
