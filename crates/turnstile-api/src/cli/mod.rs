//! CLI definitions for the `turnstile` binary.
//!
//! Uses clap derive macros. `serve` runs the HTTP gateway; `completions`
//! prints a shell completion script.

pub mod serve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Session-scoped HTTP gateway for a tool-using AI agent.
#[derive(Parser)]
#[command(name = "turnstile", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Only log errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP gateway.
    Serve(ServeArgs),

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long, env = "TURNSTILE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "TURNSTILE_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds to wait for in-flight requests after a shutdown signal.
    #[arg(long, env = "TURNSTILE_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,

    /// Upper bound on one chat turn, in seconds.
    #[arg(long, env = "TURNSTILE_TURN_TIMEOUT_SECS", default_value_t = 60)]
    pub turn_timeout_secs: u64,

    /// Path to the TOML config file (defaults to ./turnstile.toml).
    #[arg(long, env = "TURNSTILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Export spans to stdout through OpenTelemetry.
    #[arg(long, env = "TURNSTILE_OTEL")]
    pub otel: bool,

    /// Log one JSON object per line.
    #[arg(long, env = "TURNSTILE_LOG_JSON")]
    pub log_json: bool,
}
