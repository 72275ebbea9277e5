//! `turnstile serve`: wire the gateway and run the HTTP server.

use std::time::Duration;

use tracing::{info, warn};

use crate::cli::ServeArgs;
use crate::http::router::{ENDPOINTS, build_router};
use crate::lifecycle::{LifecycleController, ShutdownOutcome};
use crate::state::AppState;

/// Run the gateway until a shutdown signal arrives and the drain finishes.
///
/// Configuration errors (missing `MCP_ENDPOINT`, unbuildable clients) are
/// returned before the listener is bound.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let lifecycle = LifecycleController::new(Duration::from_secs(args.shutdown_timeout_secs));
    let state = AppState::init(&args, lifecycle.turn_token()).await?;

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        addr = %listener.local_addr()?,
        agent = state.gateway.engine_name(),
        mcp_endpoint = %state.mcp_endpoint,
        "Turnstile Agent Gateway listening"
    );
    for (method, path, description) in ENDPOINTS {
        info!("  {method:<4} {path:<10} {description}");
    }

    let router = build_router(state);
    match lifecycle.run(listener, router).await {
        ShutdownOutcome::Drained => info!("Server stopped"),
        ShutdownOutcome::TimedOut => warn!("Server stopped with requests still in flight"),
    }

    Ok(())
}
