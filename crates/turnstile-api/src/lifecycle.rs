//! LifecycleController -- listener lifetime, signal handling, bounded drain.
//!
//! Connections are accepted here and each one is served on its own task
//! under a graceful-shutdown watcher. The first Ctrl+C or SIGTERM cancels the
//! shutdown token: the listener is closed, idle connections are closed, and
//! in-flight requests get up to the shutdown timeout to finish normally.
//! Past the deadline the turn token is cancelled and every remaining
//! connection task is aborted, which drops its socket. The timeout is
//! reported, not escalated. Later signals only log.

use std::future::Future;
use std::time::Duration;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause after a failed `accept` (e.g. out of file descriptors).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How the drain after cancellation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request finished before the deadline.
    Drained,
    /// The deadline passed and remaining connections were dropped.
    TimedOut,
}

/// Owns the shutdown tokens and the drain deadline for one server run.
pub struct LifecycleController {
    /// Cancelled when shutdown begins. Stops the listener.
    token: CancellationToken,
    /// Cancelled when the drain deadline passes. In-flight turns abort on it.
    turns: CancellationToken,
    shutdown_timeout: Duration,
}

impl LifecycleController {
    pub fn new(shutdown_timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            turns: CancellationToken::new(),
            shutdown_timeout,
        }
    }

    /// The shutdown token. Cancelled exactly once, when shutdown begins.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// The token chat turns race against. Cancelled only when the drain
    /// deadline passes, so turns already running may finish during the drain.
    pub fn turn_token(&self) -> CancellationToken {
        self.turns.clone()
    }

    /// Serve `router` on `listener` until an OS interrupt, then drain.
    pub async fn run(&self, listener: TcpListener, router: Router) -> ShutdownOutcome {
        self.run_until(listener, router, watch_signals(self.token()))
            .await
    }

    /// Serve `router` on `listener` until `trigger` completes or the token is
    /// cancelled, then drain.
    pub async fn run_until<F>(&self, listener: TcpListener, router: Router, trigger: F) -> ShutdownOutcome
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token();
        let trigger = tokio::spawn(async move {
            trigger.await;
            token.cancel();
        });

        let builder = auto::Builder::new(TokioExecutor::new());
        let graceful = GracefulShutdown::new();
        let mut connections = JoinSet::new();

        loop {
            let (stream, remote) = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            let service = TowerToHyperService::new(router.clone());
            let conn = builder
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .into_owned();
            let conn = graceful.watch(conn);
            connections.spawn(async move {
                if let Err(e) = conn.await {
                    debug!(%remote, error = %e, "Connection closed with error");
                }
            });

            // Reap finished connection tasks.
            while connections.try_join_next().is_some() {}
        }

        drop(listener);
        trigger.abort();
        self.drain(graceful, connections).await
    }

    async fn drain(&self, graceful: GracefulShutdown, mut connections: JoinSet<()>) -> ShutdownOutcome {
        info!(
            timeout_secs = self.shutdown_timeout.as_secs_f64(),
            "Shutting down, waiting for in-flight requests"
        );

        match tokio::time::timeout(self.shutdown_timeout, graceful.shutdown()).await {
            Ok(()) => ShutdownOutcome::Drained,
            Err(_) => {
                self.turns.cancel();
                connections.abort_all();
                warn!(
                    timeout_secs = self.shutdown_timeout.as_secs_f64(),
                    "In-flight requests did not finish before the shutdown timeout, closing connections"
                );
                while connections.join_next().await.is_some() {}
                ShutdownOutcome::TimedOut
            }
        }
    }
}

/// Cancel `token` on the first Ctrl+C or SIGTERM. Never returns.
async fn watch_signals(token: CancellationToken) {
    loop {
        if let Err(e) = shutdown_signal().await {
            error!(error = %e, "Failed to listen for shutdown signals");
            std::future::pending::<()>().await;
        }

        if token.is_cancelled() {
            warn!("Shutdown already in progress");
        } else {
            info!("Shutdown signal received");
            token.cancel();
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use axum::routing::get;
    use tokio::sync::oneshot;

    async fn slow_server(delay: Duration) -> (TcpListener, Router, String) {
        let router = Router::new().route(
            "/slow",
            get(move || async move {
                tokio::time::sleep(delay).await;
                "done"
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/slow", listener.local_addr().unwrap());
        (listener, router, url)
    }

    #[tokio::test]
    async fn test_in_flight_request_finishes_within_deadline() {
        let (listener, router, url) = slow_server(Duration::from_millis(300)).await;
        let controller = LifecycleController::new(Duration::from_secs(5));
        let token = controller.token();
        let turns = controller.turn_token();

        let (tx, rx) = oneshot::channel::<()>();
        let run = tokio::spawn(async move {
            controller
                .run_until(listener, router, async move {
                    let _ = rx.await;
                })
                .await
        });

        let client = tokio::spawn(async move { reqwest::get(url).await?.text().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(()).unwrap();

        let outcome = run.await.unwrap();
        assert_eq!(outcome, ShutdownOutcome::Drained);
        assert!(token.is_cancelled());
        assert!(!turns.is_cancelled());
        assert_eq!(client.await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn test_slow_request_is_abandoned_at_deadline() {
        let (listener, router, url) = slow_server(Duration::from_secs(10)).await;
        let controller = LifecycleController::new(Duration::from_millis(300));
        let token = controller.token();
        let turns = controller.turn_token();

        let run = tokio::spawn(async move {
            controller
                .run_until(listener, router, std::future::pending())
                .await
        });
        let client = tokio::spawn(async move { reqwest::get(url).await?.text().await });
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = Instant::now();
        token.cancel();
        let outcome = run.await.unwrap();
        assert_eq!(outcome, ShutdownOutcome::TimedOut);
        assert!(turns.is_cancelled());

        let result = tokio::time::timeout(Duration::from_secs(1), client)
            .await
            .expect("client should see the connection close")
            .unwrap();
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_second_cancel_has_no_further_effect() {
        let (listener, router, _) = slow_server(Duration::ZERO).await;
        let controller = LifecycleController::new(Duration::from_secs(1));
        let token = controller.token();
        token.cancel();
        token.cancel();

        let outcome = controller
            .run_until(listener, router, std::future::pending())
            .await;
        assert_eq!(outcome, ShutdownOutcome::Drained);
    }

    #[tokio::test]
    async fn test_no_new_connections_after_shutdown() {
        let (listener, router, url) = slow_server(Duration::ZERO).await;
        let controller = LifecycleController::new(Duration::from_secs(1));
        let token = controller.token();

        let run = tokio::spawn(async move {
            controller
                .run_until(listener, router, std::future::pending())
                .await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reqwest::get(&url).await.unwrap().text().await.unwrap(), "done");

        token.cancel();
        assert_eq!(run.await.unwrap(), ShutdownOutcome::Drained);
        assert!(reqwest::get(&url).await.is_err());
    }
}
