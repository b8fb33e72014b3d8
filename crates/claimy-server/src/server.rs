//! Serving and bounded shutdown
//!
//! Requests still in flight when the shutdown signal arrives get the grace
//! period to finish. Script runs occupy blocking threads that cannot be
//! cancelled, so once the grace period is over the runtime must be shut
//! down with a timeout rather than dropped; see [`shutdown_runtime`].

use axum::Router;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::Notify;
use tracing::{info, warn};

/// How long the runtime waits for leftover tasks after serving has ended
pub const RUNTIME_LINGER: Duration = Duration::from_millis(100);

/// How serving ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request finished within the grace period
    Drained,
    /// The grace period ran out with requests still running
    GraceElapsed,
}

/// Serve `app` until `signal` resolves, then drain for at most `grace`
pub async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    signal: F,
    grace: Duration,
) -> io::Result<ShutdownOutcome>
where
    F: Future<Output = ()>,
{
    let stop = Arc::new(Notify::new());
    let stopped = Arc::clone(&stop);
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stopped.notified().await })
            .await
    });

    tokio::select! {
        result = &mut server => {
            result.map_err(io::Error::other)??;
            return Ok(ShutdownOutcome::Drained);
        }
        _ = signal => {}
    }

    info!(grace = %humantime::format_duration(grace), "Shutting down");
    stop.notify_one();

    match tokio::time::timeout(grace, server).await {
        Ok(result) => {
            result.map_err(io::Error::other)??;
            Ok(ShutdownOutcome::Drained)
        }
        Err(_) => {
            warn!("Grace period elapsed with requests in flight");
            Ok(ShutdownOutcome::GraceElapsed)
        }
    }
}

/// Shut the runtime down without waiting on script runs that never end
pub fn shutdown_runtime(runtime: Runtime, outcome: ShutdownOutcome) {
    match outcome {
        ShutdownOutcome::Drained => runtime.shutdown_timeout(RUNTIME_LINGER),
        ShutdownOutcome::GraceElapsed => {
            warn!("Abandoning in-flight requests");
            runtime.shutdown_background()
        }
    }
}

/// Resolve on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
