//! Interrupt handling
//!
//! A single [`CancellationToken`] is the shutdown notification for the whole
//! process. Every consumer, the async sink and the orchestrator watch a clone
//! of it; this module cancels it on SIGINT or SIGTERM.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Spawn a task that cancels `token` when the process is interrupted.
///
/// The task also exits quietly if the token is cancelled by someone else.
pub fn install(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = wait_for_signal() => {
                info!(signal, "Interrupt received, shutting down");
                token.cancel();
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "Unable to listen for SIGTERM");
            None
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Unable to listen for SIGINT");
                std::future::pending::<()>().await;
            }
            "SIGINT"
        }
        _ = async {
            match terminate.as_mut() {
                Some(stream) => { stream.recv().await; }
                None => std::future::pending::<()>().await,
            }
        } => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Unable to listen for interrupts");
        std::future::pending::<()>().await;
    }
    "ctrl-c"
}
