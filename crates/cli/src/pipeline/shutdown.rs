//! Ctrl+C / SIGTERM → job cancellation

use orchestrator::CancellationToken;
use tracing::{info, warn};

/// Spawn a task that cancels the returned token on Ctrl+C or SIGTERM.
///
/// The orchestrator observes the token and still tears the worker down.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            _ = ctrl_c() => info!("Received Ctrl+C, cancelling job"),
            _ = terminate() => info!("Received SIGTERM, cancelling job"),
            _ = cancel.cancelled() => return,
        }
        cancel.cancel();
    });

    token
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_starts_uncancelled() {
        let token = install_shutdown_handler();
        assert!(!token.is_cancelled());

        // Cancelling from elsewhere ends the signal task without effect
        token.cancel();
        tokio::task::yield_now().await;
        assert!(token.is_cancelled());
    }
}
