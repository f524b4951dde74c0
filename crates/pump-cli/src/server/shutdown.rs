//! Process signals that start a graceful shutdown.

use std::future::pending;

use crate::TRACING_TARGET_SERVER_SHUTDOWN;

/// Completes on the first SIGINT or SIGTERM.
///
/// A signal whose handler cannot be installed is logged and never fires.
pub async fn shutdown_signal() {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    %error,
                    "Cannot listen for SIGINT"
                );
                pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_SERVER_SHUTDOWN,
                    %error,
                    "Cannot listen for SIGTERM"
                );
                pending().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = pending::<&'static str>();

    let signal = tokio::select! {
        signal = interrupt => signal,
        signal = terminate => signal,
    };

    tracing::info!(
        target: TRACING_TARGET_SERVER_SHUTDOWN,
        signal,
        "Stopping, running jobs will flush and answer"
    );
}
