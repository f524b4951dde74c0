//! HTTP server startup and graceful shutdown.

mod shutdown;

use std::future::IntoFuture;
use std::io;
use std::net::SocketAddr;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::server::shutdown::shutdown_signal;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Serves `app` until a shutdown signal arrives.
///
/// On SIGINT or SIGTERM the server stops accepting connections and cancels
/// `jobs`, which stops every running pump job. In-flight requests are then
/// given up to the shutdown timeout to answer.
pub async fn serve(app: Router, config: &ServerConfig, jobs: CancellationToken) -> io::Result<()> {
    let addr = config.server_addr();
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(
                target: TRACING_TARGET_SERVER_STARTUP,
                %addr,
                error = %err,
                hint = bind_hint(&err),
                "Cannot bind server address"
            );
            return Err(err);
        }
    };

    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Listening on all interfaces, the pump endpoint is unauthenticated"
        );
    }

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        %addr,
        "Accepting pump requests"
    );

    let started = Instant::now();
    let result = run(listener, app, config, jobs).await;
    let uptime_secs = started.elapsed().as_secs();

    match &result {
        Ok(()) => tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            uptime_secs,
            "Server stopped"
        ),
        Err(err) => tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            uptime_secs,
            error = %err,
            "Server failed"
        ),
    }

    result
}

async fn run(
    listener: TcpListener,
    app: Router,
    config: &ServerConfig,
    jobs: CancellationToken,
) -> io::Result<()> {
    let stopping = jobs.clone();
    let graceful = async move {
        shutdown_signal().await;
        stopping.cancel();
    };

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(graceful)
    .into_future();

    let shutdown_timeout = config.shutdown_timeout();
    let drain_limit = async {
        jobs.cancelled().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => result,
        () = drain_limit => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = shutdown_timeout.as_secs(),
                "Shutdown timeout exceeded, dropping in-flight requests"
            );
            Ok(())
        }
    }
}

/// Returns an operator hint for a failed bind.
fn bind_hint(err: &io::Error) -> &'static str {
    match err.kind() {
        io::ErrorKind::PermissionDenied => "use a port above 1024 or run with more privileges",
        io::ErrorKind::AddrInUse => "another process already listens on this port",
        io::ErrorKind::AddrNotAvailable => "the host address is not assigned to this machine",
        _ => "check HOST and PORT",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn hints_for_bind_errors() {
        let in_use = io::Error::from(io::ErrorKind::AddrInUse);
        assert_eq!(
            bind_hint(&in_use),
            "another process already listens on this port"
        );
        assert_eq!(bind_hint(&io::Error::other("boom")), "check HOST and PORT");
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_jobs_bound_the_drain() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig::default();
        let jobs = CancellationToken::new();
        jobs.cancel();

        let result = tokio::time::timeout(
            config.shutdown_timeout() + Duration::from_secs(1),
            run(listener, Router::new(), &config, jobs),
        )
        .await;

        assert!(matches!(result, Ok(Ok(()))));
    }
}
