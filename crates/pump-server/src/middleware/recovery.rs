//! Recovery middleware for handling errors, panics, and timeouts.

use std::any::Any;
use std::future::ready;
use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
#[cfg(feature = "config")]
use clap::Args;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handler::ErrorKind;

/// Tracing target for error recovery.
const TRACING_TARGET_ERROR: &str = "pump_server::recovery::error";

/// Tracing target for panic recovery.
const TRACING_TARGET_PANIC: &str = "pump_server::recovery::panic";

type ResponseFut = BoxFuture<'static, Response>;
type Panic = Box<dyn Any + Send + 'static>;

/// Configuration for recovery middleware behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct RecoveryConfig {
    /// Seconds to wait for a request to complete before answering 500.
    ///
    /// A pump request lasts up to the job's `max_duration`, so this bounds
    /// the longest job the service accepts.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "REQUEST_TIMEOUT", default_value = "900")
    )]
    pub request_timeout: u64,

    /// Largest accepted request body, in bytes.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_BODY_SIZE", default_value = "65536")
    )]
    pub max_body_size: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: 900,
            max_body_size: 64 * 1024,
        }
    }
}

impl RecoveryConfig {
    /// Creates a new configuration with the specified request timeout in seconds.
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self {
            request_timeout: secs,
            ..Self::default()
        }
    }

    /// Returns the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Checks that the timeout and the body limit are usable.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout == 0 {
            return Err("Request timeout must be greater than 0".to_owned());
        }

        if self.max_body_size == 0 {
            return Err("Max body size must be greater than 0".to_owned());
        }

        Ok(())
    }
}

/// Extension trait for `axum::`[`Router`] to apply recovery middleware.
pub trait RouterRecoveryExt<S> {
    /// Layers body limit, timeout and panic recovery middleware.
    ///
    /// Timeouts and panics are answered with a generic 500.
    fn with_recovery(self, config: &RecoveryConfig) -> Self;
}

impl<S> RouterRecoveryExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_recovery(self, config: &RecoveryConfig) -> Self {
        let middlewares = ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_error))
            .layer(CatchPanicLayer::custom(catch_panic))
            .layer(TimeoutLayer::new(config.request_timeout()));

        self.layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.max_body_size))
            .layer(middlewares)
    }
}

fn handle_error(err: tower::BoxError) -> ResponseFut {
    use tower::timeout::error::Elapsed;

    let error = if err.is::<Elapsed>() {
        tracing::error!(
            target: TRACING_TARGET_ERROR,
            error = %err,
            "request timeout exceeded"
        );

        ErrorKind::InternalServerError.with_context("request timeout exceeded")
    } else {
        tracing::error!(
            target: TRACING_TARGET_ERROR,
            error = %err,
            "unknown middleware error"
        );

        ErrorKind::InternalServerError.with_context(err.to_string())
    };

    ready(error.into_response()).boxed()
}

fn catch_panic(err: Panic) -> Response {
    let message = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic type");

    tracing::error!(
        target: TRACING_TARGET_PANIC,
        message = %message,
        "service panic"
    );

    ErrorKind::InternalServerError.into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum_test::TestServer;

    use super::*;

    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(5)).await;
        "done"
    }

    async fn boom() -> &'static str {
        panic!("handler exploded")
    }

    async fn echo(body: String) -> String {
        body
    }

    fn router(config: &RecoveryConfig) -> Router {
        Router::new()
            .route("/slow", get(slow))
            .route("/boom", get(boom))
            .route("/echo", post(echo))
            .with_recovery(config)
    }

    #[test]
    fn default_config() {
        let config = RecoveryConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(900));
        assert!(config.validate().is_ok());
        assert!(RecoveryConfig::with_timeout_secs(0).validate().is_err());
    }

    #[tokio::test]
    async fn timeout_answers_500() {
        let server = TestServer::new(router(&RecoveryConfig::with_timeout_secs(1))).unwrap();

        let response = server.get("/slow").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&serde_json::json!({
            "message": "Error processing request, see logs",
            "status": "InternalServerError",
        }));
    }

    #[tokio::test]
    async fn panic_answers_500() {
        let server = TestServer::new(router(&RecoveryConfig::default())).unwrap();

        let response = server.get("/boom").await;
        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let config = RecoveryConfig {
            max_body_size: 16,
            ..RecoveryConfig::default()
        };
        let server = TestServer::new(router(&config)).unwrap();

        server.post("/echo").text("small").await.assert_status_ok();
        server
            .post("/echo")
            .text("x".repeat(64))
            .await
            .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}
