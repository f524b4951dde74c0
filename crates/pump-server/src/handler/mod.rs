//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod error;
mod health;
mod pump;
mod request;
mod response;

#[cfg(test)]
mod tests;

use axum::Router;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub use crate::handler::request::JobFormat;
pub use crate::handler::response::{ErrorResponse, ServiceInfo};
use crate::service::ServiceState;

#[inline]
async fn fallback() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with every route of the service.
pub fn routes(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/", get(health::info))
        .route("/v1/pump", post(pump::pump))
        .route("/v1/pump/{format}", post(pump::pump_with_format))
        .fallback(fallback)
        .with_state(state)
}
