//! Response bodies.

use std::borrow::Cow;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_HANDLER;

/// Error body, `{"message": ..., "status": ...}`.
#[must_use = "error responses do nothing unless serialized"]
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse<'a> {
    /// Generic message safe for client display.
    pub message: Cow<'a, str>,
    /// Name of the status, e.g. `BadRequest`.
    pub status: Cow<'a, str>,

    /// Internal context for the logs, never serialized.
    #[serde(skip)]
    pub context: Option<Cow<'a, str>>,
    /// HTTP status code, never serialized.
    #[serde(skip)]
    pub code: StatusCode,
}

impl<'a> ErrorResponse<'a> {
    pub const BAD_REQUEST: Self = Self::new(
        "Invalid request format",
        "BadRequest",
        StatusCode::BAD_REQUEST,
    );
    pub const INTERNAL_SERVER_ERROR: Self = Self::new(
        "Error processing request, see logs",
        "InternalServerError",
        StatusCode::INTERNAL_SERVER_ERROR,
    );
    pub const NOT_FOUND: Self = Self::new("Route not found", "NotFound", StatusCode::NOT_FOUND);

    /// Creates a new error response.
    #[inline]
    pub const fn new(message: &'a str, status: &'a str, code: StatusCode) -> Self {
        Self {
            message: Cow::Borrowed(message),
            status: Cow::Borrowed(status),
            context: None,
            code,
        }
    }

    /// Attaches context to the error response.
    /// If context already exists, it merges them with a separator.
    pub fn with_context(mut self, context: impl Into<Cow<'a, str>>) -> Self {
        let new_context = context.into();
        self.context = Some(match self.context {
            Some(existing) => Cow::Owned(format!("{}; {}", existing, new_context)),
            None => new_context,
        });
        self
    }
}

impl Default for ErrorResponse<'_> {
    #[inline]
    fn default() -> Self {
        Self::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ErrorResponse<'_> {
    fn into_response(self) -> Response {
        if self.code.is_server_error() {
            tracing::error!(
                target: TRACING_TARGET_HANDLER,
                status = %self.code,
                context = ?self.context,
                "HTTP error response"
            );
        } else {
            tracing::warn!(
                target: TRACING_TARGET_HANDLER,
                status = %self.code,
                context = ?self.context,
                "HTTP error response"
            );
        }

        (self.code, Json(self)).into_response()
    }
}

/// Body of `GET /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Build identifier of the running service.
    pub release: String,
    /// When the request was received.
    pub request_on: Timestamp,
    /// Address of the caller, or `unknown`.
    pub request_from: String,
}
