//! Liveness and service information handlers.

use std::net::SocketAddr;

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::{Extensions, HeaderMap};
use jiff::Timestamp;

use crate::handler::response::ServiceInfo;
use crate::service::ServiceState;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Answers `OK` while the process is up.
pub async fn health() -> &'static str {
    "OK"
}

/// Describes the running service and the caller.
pub async fn info(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    extensions: Extensions,
) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        release: state.release().to_owned(),
        request_on: Timestamp::now(),
        request_from: request_from(&headers, &extensions),
    })
}

/// Returns the first forwarded address, else the peer address, else `unknown`.
fn request_from(headers: &HeaderMap, extensions: &Extensions) -> String {
    let forwarded = headers
        .get(X_FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|addr| !addr.is_empty());

    if let Some(addr) = forwarded {
        return addr.to_owned();
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn forwarded_address_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 4000))));

        assert_eq!(request_from(&headers, &extensions), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_peer_then_unknown() {
        let headers = HeaderMap::new();
        let mut extensions = Extensions::new();
        assert_eq!(request_from(&headers, &extensions), "unknown");

        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 4000))));
        assert_eq!(request_from(&headers, &extensions), "10.0.0.2");
    }
}
