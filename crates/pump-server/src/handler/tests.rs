use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use pump_core::metrics::MetricKind;
use pump_core::mock::{self, MockMetrics, MockSink, MockSubscription};
use pump_core::{EngineConfig, PumpResult, StopReason};
use serde_json::json;

use super::*;

struct Fixture {
    subscription: MockSubscription,
    sink: MockSink,
    metrics: MockMetrics,
}

impl Fixture {
    fn new(subscription: MockSubscription) -> Self {
        Self {
            subscription,
            sink: MockSink::new(),
            metrics: MockMetrics::new(),
        }
    }

    fn state(&self) -> ServiceState {
        let config = EngineConfig::new("v1.2.3");
        ServiceState::new(mock::engine(&self.subscription, &self.sink, &self.metrics, config))
    }

    fn server(&self) -> anyhow::Result<TestServer> {
        Ok(TestServer::new(routes(self.state()))?)
    }
}

fn job() -> serde_json::Value {
    json!({
        "id": "job-1",
        "source": {"subscription": "EVENTS/pump", "max_stall": 5},
        "target": {"dataset": "public", "table": "events", "batch_size": 3},
        "max_duration": 300
    })
}

#[tokio::test]
async fn health_answers_ok() -> anyhow::Result<()> {
    let server = Fixture::new(MockSubscription::new()).server()?;

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");

    Ok(())
}

#[tokio::test]
async fn info_reports_release_and_caller() -> anyhow::Result<()> {
    let server = Fixture::new(MockSubscription::new()).server()?;

    let info: ServiceInfo = server
        .get("/")
        .add_header(
            HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("198.51.100.4, 10.0.0.1"),
        )
        .await
        .json();
    assert_eq!(info.release, "v1.2.3");
    assert_eq!(info.request_from, "198.51.100.4");

    let info: ServiceInfo = server.get("/").await.json();
    assert_eq!(info.request_from, "unknown");

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn json_job_runs_to_completion() -> anyhow::Result<()> {
    let fixture = Fixture::new(MockSubscription::with_messages(7, Duration::from_millis(100)));
    let server = fixture.server()?;

    let response = server.post("/v1/pump").json(&job()).await;
    response.assert_status_ok();

    let result: PumpResult = response.json();
    assert_eq!(result.message_count, 7);
    assert_eq!(result.stop_reason, StopReason::Stalled);
    assert_eq!(result.release, "v1.2.3");
    assert_eq!(result.request.id, "job-1");
    assert_eq!(fixture.sink.batch_sizes(), vec![3, 3, 1]);
    assert_eq!(fixture.metrics.values(MetricKind::Messages), vec![7]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn yaml_job_runs_to_completion() -> anyhow::Result<()> {
    let fixture = Fixture::new(MockSubscription::with_messages(2, Duration::from_millis(100)));
    let server = fixture.server()?;

    let body = "
id: job-yaml
source: {subscription: EVENTS/pump, max_stall: 5}
target: {dataset: public, table: events, batch_size: 10}
max_duration: 300
";

    for format in ["yaml", "yml"] {
        let result: PumpResult = server
            .post(&format!("/v1/pump/{format}"))
            .text(body)
            .await
            .json();
        assert_eq!(result.message_count, 2);
        assert_eq!(result.request.id, "job-yaml");
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_format_falls_back_to_json() -> anyhow::Result<()> {
    let server = Fixture::new(MockSubscription::new()).server()?;

    let response = server.post("/v1/pump/json").json(&job()).await;
    response.assert_status_ok();

    let response = server.post("/v1/pump/xml").json(&job()).await;
    response.assert_status_ok();

    Ok(())
}

#[tokio::test]
async fn malformed_job_answers_400() -> anyhow::Result<()> {
    let fixture = Fixture::new(MockSubscription::new());
    let server = fixture.server()?;

    let bad_request = json!({"message": "Invalid request format", "status": "BadRequest"});

    let response = server.post("/v1/pump").text("{not json").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&bad_request);

    let mut invalid = job();
    invalid["source"]["max_stall"] = json!(1);
    let response = server.post("/v1/pump").json(&invalid).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&bad_request);

    assert!(fixture.subscription.opened().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn jobs_longer_than_the_request_limit_answer_400() -> anyhow::Result<()> {
    let fixture = Fixture::new(MockSubscription::with_messages(20, Duration::from_secs(1)));
    let state = fixture.state().with_job_time_limit(Duration::from_secs(60));
    let server = TestServer::new(routes(state))?;

    let response = server.post("/v1/pump").json(&job()).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    response.assert_json(&json!({"message": "Invalid request format", "status": "BadRequest"}));

    assert!(fixture.subscription.opened().is_empty());
    assert_eq!(fixture.sink.insert_calls(), 0);
    assert!(fixture.metrics.observations().is_empty());

    let mut short = job();
    short["max_duration"] = json!(10);
    let result: PumpResult = server.post("/v1/pump").json(&short).await.json();
    assert_eq!(result.stop_reason, StopReason::Deadline);
    assert_eq!(fixture.metrics.values(MetricKind::Messages), vec![result.message_count]);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_job_answers_500_without_detail() -> anyhow::Result<()> {
    let fixture = Fixture::new(MockSubscription::with_messages(5, Duration::from_millis(10)));
    fixture.sink.fail_insert_on(1);
    let server = fixture.server()?;

    let response = server.post("/v1/pump").json(&job()).await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({
        "message": "Error processing request, see logs",
        "status": "InternalServerError",
    }));
    assert!(fixture.metrics.observations().is_empty());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_token_stops_running_jobs() -> anyhow::Result<()> {
    let fixture = Fixture::new(MockSubscription::with_messages(10, Duration::from_secs(1)));
    let state = fixture.state();
    let shutdown = state.shutdown_token();
    let server = TestServer::new(routes(state))?;

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        shutdown.cancel();
    });

    let mut body = job();
    body["source"]["max_stall"] = json!(30);
    let result: PumpResult = server.post("/v1/pump").json(&body).await.json();

    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(result.message_count, 2);

    Ok(())
}

#[tokio::test]
async fn unknown_route_answers_404() -> anyhow::Result<()> {
    let server = Fixture::new(MockSubscription::new()).server()?;

    let response = server.get("/v2/pump").await;
    response.assert_status_not_found();
    response.assert_json(&json!({"message": "Route not found", "status": "NotFound"}));

    Ok(())
}
