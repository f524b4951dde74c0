//! Pump job handlers.

use axum::Json;
use axum::extract::{Path, State};
use bytes::Bytes;
use pump_core::{PumpEngine, PumpResult};
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_HANDLER;
use crate::handler::request::JobFormat;
use crate::handler::{ErrorKind, Result};
use crate::service::JobTimeLimit;

/// Runs a job described by a JSON body.
pub async fn pump(
    State(engine): State<PumpEngine>,
    State(shutdown): State<CancellationToken>,
    State(limit): State<JobTimeLimit>,
    body: Bytes,
) -> Result<Json<PumpResult>> {
    run(engine, shutdown, limit, JobFormat::Json, body).await
}

/// Runs a job whose body encoding is named by the path.
pub async fn pump_with_format(
    State(engine): State<PumpEngine>,
    State(shutdown): State<CancellationToken>,
    State(limit): State<JobTimeLimit>,
    Path(format): Path<String>,
    body: Bytes,
) -> Result<Json<PumpResult>> {
    run(engine, shutdown, limit, JobFormat::from_path(&format), body).await
}

async fn run(
    engine: PumpEngine,
    shutdown: CancellationToken,
    limit: JobTimeLimit,
    format: JobFormat,
    body: Bytes,
) -> Result<Json<PumpResult>> {
    let spec = format
        .decode(&body)
        .map_err(|e| ErrorKind::BadRequest.with_context(e))?;
    limit
        .check(&spec, engine.config().stall_check_interval)
        .map_err(|e| ErrorKind::BadRequest.with_context(e))?;

    tracing::info!(
        target: TRACING_TARGET_HANDLER,
        job_id = %spec.id,
        format = %format,
        "Pump request accepted"
    );

    // A dropped connection must not cancel a running job.
    let job = tokio::spawn(async move { engine.run_until(spec, shutdown).await });
    let result = job
        .await
        .map_err(|e| ErrorKind::InternalServerError.with_context(e.to_string()))??;

    Ok(Json(result))
}
