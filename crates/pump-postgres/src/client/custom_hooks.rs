//! Connection callbacks installed into the [`deadpool`] pool.

use std::time::Instant;

use deadpool::managed::{HookResult, Metrics};
use diesel::ConnectionResult;
use diesel_async::pooled_connection::{PoolError, PoolableConnection};
use diesel_async::{AsyncConnection, AsyncPgConnection};
use futures::FutureExt;
use futures::future::BoxFuture;

use super::pg_config::mask_password;
use crate::TRACING_TARGET_CONNECTION;

/// Opens a connection and logs how long it took.
///
/// Installed as [`ManagerConfig::custom_setup`].
///
/// [`ManagerConfig::custom_setup`]: diesel_async::pooled_connection::ManagerConfig
pub fn setup_callback<C>(url: &str) -> BoxFuture<'_, ConnectionResult<C>>
where
    C: AsyncConnection + 'static,
{
    let started = Instant::now();

    async move {
        let result = C::establish(url).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if let Err(error) = &result {
            tracing::error!(
                target: TRACING_TARGET_CONNECTION,
                url = %mask_password(url),
                elapsed_ms,
                error = %error,
                "Cannot open database connection"
            );
        } else {
            tracing::debug!(
                target: TRACING_TARGET_CONNECTION,
                elapsed_ms,
                "Opened database connection"
            );
        }

        result
    }
    .boxed()
}

/// Reports connections that broke while they were checked out.
///
/// The pool's own recycle check discards them, so this never fails.
pub fn pre_recycle(conn: &mut AsyncPgConnection, metrics: &Metrics) -> HookResult<PoolError> {
    if conn.is_broken() {
        tracing::warn!(
            target: TRACING_TARGET_CONNECTION,
            recycle_count = metrics.recycle_count,
            "Returned connection is broken"
        );
    }

    Ok(())
}
