//! Pooled PostgreSQL client.

use std::sync::Arc;
use std::time::{Duration, Instant};

use deadpool::managed::{Hook, Pool};
use diesel::sql_types::Integer;
use diesel_async::RunQueryDsl;
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};

use super::custom_hooks;
use crate::{
    ConnectionPool, PgConfig, PgError, PgResult, PooledConnection, TRACING_TARGET_CONNECTION,
};

/// Checkouts slower than this are reported as pool pressure.
const SLOW_CHECKOUT: Duration = Duration::from_millis(100);

/// Connection pool shared by every table writer.
///
/// Clones are cheap and share the same pool.
#[derive(Clone)]
pub struct PgClient {
    inner: Arc<PgClientInner>,
}

struct PgClientInner {
    pool: ConnectionPool,
    config: PgConfig,
}

#[derive(diesel::QueryableByName)]
struct Probe {
    #[diesel(sql_type = Integer)]
    #[allow(dead_code)]
    probe: i32,
}

impl PgClient {
    /// Builds the pool without opening a connection.
    pub fn new(config: PgConfig) -> PgResult<Self> {
        config.validate()?;

        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(custom_hooks::setup_callback);
        let manager =
            AsyncDieselConnectionManager::new_with_config(&config.postgres_url, manager_config);

        let pool = Pool::builder(manager)
            .max_size(config.postgres_max_connections as usize)
            .wait_timeout(Some(config.connect_timeout()))
            .create_timeout(Some(config.connect_timeout()))
            .recycle_timeout(Some(config.idle_timeout()))
            .runtime(deadpool::Runtime::Tokio1)
            .pre_recycle(Hook::sync_fn(custom_hooks::pre_recycle))
            .build()
            .map_err(|e| PgError::Unexpected(format!("cannot build connection pool: {e}").into()))?;

        Ok(Self {
            inner: Arc::new(PgClientInner { pool, config }),
        })
    }

    /// Builds the pool and checks that the database answers a probe query.
    #[tracing::instrument(
        skip(config),
        target = TRACING_TARGET_CONNECTION,
        fields(url = %config.masked_url())
    )]
    pub async fn connect(config: PgConfig) -> PgResult<Self> {
        let client = Self::new(config)?;

        let mut conn = client.get_connection().await?;
        let _: Probe = diesel::sql_query("SELECT 1 AS probe")
            .get_result(&mut *conn)
            .await?;

        let config = &client.inner.config;
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            max_connections = config.postgres_max_connections,
            connect_timeout = config.postgres_connect_timeout,
            idle_timeout = config.postgres_idle_timeout,
            "Connected to the sink database"
        );

        Ok(client)
    }

    /// Checks a connection out of the pool.
    pub async fn get_connection(&self) -> PgResult<PooledConnection> {
        let started = Instant::now();
        let result = self.inner.pool.get().await;
        let elapsed = started.elapsed();

        match result {
            Ok(conn) => {
                if elapsed > SLOW_CHECKOUT {
                    let status = self.inner.pool.status();
                    tracing::warn!(
                        target: TRACING_TARGET_CONNECTION,
                        elapsed_ms = elapsed.as_millis() as u64,
                        pool_size = status.size,
                        waiting = status.waiting,
                        "Slow connection checkout"
                    );
                }
                Ok(conn)
            }
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET_CONNECTION,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Connection checkout failed"
                );
                Err(e.into())
            }
        }
    }

    /// Returns the configuration the pool was built from.
    #[inline]
    pub fn config(&self) -> &PgConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for PgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.inner.pool.status();
        f.debug_struct("PgClient")
            .field("url", &self.inner.config.masked_url())
            .field("max_size", &status.max_size)
            .field("size", &status.size)
            .field("available", &status.available)
            .finish()
    }
}
