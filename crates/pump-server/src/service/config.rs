use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use pump_core::{AckMode, EngineConfig};
use pump_nats::{NatsClient, NatsConfig};
use pump_postgres::{PgClient, PgConfig};
use serde::{Deserialize, Serialize};

use crate::service::{Error, Result};

/// Default values for configuration options.
mod defaults {
    /// Release reported when none is configured.
    pub const RELEASE: &str = "v0.0.1-default";

    /// Default interval between two stall checks, in seconds.
    pub const STALL_CHECK_INTERVAL_SECS: u64 = 5;
}

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
#[builder(
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct ServiceConfig {
    /// Build identifier echoed in results and metrics.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "RELEASE", default_value = defaults::RELEASE)
    )]
    #[builder(default = "defaults::RELEASE.to_owned()")]
    pub release: String,

    /// Seconds between two stall checks of a running job.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pump-stall-check-interval",
            env = "PUMP_STALL_CHECK_INTERVAL",
            default_value_t = defaults::STALL_CHECK_INTERVAL_SECS
        )
    )]
    #[builder(default = "defaults::STALL_CHECK_INTERVAL_SECS")]
    pub stall_check_interval: u64,

    /// When delivered messages are acknowledged: `on-append` or `on-flush`.
    #[cfg_attr(
        feature = "config",
        arg(long = "pump-ack-mode", env = "PUMP_ACK_MODE", default_value = "on-append")
    )]
    #[builder(default)]
    pub ack_mode: AckMode,

    /// NATS connection used for subscriptions and metrics.
    #[cfg_attr(feature = "config", command(flatten))]
    #[builder(default)]
    pub nats: NatsConfig,

    /// Postgres connection used for the sink tables.
    #[cfg_attr(feature = "config", command(flatten))]
    pub postgres: PgConfig,
}

impl ServiceConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Returns the engine settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(&self.release)
            .with_stall_check_interval(Duration::from_secs(self.stall_check_interval))
            .with_ack_mode(self.ack_mode)
    }

    /// Connects to the NATS server.
    pub async fn connect_nats(&self) -> Result<NatsClient> {
        Ok(NatsClient::connect(self.nats.clone()).await?)
    }

    /// Connects to the sink database.
    pub async fn connect_postgres(&self) -> Result<PgClient> {
        Ok(PgClient::connect(self.postgres.clone()).await?)
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> Result<()> {
        check_release(&self.release).map_err(Error::config)?;
        check_stall_check_interval(self.stall_check_interval).map_err(Error::config)?;
        self.nats.validate().map_err(Error::config)?;
        self.postgres
            .validate()
            .map_err(|e| Error::config("invalid Postgres configuration").with_source(e))?;
        Ok(())
    }
}

impl ServiceConfigBuilder {
    /// Wrapper for builder validation that returns String errors.
    fn validate(builder: &ServiceConfigBuilder) -> std::result::Result<(), String> {
        if let Some(release) = &builder.release {
            check_release(release)?;
        }

        if let Some(interval) = builder.stall_check_interval {
            check_stall_check_interval(interval)?;
        }

        if let Some(nats) = &builder.nats {
            nats.validate()?;
        }

        if let Some(postgres) = &builder.postgres {
            postgres.validate().map_err(|e| e.to_string())?;
        }

        Ok(())
    }
}

fn check_release(release: &str) -> std::result::Result<(), String> {
    if release.trim().is_empty() {
        return Err("Release cannot be empty".to_owned());
    }
    Ok(())
}

fn check_stall_check_interval(secs: u64) -> std::result::Result<(), String> {
    if secs == 0 || secs > 60 {
        return Err(format!(
            "Stall check interval {secs} seconds is invalid. Must be between 1 and 60 seconds."
        ));
    }
    Ok(())
}
