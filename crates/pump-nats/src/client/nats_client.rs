//! Shared NATS connection.
//!
//! `async-nats` multiplexes every operation over one TCP connection, so a
//! single [`NatsClient`] serves the subscriptions and metrics of every
//! concurrent pump job.

use std::sync::Arc;

use async_nats::connection::State;
use async_nats::{Client, ConnectOptions, jetstream};
use bytes::Bytes;
use tokio::time::timeout;

use super::nats_config::{MAX_RECONNECT_DELAY, NatsConfig, PING_INTERVAL, RECONNECT_DELAY};
use crate::stream::{JetStreamSubscription, SubscriptionName};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

/// Cloneable handle to a NATS connection and its JetStream context.
#[derive(Debug, Clone)]
pub struct NatsClient {
    inner: Arc<NatsClientInner>,
}

#[derive(Debug)]
struct NatsClientInner {
    client: Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Connects to the configured servers.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_CONNECTION, fields(name = config.name()))]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        config.validate().map_err(Error::invalid_config)?;

        let mut options = ConnectOptions::new()
            .name(config.name())
            .connection_timeout(config.connect_timeout())
            .request_timeout(Some(config.request_timeout()))
            .ping_interval(PING_INTERVAL)
            .reconnect_delay_callback(|attempts| {
                let factor = 1_u32 << attempts.min(4);
                (RECONNECT_DELAY * factor).min(MAX_RECONNECT_DELAY)
            });

        if let Some(token) = config.nats_token.clone() {
            options = options.token(token);
        }

        let connect_timeout = config.connect_timeout();
        let client = timeout(
            connect_timeout,
            async_nats::connect_with_options(config.nats_url.as_str(), options),
        )
        .await
        .map_err(|_| Error::timeout(connect_timeout))?
        .map_err(|e| Error::Connection(Box::new(e)))?;

        let info = client.server_info();
        tracing::info!(
            target: TRACING_TARGET_CONNECTION,
            server_id = %info.server_id,
            server_version = %info.version,
            max_payload = info.max_payload,
            "Connected to NATS"
        );

        let jetstream = jetstream::new(client.clone());
        Ok(Self {
            inner: Arc::new(NatsClientInner {
                client,
                jetstream,
                config,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &NatsConfig {
        &self.inner.config
    }

    /// Returns whether the connection is currently up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self.inner.client.connection_state(), State::Connected)
    }

    /// Opens the durable pull consumer named by `name`.
    #[tracing::instrument(skip_all, target = TRACING_TARGET_CLIENT, fields(subscription = %name))]
    pub async fn subscription(&self, name: &SubscriptionName) -> Result<JetStreamSubscription> {
        JetStreamSubscription::open(&self.inner.jetstream, name.clone()).await
    }

    /// Publishes a payload on a core NATS subject and waits for the flush.
    pub async fn publish(&self, subject: String, payload: Bytes) -> Result<()> {
        let client = &self.inner.client;
        client
            .publish(subject.clone(), payload)
            .await
            .map_err(|e| Error::delivery_failed(&subject, e.to_string()))?;
        client
            .flush()
            .await
            .map_err(|e| Error::delivery_failed(&subject, e.to_string()))
    }
}
