use async_trait::async_trait;
use pump_core::ErrorKind;
use pump_core::source::{SubscriptionProvider, SubscriptionStream};

use super::SubscriptionName;
use crate::{Error, NatsClient};

/// Opens JetStream subscriptions for the pump engine.
#[derive(Debug, Clone)]
pub struct NatsSubscriptionProvider {
    client: NatsClient,
}

impl NatsSubscriptionProvider {
    /// Creates a new provider over a connected client.
    pub fn new(client: NatsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubscriptionProvider for NatsSubscriptionProvider {
    async fn open_stream(
        &self,
        subscription: &str,
    ) -> pump_core::Result<Box<dyn SubscriptionStream>> {
        let name: SubscriptionName = subscription
            .parse()
            .map_err(|e: Error| e.into_core(ErrorKind::BadRequest))?;

        let stream = self
            .client
            .subscription(&name)
            .await
            .map_err(|e| e.into_core(ErrorKind::Resource))?;

        Ok(Box::new(stream))
    }
}
