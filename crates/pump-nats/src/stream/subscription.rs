//! Delivery loop over a JetStream durable pull consumer.

use async_nats::jetstream::consumer::pull::MessagesErrorKind;
use async_nats::jetstream::consumer::{self, Consumer};
use async_nats::jetstream::{self, Context};
use async_trait::async_trait;
use futures::StreamExt;
use pump_core::ErrorKind;
use pump_core::source::{Acknowledge, Message, MessageHandler, SubscriptionStream};
use tokio_util::sync::CancellationToken;

use super::SubscriptionName;
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// An open subscription on a JetStream durable pull consumer.
///
/// The consumer must already exist; its acknowledgement policy should be
/// explicit so that unacknowledged messages are redelivered.
pub struct JetStreamSubscription {
    name: SubscriptionName,
    consumer: Consumer<consumer::pull::Config>,
}

impl JetStreamSubscription {
    /// Looks up the stream and the consumer named by `name`.
    pub(crate) async fn open(jetstream: &Context, name: SubscriptionName) -> Result<Self> {
        let stream = jetstream
            .get_stream(name.stream())
            .await
            .map_err(|e| Error::stream_error(name.stream(), e.to_string()))?;

        let consumer = stream
            .get_consumer::<consumer::pull::Config>(name.consumer())
            .await
            .map_err(|e| Error::consumer_error(name.consumer(), e.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_STREAM,
            stream = %name.stream(),
            consumer = %name.consumer(),
            "Opened subscription"
        );

        Ok(Self { name, consumer })
    }

    /// Returns the subscription name.
    pub fn name(&self) -> &SubscriptionName {
        &self.name
    }

    fn to_message(&self, message: jetstream::Message) -> Message {
        let id = match message.info() {
            Ok(info) => format!("{}:{}", info.stream, info.stream_sequence),
            Err(_) => format!("{}:{}", self.name.stream(), message.subject),
        };

        let data = message.payload.clone();
        Message::new(id, data, JetStreamAck { message })
    }
}

#[async_trait]
impl SubscriptionStream for JetStreamSubscription {
    async fn receive(
        &mut self,
        handler: &dyn MessageHandler,
        cancel: CancellationToken,
    ) -> pump_core::Result<()> {
        let mut messages = self.consumer.messages().await.map_err(|e| {
            Error::consumer_error(self.name.consumer(), e.to_string()).into_core(ErrorKind::Stream)
        })?;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(
                        target: TRACING_TARGET_STREAM,
                        subscription = %self.name,
                        "Delivery cancelled"
                    );
                    return Ok(());
                }
                next = messages.next() => next,
            };

            match next {
                Some(Ok(message)) => handler.handle(self.to_message(message)).await?,
                Some(Err(e)) if is_transient(e.kind()) => {
                    tracing::warn!(
                        target: TRACING_TARGET_STREAM,
                        subscription = %self.name,
                        error = %e,
                        "Transient receive error, still waiting for messages"
                    );
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        target: TRACING_TARGET_STREAM,
                        subscription = %self.name,
                        error = %e,
                        "Error receiving message"
                    );
                    return Err(Error::operation("message_receive", e.to_string())
                        .into_core(ErrorKind::Stream));
                }
                None => return Ok(()),
            }
        }
    }
}

/// Whether the message stream keeps delivering after this error.
///
/// A missed heartbeat only means the server was quiet for a while. Deleted
/// consumers and failed pulls end the delivery.
fn is_transient(kind: MessagesErrorKind) -> bool {
    matches!(kind, MessagesErrorKind::MissingHeartbeat)
}

struct JetStreamAck {
    message: jetstream::Message,
}

#[async_trait]
impl Acknowledge for JetStreamAck {
    async fn ack(&self) -> pump_core::Result<()> {
        self.message.ack().await.map_err(|e| {
            Error::operation("message_ack", e.to_string()).into_core(ErrorKind::Stream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missed_heartbeats_are_transient() {
        assert!(is_transient(MessagesErrorKind::MissingHeartbeat));

        for kind in [
            MessagesErrorKind::ConsumerDeleted,
            MessagesErrorKind::Pull,
            MessagesErrorKind::PushBasedConsumer,
            MessagesErrorKind::NoResponders,
            MessagesErrorKind::Other,
        ] {
            assert!(!is_transient(kind), "{kind}");
        }
    }
}
