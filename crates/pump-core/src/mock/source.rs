use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use super::lock;
use crate::source::{Acknowledge, Message, MessageHandler, SubscriptionProvider, SubscriptionStream};
use crate::{Error, Result};

/// One scripted event of a mock subscription.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// Delivers a message after `delay`.
    Message { delay: Duration, data: Bytes },
    /// Fails the transport after `delay`.
    Error { delay: Duration, message: String },
}

/// Subscription that replays a fixed script on every open.
///
/// After the script is exhausted the stream idles until cancelled, like a
/// real subscription with no pending messages.
#[derive(Debug, Clone, Default)]
pub struct MockSubscription {
    inner: Arc<Mutex<SubscriptionLog>>,
}

#[derive(Debug, Default)]
struct SubscriptionLog {
    script: Vec<Delivery>,
    acked: Vec<String>,
    opened: Vec<String>,
    fail_open: bool,
    ack_fails: bool,
}

impl MockSubscription {
    /// Creates an empty subscription.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a subscription delivering `count` JSON rows, one every `interval`.
    pub fn with_messages(count: usize, interval: Duration) -> Self {
        let subscription = Self::new();
        for seq in 0..count {
            subscription.push_message(interval, format!(r#"{{"seq":{seq}}}"#));
        }
        subscription
    }

    /// Appends a message to the script.
    pub fn push_message(&self, delay: Duration, data: impl Into<Bytes>) {
        let data = data.into();
        lock(&self.inner).script.push(Delivery::Message { delay, data });
    }

    /// Appends a transport failure to the script.
    pub fn push_error(&self, delay: Duration, message: impl Into<String>) {
        let message = message.into();
        lock(&self.inner).script.push(Delivery::Error { delay, message });
    }

    /// Makes every open fail with a resource error.
    pub fn fail_open(&self) {
        lock(&self.inner).fail_open = true;
    }

    /// Makes every acknowledgement fail.
    pub fn fail_acks(&self) {
        lock(&self.inner).ack_fails = true;
    }

    /// Ids of acknowledged messages, in acknowledgement order.
    pub fn acked(&self) -> Vec<String> {
        lock(&self.inner).acked.clone()
    }

    /// Names passed to every open call.
    pub fn opened(&self) -> Vec<String> {
        lock(&self.inner).opened.clone()
    }
}

#[async_trait]
impl SubscriptionProvider for MockSubscription {
    async fn open_stream(&self, subscription: &str) -> Result<Box<dyn SubscriptionStream>> {
        let mut log = lock(&self.inner);
        log.opened.push(subscription.to_owned());
        if log.fail_open {
            return Err(Error::resource(format!(
                "subscription '{subscription}' does not exist"
            )));
        }

        Ok(Box::new(MockStream {
            pending: log.script.iter().cloned().collect(),
            subscription: self.clone(),
            name: subscription.to_owned(),
            delivered: 0,
        }))
    }
}

struct MockStream {
    pending: VecDeque<Delivery>,
    subscription: MockSubscription,
    name: String,
    delivered: usize,
}

#[async_trait]
impl SubscriptionStream for MockStream {
    async fn receive(
        &mut self,
        handler: &dyn MessageHandler,
        cancel: CancellationToken,
    ) -> Result<()> {
        while let Some(delivery) = self.pending.pop_front() {
            let delay = match &delivery {
                Delivery::Message { delay, .. } | Delivery::Error { delay, .. } => *delay,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }

            match delivery {
                Delivery::Message { data, .. } => {
                    self.delivered += 1;
                    let id = format!("{}:{}", self.name, self.delivered);
                    let acker = MockAck {
                        id: id.clone(),
                        subscription: self.subscription.clone(),
                    };
                    handler.handle(Message::new(id, data, acker)).await?;
                }
                Delivery::Error { message, .. } => return Err(Error::stream(message)),
            }
        }

        cancel.cancelled().await;
        Ok(())
    }
}

struct MockAck {
    id: String,
    subscription: MockSubscription,
}

#[async_trait]
impl Acknowledge for MockAck {
    async fn ack(&self) -> Result<()> {
        let mut log = lock(&self.subscription.inner);
        if log.ack_fails {
            return Err(Error::stream("acknowledgement rejected"));
        }
        log.acked.push(self.id.clone());
        Ok(())
    }
}
