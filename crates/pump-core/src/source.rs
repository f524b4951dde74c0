//! Subscription source abstractions.
//!
//! A [`SubscriptionProvider`] opens one [`SubscriptionStream`] per job. The
//! stream pushes every delivered [`Message`] into a [`MessageHandler`] until
//! its cancellation token fires, the handler fails, or the transport fails.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::Result;

/// Acknowledges one delivered message to its source.
#[async_trait]
pub trait Acknowledge: Send + Sync {
    /// Confirms the message so the source does not redeliver it.
    async fn ack(&self) -> Result<()>;
}

/// Identifies a delivered message and acknowledges it.
pub struct AckHandle {
    id: String,
    inner: Box<dyn Acknowledge>,
}

impl AckHandle {
    /// Creates a new handle for the message with the given id.
    pub fn new(id: impl Into<String>, inner: impl Acknowledge + 'static) -> Self {
        Self {
            id: id.into(),
            inner: Box::new(inner),
        }
    }

    /// Returns the message id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acknowledges the message.
    pub async fn ack(&self) -> Result<()> {
        self.inner.ack().await
    }
}

impl fmt::Debug for AckHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AckHandle").field("id", &self.id).finish()
    }
}

/// A single message delivered by a subscription.
#[derive(Debug)]
pub struct Message {
    data: Bytes,
    handle: AckHandle,
}

impl Message {
    /// Creates a new message.
    pub fn new(id: impl Into<String>, data: Bytes, acker: impl Acknowledge + 'static) -> Self {
        Self {
            data,
            handle: AckHandle::new(id, acker),
        }
    }

    /// Returns the message id.
    pub fn id(&self) -> &str {
        self.handle.id()
    }

    /// Returns the raw payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Acknowledges the message.
    pub async fn ack(&self) -> Result<()> {
        self.handle.ack().await
    }

    /// Splits the message into its payload and acknowledgement handle.
    pub fn into_parts(self) -> (Bytes, AckHandle) {
        (self.data, self.handle)
    }
}

/// Callback invoked for every delivered message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Processes one message. An error stops the delivery loop.
    async fn handle(&self, message: Message) -> Result<()>;
}

/// An open subscription delivering messages to a handler.
#[async_trait]
pub trait SubscriptionStream: Send {
    /// Delivers messages until `cancel` fires, the handler fails, or the
    /// transport fails.
    ///
    /// Cancellation is cooperative: a message already passed to the handler
    /// runs to completion. Returns `Ok(())` when delivery stopped because
    /// of cancellation or because the source has no more messages, and the
    /// first handler or transport error otherwise.
    async fn receive(
        &mut self,
        handler: &dyn MessageHandler,
        cancel: CancellationToken,
    ) -> Result<()>;
}

/// Opens subscription streams by name.
#[async_trait]
pub trait SubscriptionProvider: Send + Sync {
    /// Opens the named subscription.
    ///
    /// Fails with [`ErrorKind::Resource`](crate::ErrorKind::Resource) when the
    /// subscription does not exist or cannot be reached.
    async fn open_stream(&self, subscription: &str) -> Result<Box<dyn SubscriptionStream>>;
}
