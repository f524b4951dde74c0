//! JetStream subscription source.

mod provider;
mod subscription;
mod subscription_name;

pub use provider::NatsSubscriptionProvider;
pub use subscription::JetStreamSubscription;
pub use subscription_name::SubscriptionName;
