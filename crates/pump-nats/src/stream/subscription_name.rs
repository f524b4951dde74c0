use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A JetStream stream and durable consumer, written `<stream>/<consumer>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionName {
    stream: String,
    consumer: String,
}

impl SubscriptionName {
    /// Returns the stream name.
    #[inline]
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// Returns the durable consumer name.
    #[inline]
    pub fn consumer(&self) -> &str {
        &self.consumer
    }
}

impl FromStr for SubscriptionName {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let (stream, consumer) = name
            .split_once('/')
            .ok_or_else(|| Error::invalid_subscription(name, "expected <stream>/<consumer>"))?;

        for (part, value) in [("stream", stream), ("consumer", consumer)] {
            if value.is_empty() {
                return Err(Error::invalid_subscription(
                    name,
                    format!("{part} name is empty"),
                ));
            }

            if value
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '.' | '*' | '>' | '/' | '\\'))
            {
                return Err(Error::invalid_subscription(
                    name,
                    format!("{part} name contains reserved characters"),
                ));
            }
        }

        Ok(Self {
            stream: stream.to_owned(),
            consumer: consumer.to_owned(),
        })
    }
}

impl fmt::Display for SubscriptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stream, self.consumer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_and_consumer() {
        let name: SubscriptionName = "EVENTS/pump-events".parse().unwrap();
        assert_eq!(name.stream(), "EVENTS");
        assert_eq!(name.consumer(), "pump-events");
        assert_eq!(name.to_string(), "EVENTS/pump-events");
    }

    #[test]
    fn rejects_malformed_names() {
        for name in [
            "",
            "EVENTS",
            "/pump",
            "EVENTS/",
            "EVENTS/pump/extra",
            "EVENTS/pump.events",
            "EV ENTS/pump",
            "EVENTS/*",
        ] {
            assert!(name.parse::<SubscriptionName>().is_err(), "name {name:?}");
        }
    }
}
