//! NATS connection configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

const DEFAULT_URL: &str = "nats://127.0.0.1:4222";
const DEFAULT_CLIENT_NAME: &str = "pump";
const DEFAULT_METRICS_SUBJECT: &str = "pump.metrics";

/// Fixed delay before the first reconnect attempt; doubled up to [`MAX_RECONNECT_DELAY`].
pub(crate) const RECONNECT_DELAY: Duration = Duration::from_secs(2);
pub(crate) const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);
pub(crate) const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Connection settings for the NATS cluster that carries both the
/// subscriptions and the job metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct NatsConfig {
    /// Server URLs, comma-separated.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-url", env = "NATS_URL", default_value = DEFAULT_URL)
    )]
    pub nats_url: String,

    /// Authentication token.
    #[cfg_attr(feature = "config", arg(long = "nats-token", env = "NATS_TOKEN"))]
    pub nats_token: Option<String>,

    /// Connection name reported to the server.
    #[cfg_attr(
        feature = "config",
        arg(long = "nats-client-name", env = "NATS_CLIENT_NAME")
    )]
    pub nats_client_name: Option<String>,

    /// Seconds to wait for the initial connection.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "nats-connect-timeout",
            env = "NATS_CONNECT_TIMEOUT",
            default_value_t = 10
        )
    )]
    pub nats_connect_timeout: u64,

    /// Seconds to wait for a JetStream API reply.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "nats-request-timeout",
            env = "NATS_REQUEST_TIMEOUT",
            default_value_t = 10
        )
    )]
    pub nats_request_timeout: u64,

    /// Subject prefix job metrics are published under.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "nats-metrics-subject",
            env = "NATS_METRICS_SUBJECT",
            default_value = DEFAULT_METRICS_SUBJECT
        )
    )]
    pub nats_metrics_subject: String,
}

impl NatsConfig {
    /// Creates a configuration for `url` with default settings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            nats_url: url.into(),
            ..Self::default()
        }
    }

    /// Returns the client name.
    #[inline]
    pub fn name(&self) -> &str {
        self.nats_client_name.as_deref().unwrap_or(DEFAULT_CLIENT_NAME)
    }

    /// Returns the configured server URLs.
    pub fn servers(&self) -> impl Iterator<Item = &str> {
        self.nats_url.split(',').map(str::trim)
    }

    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.nats_connect_timeout)
    }

    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.nats_request_timeout)
    }

    /// Returns the subject prefix for job metrics.
    #[inline]
    pub fn metrics_subject(&self) -> &str {
        &self.nats_metrics_subject
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.nats_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.nats_client_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.nats_connect_timeout = secs;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.nats_request_timeout = secs;
        self
    }

    #[must_use]
    pub fn with_metrics_subject(mut self, subject: impl Into<String>) -> Self {
        self.nats_metrics_subject = subject.into();
        self
    }

    /// Checks the server URLs, timeouts, and metrics subject.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(server) = self
            .servers()
            .find(|s| !(s.starts_with("nats://") || s.starts_with("tls://")))
        {
            return Err(format!("invalid NATS server URL: '{server}'"));
        }

        if self.nats_token.as_deref() == Some("") {
            return Err("NATS token cannot be empty when set".to_owned());
        }

        if self.nats_connect_timeout == 0 || self.nats_request_timeout == 0 {
            return Err("NATS timeouts must be greater than 0".to_owned());
        }

        if !is_literal_subject(&self.nats_metrics_subject) {
            return Err(format!(
                "invalid metrics subject: '{}'",
                self.nats_metrics_subject
            ));
        }

        Ok(())
    }
}

/// A subject without wildcards, whitespace, or empty tokens.
fn is_literal_subject(subject: &str) -> bool {
    subject.split('.').all(|token| {
        !token.is_empty()
            && !token
                .chars()
                .any(|c| c.is_whitespace() || c == '*' || c == '>')
    })
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            nats_url: DEFAULT_URL.to_owned(),
            nats_token: None,
            nats_client_name: None,
            nats_connect_timeout: 10,
            nats_request_timeout: 10,
            nats_metrics_subject: DEFAULT_METRICS_SUBJECT.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = NatsConfig::default();
        assert_eq!(config.servers().collect::<Vec<_>>(), vec![DEFAULT_URL]);
        assert_eq!(config.name(), "pump");
        assert_eq!(config.metrics_subject(), "pump.metrics");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides() {
        let config = NatsConfig::new("tls://nats.internal:4222")
            .with_token("secret")
            .with_name("pump-eu")
            .with_request_timeout(3)
            .with_metrics_subject("jobs.metrics");

        assert_eq!(config.nats_token.as_deref(), Some("secret"));
        assert_eq!(config.name(), "pump-eu");
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(config.metrics_subject(), "jobs.metrics");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cluster_urls_are_split_and_trimmed() {
        let config = NatsConfig::new("nats://a:4222, nats://b:4222");
        assert_eq!(
            config.servers().collect::<Vec<_>>(),
            vec!["nats://a:4222", "nats://b:4222"]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(NatsConfig::new("").validate().is_err());
        assert!(NatsConfig::new("localhost:4222").validate().is_err());
        assert!(NatsConfig::new("nats://a:4222,").validate().is_err());
        assert!(NatsConfig::default().with_token("").validate().is_err());
        assert!(NatsConfig::default().with_connect_timeout(0).validate().is_err());
    }

    #[test]
    fn metrics_subject_must_be_literal() {
        for subject in ["", "pump..metrics", "pump.*", "pump.>", "pump metrics"] {
            let config = NatsConfig::default().with_metrics_subject(subject);
            assert!(config.validate().is_err(), "subject {subject:?}");
        }
    }
}
