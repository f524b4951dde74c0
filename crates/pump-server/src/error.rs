//! Errors raised while configuring and wiring the service.
//!
//! Errors of a running job are [`pump_core::Error`]s and never pass through
//! this type.

use std::borrow::Cow;
use std::error::Error as StdError;

use strum::{AsRefStr, Display, IntoStaticStr};

/// Type alias for boxed errors that are Send + Sync.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for service layer operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What the service was doing when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A configuration value is missing or out of range.
    Config,
    /// The NATS connection could not be established.
    Nats,
    /// The Postgres pool could not be built or reached.
    Postgres,
}

/// Service layer error with an optional source.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Creates a new NATS connection error.
    pub fn nats(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Nats, message)
    }

    /// Creates a new Postgres connection error.
    pub fn postgres(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Postgres, message)
    }

    /// Attaches a source error.
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<pump_nats::Error> for Error {
    fn from(err: pump_nats::Error) -> Self {
        Self::nats(err.to_string()).with_source(err)
    }
}

impl From<pump_postgres::PgError> for Error {
    fn from(err: pump_postgres::PgError) -> Self {
        let kind = match err {
            pump_postgres::PgError::Config(_) => ErrorKind::Config,
            _ => ErrorKind::Postgres,
        };
        Self::new(kind, err.to_string()).with_source(err)
    }
}
