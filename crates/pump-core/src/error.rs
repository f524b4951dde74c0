//! Error types shared by the engine and its collaborators.

use std::borrow::Cow;
use std::fmt;

use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can terminate a pump job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, IntoStaticStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The job description is malformed or incomplete.
    BadRequest,
    /// A subscription, sink table, or metrics client could not be opened.
    Resource,
    /// A row could not be appended to the pending batch.
    Append,
    /// A batch insert into the sink failed.
    Flush,
    /// The subscription transport reported an error.
    Stream,
    /// Metrics could not be published after the pump completed.
    Metrics,
    /// Unexpected internal failure.
    Internal,
}

/// Identifies the job and the resources an error occurred against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    /// Job identifier, may be empty.
    pub job_id: String,
    /// Subscription name the job reads from.
    pub subscription: String,
    /// Target table in `dataset.table` form.
    pub target: String,
}

impl fmt::Display for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job '{}', subscription '{}', target '{}'",
            self.job_id, self.subscription, self.target
        )
    }
}

/// A structured error type for pump operations.
#[derive(Debug, Error)]
#[error("{kind}: {message}{}", context.as_ref().map(|c| format!(" ({c})")).unwrap_or_default())]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    context: Option<JobContext>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
            source: None,
        }
    }

    /// Creates a new bad request error.
    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// Creates a new resource error.
    pub fn resource(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Resource, message)
    }

    /// Creates a new append error.
    pub fn append(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Append, message)
    }

    /// Creates a new flush error.
    pub fn flush(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Flush, message)
    }

    /// Creates a new stream error.
    pub fn stream(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Stream, message)
    }

    /// Creates a new metrics error.
    pub fn metrics(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Metrics, message)
    }

    /// Creates a new internal error.
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attaches a source error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches the job context, keeping an existing one.
    pub fn with_context(mut self, context: &JobContext) -> Self {
        if self.context.is_none() {
            self.context = Some(context.clone());
        }
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the job context, if attached.
    pub fn context(&self) -> Option<&JobContext> {
        self.context.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    fn context() -> JobContext {
        JobContext {
            job_id: "job-1".into(),
            subscription: "EVENTS/pump".into(),
            target: "public.events".into(),
        }
    }

    #[test]
    fn display_without_context() {
        let error = Error::flush("insert rejected");
        assert_eq!(error.to_string(), "flush: insert rejected");
        assert_eq!(error.kind_str(), "flush");
    }

    #[test]
    fn display_with_context() {
        let error = Error::stream("connection reset").with_context(&context());
        assert_eq!(
            error.to_string(),
            "stream: connection reset (job 'job-1', subscription 'EVENTS/pump', target 'public.events')"
        );
    }

    #[test]
    fn first_context_wins() {
        let other = JobContext {
            job_id: "job-2".into(),
            ..context()
        };
        let error = Error::append("bad row")
            .with_context(&context())
            .with_context(&other);
        assert_eq!(error.context().map(|c| c.job_id.as_str()), Some("job-1"));
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::other("boom");
        let error = Error::resource("cannot open").with_source(io);
        assert!(error.source().is_some());
        assert_eq!(error.kind(), ErrorKind::Resource);
    }
}
