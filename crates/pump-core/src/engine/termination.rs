use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tokio_util::sync::CancellationToken;

/// Why a subscription stream stopped delivering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    /// No message arrived within the quiescence window.
    Stalled,
    /// The job ran past its wall-clock ceiling.
    Deadline,
    /// The service is shutting down.
    Cancelled,
    /// The source ended delivery on its own.
    Drained,
    /// A message could not be processed or the transport failed.
    Failed,
}

/// First-wins cancellation of one job's subscription stream.
///
/// Several triggers may fire close together; only the first one is
/// recorded, and the stream token is cancelled once.
#[derive(Debug, Clone)]
pub(crate) struct Termination {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl Termination {
    /// Creates a termination linked to an outer shutdown token.
    pub fn new(shutdown: &CancellationToken) -> Self {
        Self {
            token: shutdown.child_token(),
            reason: Arc::new(OnceLock::new()),
        }
    }

    /// Requests cancellation. Returns `true` if this call recorded the reason.
    pub fn request(&self, reason: StopReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        self.token.cancel();
        first
    }

    /// Returns the token handed to the stream.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Returns the recorded reason, attributing an unexplained
    /// cancellation to the outer shutdown token.
    pub fn resolve(&self) -> StopReason {
        match self.reason.get() {
            Some(reason) => *reason,
            None if self.token.is_cancelled() => StopReason::Cancelled,
            None => StopReason::Drained,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_trigger_wins() {
        let termination = Termination::new(&CancellationToken::new());
        assert!(termination.request(StopReason::Deadline));
        assert!(!termination.request(StopReason::Stalled));
        assert!(termination.token().is_cancelled());
        assert_eq!(termination.resolve(), StopReason::Deadline);
    }

    #[test]
    fn outer_shutdown_resolves_to_cancelled() {
        let shutdown = CancellationToken::new();
        let termination = Termination::new(&shutdown);
        assert_eq!(termination.resolve(), StopReason::Drained);

        shutdown.cancel();
        assert!(termination.token().is_cancelled());
        assert_eq!(termination.resolve(), StopReason::Cancelled);
    }
}
