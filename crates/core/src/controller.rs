//! The send/continue state machine of a session.

use thiserror::Error;

/// Where a session is in its send cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Nothing is streaming and the last reply ended cleanly.
    #[default]
    Idle,
    /// A stream is active.
    Sending,
    /// Nothing is streaming and the last reply was cut off; it can be
    /// resumed with an explicit continuation.
    Continuable,
}

impl Stage {
    /// Whether a continuation may be requested right now.
    #[inline]
    pub fn is_continuable(self) -> bool {
        self == Stage::Continuable
    }
}

/// Input to [`transition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageEvent {
    /// A new user message or a suggestion click.
    Send,
    /// An explicit request to resume the cut-off reply.
    Continue,
    /// The active stream is over. `clean` is true only for a stream that
    /// ended with `STOP` and no transport error.
    StreamEnded {
        /// Whether the stream ended cleanly.
        clean: bool,
    },
}

/// A rejected [`StageEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// A stream is already active.
    #[error("a reply is still streaming")]
    Busy,
    /// There is no cut-off reply to resume.
    #[error("there is no interrupted reply to continue")]
    NotContinuable,
    /// A stream ended while none was active.
    #[error("no reply is streaming")]
    NotSending,
}

/// Computes the stage that follows `stage` on `event`.
///
/// A new send is accepted from both `Idle` and `Continuable`: typing a new
/// message simply abandons the cut-off reply. Nothing is ever started
/// while `Sending`.
pub fn transition(
    stage: Stage,
    event: StageEvent,
) -> Result<Stage, TransitionError> {
    use Stage::*;
    use StageEvent::*;

    match (stage, event) {
        (Sending, Send | Continue) => Err(TransitionError::Busy),
        (Idle | Continuable, Send) => Ok(Sending),
        (Continuable, Continue) => Ok(Sending),
        (Idle, Continue) => Err(TransitionError::NotContinuable),
        (Sending, StreamEnded { clean: true }) => Ok(Idle),
        (Sending, StreamEnded { clean: false }) => Ok(Continuable),
        (Idle | Continuable, StreamEnded { .. }) => {
            Err(TransitionError::NotSending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_cycle() {
        let stage = transition(Stage::Idle, StageEvent::Send).unwrap();
        assert_eq!(stage, Stage::Sending);
        let stage =
            transition(stage, StageEvent::StreamEnded { clean: true }).unwrap();
        assert_eq!(stage, Stage::Idle);
    }

    #[test]
    fn test_continue_cycle() {
        let stage = transition(
            Stage::Sending,
            StageEvent::StreamEnded { clean: false },
        )
        .unwrap();
        assert!(stage.is_continuable());

        let stage = transition(stage, StageEvent::Continue).unwrap();
        assert_eq!(stage, Stage::Sending);
        assert_eq!(
            transition(stage, StageEvent::StreamEnded { clean: false }),
            Ok(Stage::Continuable)
        );
        assert_eq!(
            transition(Stage::Continuable, StageEvent::Send),
            Ok(Stage::Sending)
        );
    }

    #[test]
    fn test_rejected_events() {
        assert_eq!(
            transition(Stage::Sending, StageEvent::Send),
            Err(TransitionError::Busy)
        );
        assert_eq!(
            transition(Stage::Sending, StageEvent::Continue),
            Err(TransitionError::Busy)
        );
        assert_eq!(
            transition(Stage::Idle, StageEvent::Continue),
            Err(TransitionError::NotContinuable)
        );
        assert_eq!(
            transition(Stage::Idle, StageEvent::StreamEnded { clean: true }),
            Err(TransitionError::NotSending)
        );
    }
}
