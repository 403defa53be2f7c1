use luau_forge_actor::ActorDeadError;
use thiserror::Error;

use crate::controller::TransitionError;

/// Error returned by [`Session`](crate::Session) operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A reply is still streaming.
    #[error("a reply is still streaming")]
    Busy,
    /// The last reply ended cleanly, there is nothing to continue.
    #[error("there is no interrupted reply to continue")]
    NotContinuable,
    /// The message was empty after trimming.
    #[error("cannot send an empty message")]
    EmptyInput,
    /// The session task has stopped.
    #[error("the session has been closed")]
    Closed,
}

impl From<ActorDeadError> for SessionError {
    #[inline]
    fn from(_: ActorDeadError) -> Self {
        SessionError::Closed
    }
}

impl From<TransitionError> for SessionError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::Busy => SessionError::Busy,
            TransitionError::NotContinuable => SessionError::NotContinuable,
            // Stream ends never come from the public API.
            TransitionError::NotSending => SessionError::Busy,
        }
    }
}
