use std::error::Error;
use std::fmt;

/// Returned when a message can no longer reach its actor, either because
/// the actor has been killed or because its task has exited.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ActorDeadError;

impl fmt::Debug for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ActorDeadError")
    }
}

impl fmt::Display for ActorDeadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the actor is no longer running")
    }
}

impl Error for ActorDeadError {}
