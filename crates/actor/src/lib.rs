//! A single-mailbox actor runtime.
//!
//! Each actor owns its state exclusively and processes messages one at a
//! time, in the order they were sent. Tasks spawned on behalf of an actor
//! never touch the state directly; they report back by sending messages,
//! which keeps every mutation on the actor's own task.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod error;
mod handle;
mod mailbox;
mod scheduler;

pub use error::ActorDeadError;
pub use handle::Actor;
pub use mailbox::Message;
