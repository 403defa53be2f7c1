//! Core logic of the chat: stream accumulation, marker parsing, the
//! continuation state machine and the session actor tying them together.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod accumulator;
pub mod controller;
pub mod conversation;
mod error;
pub mod markup;
mod model_client;
mod session;

pub use controller::Stage;
pub use conversation::{Role, TranscriptMessage};
pub use error::SessionError;
pub use session::{Session, SessionBuilder, SessionEvent, SessionSnapshot};
