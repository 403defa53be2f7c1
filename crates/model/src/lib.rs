//! The protocol spoken between the chat core and a streaming model.
//!
//! A request carries the whole conversation so far; the response is an
//! ordered stream of [`StreamChunk`]s, each holding a text fragment and,
//! possibly, the reason the model stopped generating.
//!
//! Types in this crate don't define any behavior, they are the contract
//! that model implementations and the chat core agree on.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
