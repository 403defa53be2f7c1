//! A Luau scripting assistant built on top of `luau-forge-core`.
//!
//! Besides the configured chat session, the crate contains what is needed
//! to move finished scripts into Roblox Studio: a relay client, the
//! per-installation user identifier that addresses the relay topic, and
//! the connector script that runs inside Studio.
//!
//! The crate includes a CLI for the terminal, and can also be used as a
//! library.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod attachment;
mod config;
pub mod plugin;
pub mod relay;
mod session;
mod user_id;

pub use config::{AppConfig, ConfigError, DEFAULT_RELAY_URL};
pub use session::{GREETING, SYSTEM_INSTRUCTION, Session, SessionBuilder};
pub use user_id::{UserId, UserIdStore};

/// Re-exports of [`luau_forge_core`] crate.
pub mod core {
    pub use luau_forge_core::*;
}
