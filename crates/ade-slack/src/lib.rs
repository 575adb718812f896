//! Slack Web API messenger for the ADE expiration monitor.
//!
//! Owners are resolved with `users.lookupByEmail` and messages go out through
//! `chat.postMessage`. Digests are rendered as Block Kit (see [`blocks`]).

pub mod blocks;
pub mod error;
pub mod messenger;

pub use error::{Error, Result};
pub use messenger::{SlackConfig, SlackMessenger};
