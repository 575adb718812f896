//! Core types and logic for the ADE expiration monitor.
//!
//! This crate is deliberately free of HTTP and cloud SDK dependencies.
//! Environment sources, tag lookups and messengers are reached through the
//! traits in [`source`]; concrete implementations live in `ade-devcenter` and
//! `ade-slack`.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod classify;
pub mod compose;
pub mod date;
pub mod environment;
pub mod error;
pub mod event;
pub mod owner;
pub mod run;
pub mod source;

pub use error::{ConfigurationError, DispatchError, SourceError, UpstreamError};

#[cfg(test)]
mod tests;
