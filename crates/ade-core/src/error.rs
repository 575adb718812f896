//! Error taxonomy for `ade-core`.
//!
//! Only [`ConfigurationError`] is fatal. Upstream and dispatch errors are
//! recoverable at the granularity of a single source or message; malformed
//! dates are not errors at all but
//! [`Unavailable::Malformed`](crate::date::Unavailable) values.

use std::fmt::Display;

use thiserror::Error;

/// Required configuration is missing or unusable. Aborts the run before any
/// fetch is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
  #[error("missing required setting: {0}")]
  Missing(&'static str),

  #[error("invalid setting {name}: {reason}")]
  Invalid { name: &'static str, reason: String },
}

/// A transport, auth or decoding failure talking to an upstream system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{origin}: {message}")]
pub struct UpstreamError {
  /// What was being fetched, e.g. `"projects/sandbox environments"`.
  pub origin:  String,
  pub message: String,
}

impl UpstreamError {
  pub fn new(origin: impl Into<String>, message: impl Display) -> Self {
    Self { origin: origin.into(), message: message.to_string() }
  }
}

/// Failure of [`EnvironmentSource::fetch_environments`](crate::source::EnvironmentSource).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
  #[error("configuration error: {0}")]
  Configuration(#[from] ConfigurationError),

  #[error("upstream error: {0}")]
  Upstream(#[from] UpstreamError),
}

/// A single message could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dispatch to {target} failed: {reason}")]
pub struct DispatchError {
  pub target: String,
  pub reason: String,
}

impl DispatchError {
  pub fn new(target: impl Into<String>, reason: impl Display) -> Self {
    Self { target: target.into(), reason: reason.to_string() }
  }
}
