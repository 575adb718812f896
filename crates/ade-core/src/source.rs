//! Collaborator traits.
//!
//! The orchestrator depends on these abstractions only. `ade-devcenter`
//! implements [`EnvironmentSource`] and [`TagLookup`]; `ade-slack` implements
//! [`Messenger`]. All methods return `Send` futures so implementations can be
//! driven from a multi-threaded runtime.

use std::{fmt, future::Future};

use crate::{
  compose::Content,
  environment::{RawEnvironment, Tags},
  error::{SourceError, UpstreamError},
};

// ─── Environments ────────────────────────────────────────────────────────────

/// Everything a source managed to list, plus what went wrong along the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
  pub environments: Vec<RawEnvironment>,
  /// Recoverable failures (a project, page or strategy that failed). Their
  /// presence makes the run finish with warnings.
  pub failures:     Vec<UpstreamError>,
}

pub trait EnvironmentSource: Send + Sync {
  /// List every environment visible to the source.
  ///
  /// Fails with [`SourceError::Configuration`] before doing any I/O when
  /// required settings are missing, and with [`SourceError::Upstream`] only
  /// when nothing at all could be listed.
  fn fetch_environments(
    &self,
  ) -> impl Future<Output = Result<Inventory, SourceError>> + Send + '_;
}

/// Best-effort resource-group tag enrichment.
pub trait TagLookup: Send + Sync {
  /// Tags of `resource_group`; an empty map on any failure.
  fn fetch_tags<'a>(
    &'a self,
    resource_group: &'a str,
  ) -> impl Future<Output = Tags> + Send + 'a;
}

// ─── Messaging ───────────────────────────────────────────────────────────────

/// A messenger-specific address: a channel id or a user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recipient(pub String);

impl Recipient {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Recipient {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

pub trait Messenger: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look up the recipient for an owner's email address. `Ok(None)` means
  /// the messenger has no such user.
  fn find_recipient<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<Recipient>, Self::Error>> + Send + 'a;

  fn send<'a>(
    &'a self,
    recipient: &'a Recipient,
    content: &'a Content,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
