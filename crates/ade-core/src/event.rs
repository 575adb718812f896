//! Structured run events.
//!
//! Components report noteworthy outcomes (a dropped record, an owner that
//! could not be resolved, a failed send) as [`RunEvent`]s instead of ad hoc
//! log lines. Every event is also forwarded to `tracing` when emitted, and
//! the full stream is returned in the run report.

use crate::{
  date::Unavailable,
  error::{DispatchError, UpstreamError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
  /// A source, page or listing strategy failed; whatever it produced before
  /// failing is still used.
  UpstreamFailed(UpstreamError),
  /// The record had no usable expiration and was left out of every category.
  RecordDropped {
    project:     String,
    environment: String,
    reason:      Unavailable,
  },
  /// No owner could be derived; no personal notice is sent.
  OwnerUnresolved { project: String, environment: String },
  /// The same owner/environment pair was listed twice; only one notice goes out.
  DuplicateSuppressed {
    owner:       String,
    project:     String,
    environment: String,
  },
  /// The messenger has no recipient for this owner.
  RecipientNotFound { owner: String, environment: String },
  OwnerNotified { owner: String, environment: String },
  DigestSent,
  DispatchFailed(DispatchError),
}

impl RunEvent {
  /// Whether the event downgrades the run to "succeeded with warnings".
  /// A missing expiration is routine; an unparseable one is not.
  pub fn is_warning(&self) -> bool {
    matches!(
      self,
      Self::UpstreamFailed(_)
        | Self::DispatchFailed(_)
        | Self::RecordDropped { reason: Unavailable::Malformed { .. }, .. }
    )
  }

  fn trace(&self) {
    match self {
      Self::UpstreamFailed(error) => {
        tracing::warn!(origin = %error.origin, message = %error.message, "upstream failure")
      }
      Self::RecordDropped { project, environment, reason: reason @ Unavailable::Malformed { .. } } => {
        tracing::warn!(%project, %environment, ?reason, "dropping environment with malformed expiration")
      }
      Self::RecordDropped { project, environment, reason } => {
        tracing::info!(%project, %environment, ?reason, "dropping environment without expiration")
      }
      Self::OwnerUnresolved { project, environment } => {
        tracing::warn!(%project, %environment, "skipping personal notice: owner unknown")
      }
      Self::DuplicateSuppressed { owner, project, environment } => {
        tracing::debug!(%owner, %project, %environment, "suppressing duplicate personal notice")
      }
      Self::RecipientNotFound { owner, environment } => {
        tracing::warn!(%owner, %environment, "no messenger recipient for owner")
      }
      Self::OwnerNotified { owner, environment } => {
        tracing::info!(%owner, %environment, "sent personal notice")
      }
      Self::DigestSent => tracing::info!("sent digest to monitoring channel"),
      Self::DispatchFailed(error) => {
        tracing::error!(target_recipient = %error.target, reason = %error.reason, "dispatch failed")
      }
    }
  }
}

/// Append-only collector for [`RunEvent`]s.
#[derive(Debug, Default)]
pub struct Events {
  events: Vec<RunEvent>,
}

impl Events {
  pub fn emit(&mut self, event: RunEvent) {
    event.trace();
    self.events.push(event);
  }

  pub fn iter(&self) -> impl Iterator<Item = &RunEvent> { self.events.iter() }

  pub fn len(&self) -> usize { self.events.len() }

  pub fn is_empty(&self) -> bool { self.events.is_empty() }

  pub fn has_warnings(&self) -> bool { self.events.iter().any(RunEvent::is_warning) }

  pub fn into_vec(self) -> Vec<RunEvent> { self.events }
}
