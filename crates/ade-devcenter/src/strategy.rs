//! Ways to list a project's environments.
//!
//! Older dev centers reject the current API version and some identities may
//! only list their own environments, so strategies are tried in
//! [`CHAIN`] order until one answers.

/// A single way of listing environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStrategy {
  /// Every environment in the project, current API version.
  All,
  /// Every environment in the project, previous API version.
  AllLegacy,
  /// Only the environments of the calling identity.
  CurrentUser,
}

pub const CHAIN: [ListStrategy; 3] =
  [ListStrategy::All, ListStrategy::AllLegacy, ListStrategy::CurrentUser];

impl ListStrategy {
  pub fn name(self) -> &'static str {
    match self {
      Self::All => "all",
      Self::AllLegacy => "all-legacy",
      Self::CurrentUser => "current-user",
    }
  }

  fn api_version(self) -> &'static str {
    match self {
      Self::All | Self::CurrentUser => "2025-02-01",
      Self::AllLegacy => "2023-04-01",
    }
  }

  /// First-page URL for `project` under the dev center data-plane `endpoint`.
  pub fn url(self, endpoint: &str, project: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    let scope = match self {
      Self::All | Self::AllLegacy => "environments",
      Self::CurrentUser => "users/me/environments",
    };
    format!("{endpoint}/projects/{project}/{scope}?api-version={}", self.api_version())
  }
}
