//! Error type for `ade-slack`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{method} returned HTTP {status}")]
  Status { method: &'static str, status: u16 },

  /// Slack answered with `"ok": false`.
  #[error("{method} failed: {code}")]
  Api { method: &'static str, code: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
