//! Error type for `ade-devcenter`.

use thiserror::Error;

/// Longest response body kept in an error message.
const MAX_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("{url} returned {status}: {body}")]
  Status { url: String, status: u16, body: String },

  #[error("credential error: {0}")]
  Credential(String),

  #[error("pagination revisited {url}")]
  PageCycle { url: String },
}

impl Error {
  pub(crate) fn status(url: &str, status: reqwest::StatusCode, body: String) -> Self {
    let body = if body.len() > MAX_BODY {
      let mut end = MAX_BODY;
      while !body.is_char_boundary(end) {
        end -= 1;
      }
      format!("{}…", &body[..end])
    } else {
      body
    };
    Self::Status { url: url.to_string(), status: status.as_u16(), body }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
