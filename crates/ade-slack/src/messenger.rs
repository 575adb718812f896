//! [`Messenger`] over the Slack Web API.

use ade_core::{
  compose::Content,
  source::{Messenger, Recipient},
};
use serde::Deserialize;

use crate::{
  blocks,
  error::{Error, Result},
};

pub const DEFAULT_API_BASE: &str = "https://slack.com/api";

#[derive(Debug, Clone)]
pub struct SlackConfig {
  /// Bot token (`xoxb-…`).
  pub token:    String,
  pub api_base: String,
  /// Log payloads instead of calling Slack.
  pub simulate: bool,
}

impl Default for SlackConfig {
  fn default() -> Self {
    Self { token: String::new(), api_base: DEFAULT_API_BASE.to_string(), simulate: false }
  }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
  ok:    bool,
  error: Option<String>,
  user:  Option<User>,
}

#[derive(Debug, Deserialize)]
struct User {
  id: String,
}

/// Drop a `+alias` from the local part: `jo+ade@x.com` → `jo@x.com`.
pub fn strip_alias(email: &str) -> String {
  match email.split_once('@') {
    Some((local, domain)) => {
      let local = local.split('+').next().unwrap_or(local);
      format!("{local}@{domain}")
    }
    None => email.to_string(),
  }
}

#[derive(Debug, Clone)]
pub struct SlackMessenger {
  client: reqwest::Client,
  config: SlackConfig,
}

impl SlackMessenger {
  pub fn new(client: reqwest::Client, config: SlackConfig) -> Self { Self { client, config } }

  fn url(&self, method: &str) -> String {
    format!("{}/{method}", self.config.api_base.trim_end_matches('/'))
  }

  async fn call(&self, method: &'static str, request: reqwest::RequestBuilder) -> Result<ApiResponse> {
    let resp = request.bearer_auth(&self.config.token).send().await?;
    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status { method, status: status.as_u16() });
    }
    Ok(resp.json().await?)
  }
}

impl Messenger for SlackMessenger {
  type Error = Error;

  async fn find_recipient(&self, email: &str) -> Result<Option<Recipient>> {
    let email = strip_alias(email);
    if self.config.simulate {
      return Ok(Some(Recipient::new(email)));
    }

    let request = self
      .client
      .get(self.url("users.lookupByEmail"))
      .query(&[("email", email.as_str())]);
    let resp = self.call("users.lookupByEmail", request).await?;

    match (resp.ok, resp.user) {
      (true, Some(user)) => Ok(Some(Recipient::new(user.id))),
      _ => {
        tracing::debug!(%email, error = ?resp.error, "no slack user for email");
        Ok(None)
      }
    }
  }

  async fn send(&self, recipient: &Recipient, content: &Content) -> Result<()> {
    let payload = blocks::payload(recipient.as_str(), content);
    if self.config.simulate {
      tracing::info!(recipient = %recipient, payload = %payload, "simulated slack message");
      return Ok(());
    }

    let request = self.client.post(self.url("chat.postMessage")).json(&payload);
    let resp = self.call("chat.postMessage", request).await?;
    if !resp.ok {
      return Err(Error::Api {
        method: "chat.postMessage",
        code:   resp.error.unwrap_or_else(|| "unknown_error".to_string()),
      });
    }
    tracing::debug!(recipient = %recipient, "slack message sent");
    Ok(())
  }
}
