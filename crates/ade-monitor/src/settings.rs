//! Layered configuration: optional TOML file, then `ADE_*` environment
//! variables, then command-line overrides applied by `main`.

use std::path::Path;

use ade_core::{
  ConfigurationError,
  classify::Policy,
  run::MonitorConfig,
  source::Recipient,
};
use ade_devcenter::{
  Credentials, DevCenterConfig, ManagedIdentity, StaticToken, source::DEFAULT_MANAGEMENT_ENDPOINT,
};
use ade_slack::{SlackConfig, messenger::DEFAULT_API_BASE};
use serde::Deserialize;

/// Longest warning window accepted for the `window` policy.
pub const MAX_WARN_DAYS: u32 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
  /// expired / tomorrow / 3 days / 7 days
  #[default]
  Tiered,
  /// expired / expiring within `warn_days`
  Window,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub subscription_id:            Option<String>,
  pub slack_channel_id:           Option<String>,
  pub slack_token:                Option<String>,
  pub simulate_send:              bool,
  pub policy:                     PolicyKind,
  pub warn_days:                  u32,
  /// Pre-issued bearer token; managed identity is used when unset.
  pub access_token:               Option<String>,
  /// User-assigned managed identity.
  pub managed_identity_client_id: Option<String>,
  pub management_endpoint:        String,
  pub slack_api_base:             String,
  pub request_timeout_secs:       u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      subscription_id:            None,
      slack_channel_id:           None,
      slack_token:                None,
      simulate_send:              false,
      policy:                     PolicyKind::Tiered,
      warn_days:                  3,
      access_token:               None,
      managed_identity_client_id: None,
      management_endpoint:        DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
      slack_api_base:             DEFAULT_API_BASE.to_string(),
      request_timeout_secs:       30,
    }
  }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Settings {
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    Self::from_sources(
      config::File::from(path).required(false),
      config::Environment::with_prefix("ADE"),
    )
  }

  fn from_sources<F>(file: F, env: config::Environment) -> Result<Self, config::ConfigError>
  where
    F: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  pub fn policy(&self) -> Policy {
    match self.policy {
      PolicyKind::Tiered => Policy::Tiered,
      PolicyKind::Window => Policy::Window { days: self.warn_days },
    }
  }

  pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigurationError> {
    let channel = non_blank(&self.slack_channel_id)
      .ok_or(ConfigurationError::Missing("slack_channel_id"))?;
    if self.policy == PolicyKind::Window && !(1..=MAX_WARN_DAYS).contains(&self.warn_days) {
      return Err(ConfigurationError::Invalid {
        name:   "warn_days",
        reason: format!("must be between 1 and {MAX_WARN_DAYS}"),
      });
    }
    Ok(MonitorConfig { channel: Recipient::new(channel), policy: self.policy() })
  }

  pub fn slack_config(&self) -> Result<SlackConfig, ConfigurationError> {
    let token = match non_blank(&self.slack_token) {
      Some(token) => token.to_string(),
      None if self.simulate_send => String::new(),
      None => return Err(ConfigurationError::Missing("slack_token")),
    };
    Ok(SlackConfig { token, api_base: self.slack_api_base.clone(), simulate: self.simulate_send })
  }

  /// The subscription is passed through unchecked; the source reports it
  /// missing at fetch time so the failure reaches the monitoring channel.
  pub fn devcenter_config(&self) -> DevCenterConfig {
    DevCenterConfig {
      subscription_id:     self.subscription_id.clone(),
      management_endpoint: self.management_endpoint.clone(),
    }
  }

  pub fn credentials(&self, client: reqwest::Client) -> Credentials {
    match non_blank(&self.access_token) {
      Some(token) => Credentials::Static(StaticToken::new(token)),
      None => Credentials::ManagedIdentity(ManagedIdentity::from_env(
        client,
        self.managed_identity_client_id.clone(),
      )),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn load(toml: &str, env: &[(&str, &str)]) -> Settings {
    let vars = env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();
    Settings::from_sources(
      config::File::from_str(toml, config::FileFormat::Toml),
      config::Environment::with_prefix("ADE").source(Some(vars)),
    )
    .unwrap()
  }

  #[test]
  fn defaults_apply_to_empty_sources() {
    let s = load("", &[]);
    assert_eq!(s.policy, PolicyKind::Tiered);
    assert_eq!(s.warn_days, 3);
    assert_eq!(s.request_timeout_secs, 30);
    assert_eq!(s.management_endpoint, "https://management.azure.com");
    assert!(!s.simulate_send);
  }

  #[test]
  fn environment_overrides_file() {
    let s = load(
      r#"
        subscription_id  = "from-file"
        slack_channel_id = "C-file"
        policy           = "window"
        warn_days        = 5
      "#,
      &[("ADE_SUBSCRIPTION_ID", "from-env"), ("ADE_SIMULATE_SEND", "true")],
    );
    assert_eq!(s.subscription_id.as_deref(), Some("from-env"));
    assert_eq!(s.slack_channel_id.as_deref(), Some("C-file"));
    assert!(s.simulate_send);
    assert_eq!(s.policy(), Policy::Window { days: 5 });
  }

  #[test]
  fn channel_is_required() {
    let s = load("slack_channel_id = \"  \"", &[]);
    assert_eq!(s.monitor_config().unwrap_err(), ConfigurationError::Missing("slack_channel_id"));
  }

  #[test]
  fn zero_day_window_is_rejected() {
    let s = load("slack_channel_id = \"C1\"\npolicy = \"window\"\nwarn_days = 0", &[]);
    assert!(matches!(
      s.monitor_config(),
      Err(ConfigurationError::Invalid { name: "warn_days", .. })
    ));
  }

  #[test]
  fn oversized_window_is_rejected() {
    let s = load(
      "slack_channel_id = \"C1\"",
      &[("ADE_POLICY", "window"), ("ADE_WARN_DAYS", "200000000")],
    );
    assert!(matches!(
      s.monitor_config(),
      Err(ConfigurationError::Invalid { name: "warn_days", .. })
    ));

    let s = load("slack_channel_id = \"C1\"\npolicy = \"window\"\nwarn_days = 3650", &[]);
    assert_eq!(s.monitor_config().unwrap().policy, Policy::Window { days: MAX_WARN_DAYS });
  }

  #[test]
  fn slack_token_is_optional_only_when_simulating() {
    let mut s = load("", &[]);
    assert_eq!(s.slack_config().unwrap_err(), ConfigurationError::Missing("slack_token"));
    s.simulate_send = true;
    assert!(s.slack_config().unwrap().simulate);
  }

  #[test]
  fn static_token_wins_over_managed_identity() {
    let s = load("access_token = \"abc\"", &[]);
    assert!(matches!(s.credentials(reqwest::Client::new()), Credentials::Static(_)));
    let s = load("", &[]);
    assert!(matches!(
      s.credentials(reqwest::Client::new()),
      Credentials::ManagedIdentity(_)
    ));
  }
}
