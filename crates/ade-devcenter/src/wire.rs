//! Response shapes of the ARM and DevCenter data-plane APIs.
//!
//! Only the fields the monitor reads are modelled; everything is optional
//! because the APIs omit fields freely.

use std::collections::HashMap;

use ade_core::{date::RawExpiration, environment::RawEnvironment};
use serde::Deserialize;

/// One page of a paged list response.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct Page<T> {
  #[serde(default)]
  pub value:     Vec<T>,
  #[serde(rename = "nextLink")]
  pub next_link: Option<String>,
}

// ─── Management plane ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DevCenter {
  #[serde(default)]
  pub id:         String,
  #[serde(default)]
  pub name:       String,
  #[serde(default)]
  pub properties: DevCenterProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevCenterProperties {
  pub dev_center_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Project {
  pub name:       Option<String>,
  #[serde(default)]
  pub properties: ProjectProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProperties {
  pub dev_center_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResourceGroup {
  #[serde(default)]
  pub tags: Option<HashMap<String, String>>,
}

// ─── Data plane ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
  #[serde(default)]
  pub name:                        String,
  pub environment_type:            Option<String>,
  pub catalog_name:                Option<String>,
  pub environment_definition_name: Option<String>,
  pub provisioning_state:          Option<String>,
  pub resource_group_id:           Option<String>,
  #[serde(default)]
  pub expiration_date:             serde_json::Value,
  pub user:                        Option<String>,
}

impl Environment {
  pub fn into_raw(self, project_name: &str) -> RawEnvironment {
    RawEnvironment {
      name: self.name,
      project_name: project_name.to_string(),
      environment_type: self.environment_type,
      catalog_name: self.catalog_name,
      environment_definition_name: self.environment_definition_name,
      provisioning_state: self.provisioning_state,
      resource_group_id: self.resource_group_id,
      expiration: RawExpiration::from_json(self.expiration_date),
      user: self.user,
    }
  }
}
