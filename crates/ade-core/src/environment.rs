//! Environment records — the shape every downstream step consumes.
//!
//! A [`RawEnvironment`] is what a source hands back. Enrichment with the
//! backing resource group and its tags turns it into an [`EnvironmentRecord`].

use std::collections::HashMap;

use crate::date::RawExpiration;

/// Resource-group tags. Keys keep their original case; lookups that need
/// case-insensitivity do it themselves.
pub type Tags = HashMap<String, String>;

// ─── Raw ─────────────────────────────────────────────────────────────────────

/// An environment as listed by a source, before enrichment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEnvironment {
  pub name:                        String,
  pub project_name:                String,
  pub environment_type:            Option<String>,
  pub catalog_name:                Option<String>,
  pub environment_definition_name: Option<String>,
  pub provisioning_state:          Option<String>,
  pub resource_group_id:           Option<String>,
  pub expiration:                  Option<RawExpiration>,
  /// Account identifier of the creating user (an AAD object id for DevCenter).
  pub user:                        Option<String>,
}

impl RawEnvironment {
  /// Name of the backing resource group.
  ///
  /// Taken from the last segment of `resource_group_id`. Without an id the
  /// DevCenter naming convention `{project}-{environment}` is assumed. An id
  /// that is not a path, or ends in `/`, yields `None`.
  pub fn resource_group_name(&self) -> Option<String> {
    match &self.resource_group_id {
      Some(id) => {
        if !id.contains('/') {
          return None;
        }
        id.rsplit('/')
          .next()
          .filter(|segment| !segment.is_empty())
          .map(str::to_string)
      }
      None => Some(format!("{}-{}", self.project_name, self.name)),
    }
  }
}

// ─── Enriched ────────────────────────────────────────────────────────────────

/// The best available signal about who owns an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerHint {
  pub tags:        Tags,
  pub fallback_id: Option<String>,
}

/// One deployment environment, enriched and ready for classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentRecord {
  pub name:                        String,
  pub project_name:                String,
  pub environment_type:            Option<String>,
  pub catalog_name:                Option<String>,
  pub environment_definition_name: Option<String>,
  pub provisioning_state:          Option<String>,
  pub resource_group_id:           Option<String>,
  pub resource_group:              Option<String>,
  pub expiration_raw:              Option<RawExpiration>,
  pub owner_hint:                  OwnerHint,
}

impl EnvironmentRecord {
  /// Combine a raw listing with its resource group name and tags.
  pub fn enrich(raw: RawEnvironment, resource_group: Option<String>, tags: Tags) -> Self {
    Self {
      name: raw.name,
      project_name: raw.project_name,
      environment_type: raw.environment_type,
      catalog_name: raw.catalog_name,
      environment_definition_name: raw.environment_definition_name,
      provisioning_state: raw.provisioning_state,
      resource_group_id: raw.resource_group_id,
      resource_group,
      expiration_raw: raw.expiration,
      owner_hint: OwnerHint { tags, fallback_id: raw.user },
    }
  }
}
