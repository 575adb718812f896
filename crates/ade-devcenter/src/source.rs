//! [`EnvironmentSource`] and [`TagLookup`] over the DevCenter APIs.

use std::sync::Arc;

use ade_core::{
  ConfigurationError, SourceError, UpstreamError,
  environment::{RawEnvironment, Tags},
  source::{EnvironmentSource, Inventory, TagLookup},
};

use crate::{
  client::{Http, Paged},
  credential::{CredentialProvider, DEVCENTER_RESOURCE, MANAGEMENT_RESOURCE},
  error::Result,
  strategy::{CHAIN, ListStrategy},
  wire,
};

pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

const DEVCENTER_API_VERSION: &str = "2024-02-01";
const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";

#[derive(Debug, Clone)]
pub struct DevCenterConfig {
  /// Checked at fetch time; `None` or blank fails the run.
  pub subscription_id:     Option<String>,
  pub management_endpoint: String,
}

impl Default for DevCenterConfig {
  fn default() -> Self {
    Self { subscription_id: None, management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string() }
  }
}

/// A project reachable through a dev center data-plane endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProjectRef {
  name:     String,
  endpoint: String,
}

pub struct DevCenterSource<C> {
  http:   Http<C>,
  config: DevCenterConfig,
}

impl<C> Clone for DevCenterSource<C> {
  fn clone(&self) -> Self { Self { http: self.http.clone(), config: self.config.clone() } }
}

/// Resource-group segment of an ARM resource id.
pub fn resource_group_of(id: &str) -> Option<&str> {
  let mut segments = id.split('/');
  segments.by_ref().find(|s| s.eq_ignore_ascii_case("resourceGroups"))?;
  segments.next().filter(|s| !s.is_empty())
}

impl<C: CredentialProvider> DevCenterSource<C> {
  pub fn new(client: reqwest::Client, credentials: Arc<C>, config: DevCenterConfig) -> Self {
    Self { http: Http::new(client, credentials), config }
  }

  fn subscription_id(&self) -> Result<&str, ConfigurationError> {
    self
      .config
      .subscription_id
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .ok_or(ConfigurationError::Missing("subscription_id"))
  }

  fn management_url(&self, path: &str, api_version: &str) -> String {
    format!(
      "{}{path}?api-version={api_version}",
      self.config.management_endpoint.trim_end_matches('/')
    )
  }

  /// Dev centers, then each one's projects. Only the dev center listing
  /// itself is fatal.
  async fn discover_projects(
    &self,
    subscription: &str,
    failures: &mut Vec<UpstreamError>,
  ) -> Result<Vec<ProjectRef>, UpstreamError> {
    let url = self.management_url(
      &format!("/subscriptions/{subscription}/providers/Microsoft.DevCenter/devcenters"),
      DEVCENTER_API_VERSION,
    );
    let Paged { items: devcenters, interrupted } = self
      .http
      .get_paged::<wire::DevCenter>(&url, MANAGEMENT_RESOURCE)
      .await
      .map_err(|e| UpstreamError::new("devcenters", e))?;
    if let Some(error) = interrupted {
      failures.push(UpstreamError::new("devcenters", error));
    }
    tracing::info!(count = devcenters.len(), "found dev centers");

    let mut projects = Vec::new();
    for devcenter in devcenters {
      let Some(resource_group) = resource_group_of(&devcenter.id) else {
        tracing::warn!(devcenter = %devcenter.name, id = %devcenter.id, "dev center id has no resource group");
        continue;
      };
      let origin = format!("devcenters/{} projects", devcenter.name);
      let url = self.management_url(
        &format!(
          "/subscriptions/{subscription}/resourceGroups/{resource_group}/providers/Microsoft.DevCenter/projects"
        ),
        DEVCENTER_API_VERSION,
      );

      let listed = match self.http.get_paged::<wire::Project>(&url, MANAGEMENT_RESOURCE).await {
        Ok(Paged { items, interrupted }) => {
          if let Some(error) = interrupted {
            failures.push(UpstreamError::new(origin.as_str(), error));
          }
          items
        }
        Err(error) => {
          tracing::error!(devcenter = %devcenter.name, %error, "listing projects failed");
          failures.push(UpstreamError::new(origin, error));
          continue;
        }
      };

      let owner_id = devcenter.id.to_lowercase();
      for project in listed {
        let belongs = project
          .properties
          .dev_center_id
          .as_deref()
          .is_some_and(|id| id.to_lowercase().contains(&owner_id));
        if !belongs {
          continue;
        }
        match (project.name, devcenter.properties.dev_center_uri.as_deref()) {
          (Some(name), Some(endpoint)) if !name.is_empty() && !endpoint.is_empty() => {
            projects.push(ProjectRef { name, endpoint: endpoint.to_string() });
          }
          (name, _) => {
            tracing::warn!(devcenter = %devcenter.name, project = ?name, "skipping project without name or endpoint");
          }
        }
      }
    }
    Ok(projects)
  }

  /// Try each strategy in turn. `Err` only when all of them fail on their
  /// first page.
  async fn list_project(&self, project: &ProjectRef) -> Result<Paged<wire::Environment>> {
    let mut last_error = None;
    for strategy in CHAIN {
      let url = strategy.url(&project.endpoint, &project.name);
      match self.http.get_paged(&url, DEVCENTER_RESOURCE).await {
        Ok(paged) => {
          tracing::info!(
            project = %project.name,
            strategy = strategy.name(),
            count = paged.items.len(),
            "listed environments"
          );
          return Ok(paged);
        }
        Err(error) => {
          tracing::warn!(project = %project.name, strategy = strategy.name(), %error, "listing strategy failed");
          last_error = Some(error);
        }
      }
    }
    match last_error {
      Some(error) => Err(error),
      None => Ok(Paged { items: Vec::new(), interrupted: None }),
    }
  }
}

impl<C: CredentialProvider> EnvironmentSource for DevCenterSource<C> {
  async fn fetch_environments(&self) -> Result<Inventory, SourceError> {
    let subscription = self.subscription_id()?;
    let mut failures = Vec::new();

    let projects = self.discover_projects(subscription, &mut failures).await?;
    if projects.is_empty() {
      tracing::warn!("no dev center projects found in subscription");
      return Ok(Inventory { environments: Vec::new(), failures });
    }

    let mut environments: Vec<RawEnvironment> = Vec::new();
    let mut failed_projects = 0;
    for project in &projects {
      let origin = format!("projects/{} environments", project.name);
      match self.list_project(project).await {
        Ok(Paged { items, interrupted }) => {
          environments.extend(items.into_iter().map(|e| e.into_raw(&project.name)));
          if let Some(error) = interrupted {
            failures.push(UpstreamError::new(origin, error));
          }
        }
        Err(error) => {
          tracing::error!(project = %project.name, %error, "every listing strategy failed");
          failed_projects += 1;
          failures.push(UpstreamError::new(origin, error));
        }
      }
    }

    if failed_projects == projects.len() {
      for failure in &failures {
        tracing::error!(%failure, "upstream failure");
      }
      return Err(
        UpstreamError::new(
          "environments",
          format!("listing failed for all {failed_projects} project(s)"),
        )
        .into(),
      );
    }

    tracing::info!(count = environments.len(), projects = projects.len(), "fetched environments");
    Ok(Inventory { environments, failures })
  }
}

impl<C: CredentialProvider> TagLookup for DevCenterSource<C> {
  async fn fetch_tags(&self, resource_group: &str) -> Tags {
    let Ok(subscription) = self.subscription_id() else {
      return Tags::new();
    };
    let url = self.management_url(
      &format!("/subscriptions/{subscription}/resourcegroups/{resource_group}"),
      RESOURCE_GROUP_API_VERSION,
    );
    match self.http.get_json::<wire::ResourceGroup>(&url, MANAGEMENT_RESOURCE).await {
      Ok(group) => group.tags.unwrap_or_default(),
      Err(error) => {
        tracing::warn!(resource_group, %error, "could not fetch resource group tags");
        Tags::new()
      }
    }
  }
}
