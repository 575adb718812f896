//! Credential providers.
//!
//! A provider yields an opaque bearer token for an Azure resource audience.
//! Tokens are fetched at most once per audience per process; a run is short
//! enough that expiry is not a concern.

use std::{collections::HashMap, fmt, future::Future, sync::Mutex};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Audience of the Azure Resource Manager API.
pub const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";
/// Audience of the DevCenter data-plane API.
pub const DEVCENTER_RESOURCE: &str = "https://devcenter.azure.com";

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// A bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
  pub fn new(secret: impl Into<String>) -> Self { Self(secret.into()) }

  pub fn secret(&self) -> &str { &self.0 }
}

impl fmt::Debug for AccessToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str("AccessToken(***)") }
}

pub trait CredentialProvider: Send + Sync {
  fn token<'a>(
    &'a self,
    resource: &'a str,
  ) -> impl Future<Output = Result<AccessToken>> + Send + 'a;
}

// ─── Static ──────────────────────────────────────────────────────────────────

/// A pre-issued token, used for every audience.
#[derive(Debug, Clone)]
pub struct StaticToken(AccessToken);

impl StaticToken {
  pub fn new(secret: impl Into<String>) -> Self { Self(AccessToken::new(secret)) }
}

impl CredentialProvider for StaticToken {
  async fn token(&self, _resource: &str) -> Result<AccessToken> { Ok(self.0.clone()) }
}

// ─── Managed identity ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum MsiEndpoint {
  /// App Service / Functions: `IDENTITY_ENDPOINT` + `IDENTITY_HEADER`.
  AppService { url: String, header: String },
  /// Virtual machines and containers: the instance metadata service.
  Imds { url: String },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

/// Token acquisition through the host's managed identity.
#[derive(Debug)]
pub struct ManagedIdentity {
  client:    reqwest::Client,
  endpoint:  MsiEndpoint,
  /// User-assigned identity to use; the system identity when `None`.
  client_id: Option<String>,
  cache:     Mutex<HashMap<String, AccessToken>>,
}

impl ManagedIdentity {
  fn with_endpoint(client: reqwest::Client, endpoint: MsiEndpoint, client_id: Option<String>) -> Self {
    Self { client, endpoint, client_id, cache: Mutex::new(HashMap::new()) }
  }

  /// Use the App Service identity endpoint when the host advertises one,
  /// otherwise IMDS.
  pub fn from_env(client: reqwest::Client, client_id: Option<String>) -> Self {
    match (std::env::var("IDENTITY_ENDPOINT"), std::env::var("IDENTITY_HEADER")) {
      (Ok(url), Ok(header)) => Self::app_service(client, url, header, client_id),
      _ => Self::imds(client, client_id),
    }
  }

  pub fn app_service(
    client: reqwest::Client,
    url: impl Into<String>,
    header: impl Into<String>,
    client_id: Option<String>,
  ) -> Self {
    let endpoint = MsiEndpoint::AppService { url: url.into(), header: header.into() };
    Self::with_endpoint(client, endpoint, client_id)
  }

  pub fn imds(client: reqwest::Client, client_id: Option<String>) -> Self {
    let endpoint = MsiEndpoint::Imds { url: IMDS_ENDPOINT.to_string() };
    Self::with_endpoint(client, endpoint, client_id)
  }

  fn cached(&self, resource: &str) -> Option<AccessToken> {
    self.cache.lock().ok()?.get(resource).cloned()
  }

  async fn request(&self, resource: &str) -> Result<AccessToken> {
    let mut query = vec![("resource", resource)];
    if let Some(client_id) = &self.client_id {
      query.push(("client_id", client_id.as_str()));
    }

    let (url, request) = match &self.endpoint {
      MsiEndpoint::AppService { url, header } => {
        query.push(("api-version", "2019-08-01"));
        (url, self.client.get(url).header("X-IDENTITY-HEADER", header))
      }
      MsiEndpoint::Imds { url } => {
        query.push(("api-version", "2018-02-01"));
        (url, self.client.get(url).header("Metadata", "true"))
      }
    };

    let resp = request.query(&query).send().await?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::Credential(Error::status(url, status, body).to_string()));
    }
    let token: TokenResponse = resp.json().await?;
    Ok(AccessToken::new(token.access_token))
  }
}

impl CredentialProvider for ManagedIdentity {
  async fn token(&self, resource: &str) -> Result<AccessToken> {
    if let Some(token) = self.cached(resource) {
      return Ok(token);
    }
    tracing::debug!(resource, "requesting managed identity token");
    let token = self.request(resource).await?;
    if let Ok(mut cache) = self.cache.lock() {
      cache.insert(resource.to_string(), token.clone());
    }
    Ok(token)
  }
}

// ─── Runtime choice ──────────────────────────────────────────────────────────

/// Either provider, chosen from configuration at startup.
#[derive(Debug)]
pub enum Credentials {
  Static(StaticToken),
  ManagedIdentity(ManagedIdentity),
}

impl CredentialProvider for Credentials {
  async fn token(&self, resource: &str) -> Result<AccessToken> {
    match self {
      Self::Static(provider) => provider.token(resource).await,
      Self::ManagedIdentity(provider) => provider.token(resource).await,
    }
  }
}
