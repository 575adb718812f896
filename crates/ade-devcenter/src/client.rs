//! Authenticated JSON GETs against Azure endpoints.

use std::{collections::HashSet, sync::Arc};

use serde::de::DeserializeOwned;

use crate::{
  credential::CredentialProvider,
  error::{Error, Result},
  wire::Page,
};

/// Items collected from a paged listing.
#[derive(Debug)]
pub struct Paged<T> {
  pub items:       Vec<T>,
  /// Set when a page after the first failed; `items` holds what came before.
  pub interrupted: Option<Error>,
}

/// Cheap to clone: the inner [`reqwest::Client`] and credentials are shared.
#[derive(Debug)]
pub struct Http<C> {
  client:      reqwest::Client,
  credentials: Arc<C>,
}

impl<C> Clone for Http<C> {
  fn clone(&self) -> Self {
    Self { client: self.client.clone(), credentials: Arc::clone(&self.credentials) }
  }
}

impl<C: CredentialProvider> Http<C> {
  pub fn new(client: reqwest::Client, credentials: Arc<C>) -> Self { Self { client, credentials } }

  /// `GET url` with a bearer token for `resource`.
  pub async fn get_json<T: DeserializeOwned>(&self, url: &str, resource: &str) -> Result<T> {
    let token = self.credentials.token(resource).await?;
    let resp = self.client.get(url).bearer_auth(token.secret()).send().await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::status(url, status, body));
    }
    Ok(resp.json().await?)
  }

  /// Follow `nextLink` until exhausted. A failure on the first page is an
  /// error; a later failure, or a link already followed, keeps the items
  /// already collected.
  pub async fn get_paged<T: DeserializeOwned>(&self, url: &str, resource: &str) -> Result<Paged<T>> {
    let first: Page<T> = self.get_json(url, resource).await?;
    let mut items = first.value;
    let mut next = first.next_link;
    let mut visited = HashSet::from([url.to_string()]);

    while let Some(link) = next.take() {
      if !visited.insert(link.clone()) {
        tracing::warn!(url = %link, "pagination cycle");
        return Ok(Paged { items, interrupted: Some(Error::PageCycle { url: link }) });
      }
      match self.get_json::<Page<T>>(&link, resource).await {
        Ok(page) => {
          items.extend(page.value);
          next = page.next_link;
        }
        Err(error) => {
          tracing::warn!(%error, url = %link, "pagination interrupted");
          return Ok(Paged { items, interrupted: Some(error) });
        }
      }
    }
    Ok(Paged { items, interrupted: None })
  }
}
