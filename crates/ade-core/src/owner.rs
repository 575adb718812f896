//! Owner resolution from resource-group tags or a fallback account id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::environment::Tags;

/// Tag keys that name an owner, highest priority first. Matching ignores case.
pub const OWNER_TAG_KEYS: [&str; 5] =
  ["created_by", "createdby", "created-by", "owner", "user-email"];

/// A contactable identity, or the explicit absence of one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Owner {
  Identity(String),
  Unresolved,
}

impl Owner {
  pub fn identity(&self) -> Option<&str> {
    match self {
      Self::Identity(id) => Some(id),
      Self::Unresolved => None,
    }
  }
}

impl fmt::Display for Owner {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Identity(id) => f.write_str(id),
      Self::Unresolved => f.write_str("unknown"),
    }
  }
}

/// Resolve the owner of an environment.
///
/// The first key of [`OWNER_TAG_KEYS`] present in `tags` with a non-blank
/// value wins, independent of map order. Otherwise a non-blank `fallback_id`
/// is used.
pub fn resolve(tags: &Tags, fallback_id: Option<&str>) -> Owner {
  let tagged = OWNER_TAG_KEYS.iter().find_map(|wanted| {
    tags
      .iter()
      .find(|(key, value)| key.eq_ignore_ascii_case(wanted) && !value.trim().is_empty())
      .map(|(_, value)| value.trim())
  });

  match tagged.or_else(|| fallback_id.map(str::trim).filter(|id| !id.is_empty())) {
    Some(id) => Owner::Identity(id.to_string()),
    None => Owner::Unresolved,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn created_by_outranks_owner() {
    let t = tags(&[("Owner", "a@x.com"), ("created_by", "b@x.com")]);
    assert_eq!(resolve(&t, None), Owner::Identity("b@x.com".into()));
  }

  #[test]
  fn keys_match_case_insensitively() {
    let t = tags(&[("User-Email", "c@x.com"), ("CreatedBy", "d@x.com")]);
    assert_eq!(resolve(&t, None), Owner::Identity("d@x.com".into()));
  }

  #[test]
  fn unrelated_tags_fall_back_to_account_id() {
    let t = tags(&[("cost-center", "42")]);
    assert_eq!(
      resolve(&t, Some("6c1f-object-id")),
      Owner::Identity("6c1f-object-id".into())
    );
  }

  #[test]
  fn blank_tag_values_are_skipped() {
    let t = tags(&[("created_by", " "), ("owner", "e@x.com")]);
    assert_eq!(resolve(&t, None), Owner::Identity("e@x.com".into()));
  }

  #[test]
  fn nothing_usable_is_unresolved() {
    assert_eq!(resolve(&Tags::new(), None), Owner::Unresolved);
    assert_eq!(resolve(&Tags::new(), Some("")), Owner::Unresolved);
    assert_ne!(resolve(&Tags::new(), Some("")), Owner::Identity(String::new()));
  }

  #[test]
  fn unresolved_displays_as_unknown() {
    assert_eq!(Owner::Unresolved.to_string(), "unknown");
    assert_eq!(Owner::Unresolved.identity(), None);
  }
}
