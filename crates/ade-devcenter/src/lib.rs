//! Azure DevCenter backend for the ADE expiration monitor.
//!
//! Discovers dev centers and projects through Azure Resource Manager, lists
//! environments through each dev center's data-plane endpoint and reads
//! resource-group tags for owner resolution. Plain REST over [`reqwest`];
//! tokens come from a [`credential::CredentialProvider`].

mod client;
mod strategy;
mod wire;

pub mod credential;
pub mod error;
pub mod source;

pub use credential::{Credentials, ManagedIdentity, StaticToken};
pub use error::{Error, Result};
pub use source::{DevCenterConfig, DevCenterSource};
