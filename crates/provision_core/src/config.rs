//! Store connection settings.
//!
//! Settings come from up to three layers: built-in defaults, an optional TOML
//! file and the command line (which also covers environment variables). Each
//! layer is a [`ConfigLayer`]; [`ConfigLayer::overlay`] lets a higher layer
//! win field by field and [`ConfigLayer::resolve`] validates the result.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_REGION: &str = "ap-northeast-1";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Address and credentials of the key-value store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConnection {
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConnection")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    pub connection: StoreConnection,
    /// Poll the new table until it reports `ACTIVE` before seeding.
    pub wait_for_active: bool,
    /// Read the seeded record back after writing it.
    pub verify: bool,
}

/// One partially specified layer of settings.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub wait_for_active: Option<bool>,
    pub verify: Option<bool>,
}

impl ConfigLayer {
    pub fn defaults() -> Self {
        Self {
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            region: Some(DEFAULT_REGION.to_string()),
            access_key_id: None,
            secret_access_key: None,
            wait_for_active: Some(false),
            verify: Some(false),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Returns `self` with every field set in `higher` replaced.
    pub fn overlay(self, higher: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            endpoint: higher.endpoint.or(self.endpoint),
            region: higher.region.or(self.region),
            access_key_id: higher.access_key_id.or(self.access_key_id),
            secret_access_key: higher.secret_access_key.or(self.secret_access_key),
            wait_for_active: higher.wait_for_active.or(self.wait_for_active),
            verify: higher.verify.or(self.verify),
        }
    }

    pub fn resolve(self) -> Result<ProvisionerConfig, ConfigError> {
        let endpoint = required(self.endpoint, "endpoint")?;
        validate_endpoint(&endpoint)?;

        Ok(ProvisionerConfig {
            connection: StoreConnection {
                endpoint,
                region: required(self.region, "region")?,
                access_key_id: required(self.access_key_id, "access_key_id")?,
                secret_access_key: required(self.secret_access_key, "secret_access_key")?,
            },
            wait_for_active: self.wait_for_active.unwrap_or(false),
            verify: self.verify.unwrap_or(false),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ConfigError> {
    let value = value.map(|raw| raw.trim().to_string()).unwrap_or_default();
    if value.is_empty() {
        return Err(ConfigError::Missing(field));
    }
    Ok(value)
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let Some((scheme, rest)) = endpoint.split_once("://") else {
        return Err(ConfigError::Invalid {
            field: "endpoint",
            reason: format!("'{endpoint}' is not a URL"),
        });
    };

    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::Invalid {
            field: "endpoint",
            reason: format!("unsupported scheme '{scheme}' (expected http or https)"),
        });
    }

    if rest.trim_end_matches('/').is_empty() {
        return Err(ConfigError::Invalid {
            field: "endpoint",
            reason: "host is empty".to_string(),
        });
    }

    Ok(())
}
