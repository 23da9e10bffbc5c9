//! Instance connection settings.
//!
//! # Configuration File Format
//!
//! ```toml
//! host = "10.0.0.12"
//! port = 8181
//! username = "Admin"
//! password = "Admin"
//! ```
//!
//! Every field is optional.

use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Where an instance listens and how to authenticate against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InstanceConfig {
    /// Host name or address of the instance.
    pub host: String,
    /// REST API port.
    pub port: u16,
    /// Basic authentication user.
    pub username: String,
    /// Basic authentication password.
    pub password: String,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8181,
            username: "Admin".to_string(),
            password: "Admin".to_string(),
        }
    }
}

impl InstanceConfig {
    /// Load settings from a `.toml` or `.json` file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("{} not found, using default instance settings", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("can not open config file: {}", path.display()))?;

        let config: Self = match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
            "toml" => toml::from_str(&content)
                .with_context(|| format!("invalid TOML in {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON in {}", path.display()))?,
            _ => bail!("unsupported config file extension: {}", path.display()),
        };
        Ok(config)
    }

    /// Root URL of the REST API.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}
