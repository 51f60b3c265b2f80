use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct Config {
    pub(crate) server: ServerConfig,
    pub(crate) storage: StorageConfig,
    pub(crate) json_ld: JsonLdConfig,
    pub(crate) remote: RemoteConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct ServerConfig {
    pub(crate) listen: String,
    pub(crate) http_port: u16,
    /// Public origin of this service, e.g. `https://data.example.com`.
    ///
    /// Resources under this origin are served from local storage. When unset
    /// the origin is derived from the `Host` header of each request.
    pub(crate) public_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct StorageConfig {
    pub(crate) path: PathBuf,
    pub(crate) temporary: bool,
}

#[derive(Clone, Default, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct JsonLdConfig {
    /// JSON file holding the default context document.
    pub(crate) default_context: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub(crate) struct RemoteConfig {
    pub(crate) timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0".to_string(),
            http_port: 8080,
            public_url: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("keyspace"),
            temporary: false,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl Config {
    pub(crate) fn load(path: Option<&Path>) -> Result<Config> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        Config::parse(&text)
    }

    pub(crate) fn parse(text: &str) -> Result<Config> {
        toml::from_str(text).context("invalid config file")
    }
}

impl ServerConfig {
    pub(crate) fn public_url(&self) -> Option<&str> {
        self.public_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }
}

impl JsonLdConfig {
    pub(crate) fn load_default_context(&self) -> Result<Value> {
        let Some(path) = &self.default_context else {
            return Ok(builtin_default_context());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read default context {}", path.display()))?;
        let document: Value = serde_json::from_str(&text).context("invalid default context")?;
        if document.get("@context").is_none() {
            anyhow::bail!("default context document should have a @context entry");
        }
        Ok(document)
    }
}

impl RemoteConfig {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub(crate) fn builtin_default_context() -> Value {
    json!({
        "@context": {
            "@vocab": "https://schema.org/",
            "id": "@id",
            "type": "@type"
        }
    })
}
