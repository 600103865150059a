use std::path::PathBuf;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::Deserialize;

use super::{IndexNowError, IndexNowResult};

pub const DEFAULT_BASE_URL: &str = "https://avatar-video-ai.com";
pub const DEFAULT_ENDPOINT: &str = "https://api.indexnow.org/indexnow";

/// Everything the notifier needs, read once from the environment and passed into `run`.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct IndexNowConfig {
    /// `INDEXNOW_KEY`, the ownership key.
    pub key: String,
    /// `BASE_URL`
    pub base_url: String,
    /// `INDEXNOW_ENDPOINT`
    pub endpoint: String,
    /// `MODIFIED_URLS`, comma separated paths or absolute urls.
    pub modified_urls: String,
    /// `BUILD_ROOT`, where the key file gets written.
    pub build_root: PathBuf,
}

impl Default for IndexNowConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            modified_urls: String::new(),
            build_root: PathBuf::from("."),
        }
    }
}

impl IndexNowConfig {
    /// Reads the notifier variables from the process environment.
    pub fn from_env() -> IndexNowResult<Self> {
        let config = Self::figment().extract()?;
        Ok(config)
    }

    /// Maps the unprefixed variable names onto the struct fields, every other variable is ignored.
    /// Values are merged as plain strings, a key like `0012345678` must not become a number.
    pub fn figment() -> Figment {
        let vars = Env::raw().filter_map(|key| {
            let field = match key.as_str().to_ascii_uppercase().as_str() {
                "INDEXNOW_KEY" => "key",
                "BASE_URL" => "base_url",
                "INDEXNOW_ENDPOINT" => "endpoint",
                "MODIFIED_URLS" => "modified_urls",
                "BUILD_ROOT" => "build_root",
                _ => return None,
            };
            Some(field.into())
        });

        vars.iter().fold(Figment::new(), |figment, (field, value)| {
            figment.merge(Serialized::global(field.as_str(), value))
        })
    }

    /// The trimmed key, an error when it is blank.
    pub fn require_key(&self) -> IndexNowResult<&str> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(IndexNowError::ConfigMissing("INDEXNOW_KEY"));
        }
        Ok(key)
    }

    /// The base url without its trailing slashes.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
