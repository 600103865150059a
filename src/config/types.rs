//! The configuration structs used to build the AppConfig, and their impls.
use std::{path::PathBuf, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use strum_macros::AsRefStr;

use crate::config::{ConfigError, ConfigResult};

// ###################################
// ->   STRUCTS
// ###################################
#[derive(AsRefStr, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AppConfig {
    pub net_config: NetConfig,
    pub store_config: StoreConfig,
    pub submission_config: SubmissionConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NetConfig {
    pub host: [u8; 4],
    pub app_port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    pub sheets_api_url: String,
    pub sheets_access_token: SecretString,
    pub sheets_timeout_millis: u64,
}

/// Which `TabularStore` implementation backs the submission handler.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Fs,
    Sheets,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SubmissionConfig {
    /// Name of the sub-table rows get appended to.
    pub sheet_name: String,
    pub lock_timeout_millis: u64,
    /// Fail the request instead of proceeding when the lock wait expires.
    pub strict_lock: bool,
    /// Dedupe data rows on `(email, lang)` after every append.
    pub dedupe: bool,
    pub status_mode: StatusMode,
}

/// How the outcome of a submission is reported to the caller.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusMode {
    /// Real HTTP status codes (400 / 500).
    #[default]
    Real,
    /// Always `200 OK` with the status code carried in the JSON body.
    Embedded,
}

// ###################################
// ->   IMPLs
// ###################################
impl AppConfig {
    pub(super) fn validate(&self) -> ConfigResult<()> {
        if self.store_config.backend == StoreBackend::Sheets
            && self
                .store_config
                .sheets_access_token
                .expose_secret()
                .trim()
                .is_empty()
        {
            return Err(ConfigError::MissingSheetsToken);
        }

        Ok(())
    }
}

impl StoreConfig {
    pub fn sheets_timeout(&self) -> Duration {
        Duration::from_millis(self.sheets_timeout_millis)
    }
}

impl SubmissionConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_millis)
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            sheet_name: "newsletter".to_string(),
            lock_timeout_millis: 5000,
            strict_lock: false,
            dedupe: false,
            status_mode: StatusMode::default(),
        }
    }
}

// ###################################
// ->   TRY FROMs
// ###################################

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            _ => Err(Self::Error::StringToEnvironmentFail(value)),
        }
    }
}
