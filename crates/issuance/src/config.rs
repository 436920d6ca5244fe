use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::client::IssuanceError;

pub const DEFAULT_API_URL: &str = "https://api.issuance.com/api/investments/summary/";
pub const DEFAULT_SLUGS: [&str; 2] = ["aptera-rega", "aptera-regd"];
/// First day of the tracked offering round.
pub const DEFAULT_EPOCH: &str = "2025-04-10";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// `[issuance]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_slugs")]
    pub slugs: Vec<String>,
    #[serde(default = "default_epoch")]
    pub epoch: NaiveDate,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_slugs() -> Vec<String> {
    DEFAULT_SLUGS.iter().map(|s| s.to_string()).collect()
}

fn default_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 4, 10).unwrap_or(NaiveDate::MIN)
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            slugs: default_slugs(),
            epoch: default_epoch(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl IssuanceConfig {
    pub fn from_toml(input: &str) -> Result<Self, IssuanceError> {
        let config: IssuanceConfig =
            toml::from_str(input).map_err(|e| IssuanceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IssuanceError> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(IssuanceError::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }
        if self.slugs.is_empty() {
            return Err(IssuanceError::Config("at least one slug is required".into()));
        }
        if let Some(blank) = self.slugs.iter().find(|s| s.trim().is_empty()) {
            return Err(IssuanceError::Config(format!("invalid slug '{blank}'")));
        }
        if self.timeout_secs == 0 {
            return Err(IssuanceError::Config("timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}
