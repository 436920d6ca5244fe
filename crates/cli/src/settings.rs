//! Config file: `[extract]` engine parameters and `[issuance]` API settings.
//!
//! Looked up at `--config FILE` when given, otherwise at
//! `<config dir>/pledgetrace/config.toml` if that exists. Every field is
//! optional; command-line flags override what the file says.

use std::path::{Path, PathBuf};

use pledgetrace_extract::ExtractConfig;
use pledgetrace_issuance::IssuanceConfig;
use serde::Deserialize;

use crate::exit_codes::EXIT_CONFIG;
use crate::CliError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub issuance: IssuanceConfig,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("pledgetrace/config.toml"))
}

impl Settings {
    pub fn from_toml(input: &str) -> Result<Self, CliError> {
        toml::from_str(input).map_err(|e| CliError {
            code: EXIT_CONFIG,
            message: format!("invalid config: {}", e),
            hint: None,
        })
    }

    /// Load `explicit` (must exist) or the default path (may be absent).
    pub fn load(explicit: Option<&Path>) -> Result<Self, CliError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) if p.exists() => p,
                _ => return Ok(Self::default()),
            },
        };
        let text = std::fs::read_to_string(&path).map_err(|e| CliError {
            code: EXIT_CONFIG,
            message: format!("cannot read config {}: {}", path.display(), e),
            hint: None,
        })?;
        log::info!("config: {}", path.display());
        Self::from_toml(&text).map_err(|e| CliError {
            message: format!("{}: {}", path.display(), e.message),
            ..e
        })
    }
}
