use serde::{Deserialize, Serialize};

use crate::error::ExtractError;
use crate::model::{SourceMode, Strategy};

pub const DEFAULT_MAX_RESTARTS: u32 = 8;
/// $10,000,000.00
pub const DEFAULT_MAX_AMOUNT_CENTS: i64 = 10_000_000 * 100;

// ---------------------------------------------------------------------------
// Engine config
// ---------------------------------------------------------------------------

/// Parameters of one reconstruction run.
///
/// `[min_amount_cents, max_amount_cents]` must bracket every pledge in the
/// dataset: pledges outside it cannot be located and make the affected day
/// fail its consistency checks until the retry budget runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default)]
    pub min_amount_cents: i64,
    #[serde(default = "default_max_amount")]
    pub max_amount_cents: i64,
    /// Day restarts allowed per day before the run fails.
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default)]
    pub mode: SourceMode,
    #[serde(default)]
    pub strategy: Strategy,
}

fn default_max_amount() -> i64 {
    DEFAULT_MAX_AMOUNT_CENTS
}

fn default_max_restarts() -> u32 {
    DEFAULT_MAX_RESTARTS
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_amount_cents: 0,
            max_amount_cents: DEFAULT_MAX_AMOUNT_CENTS,
            max_restarts: DEFAULT_MAX_RESTARTS,
            mode: SourceMode::default(),
            strategy: Strategy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ExtractConfig {
    pub fn new(min_amount_cents: i64, max_amount_cents: i64) -> Self {
        Self {
            min_amount_cents,
            max_amount_cents,
            ..Self::default()
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, ExtractError> {
        let config: ExtractConfig =
            toml::from_str(input).map_err(|e| ExtractError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.min_amount_cents < 0 {
            return Err(ExtractError::Config(format!(
                "min_amount_cents must not be negative, got {}",
                self.min_amount_cents
            )));
        }
        if self.min_amount_cents > self.max_amount_cents {
            return Err(ExtractError::Config(format!(
                "min_amount_cents ({}) exceeds max_amount_cents ({})",
                self.min_amount_cents, self.max_amount_cents
            )));
        }
        // the fast search evaluates max + 1
        if self.max_amount_cents == i64::MAX {
            return Err(ExtractError::Config("max_amount_cents too large".into()));
        }
        if self.max_restarts == 0 {
            return Err(ExtractError::Config("max_restarts must be at least 1".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
