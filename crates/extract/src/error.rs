use std::fmt;

use crate::model::Day;

/// Failure reported by a query source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Transport failure (network error, non-success status, ...).
    Unavailable(String),
    /// The source answered, but the answer could not be decoded.
    Malformed(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "data unavailable: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed source response: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// A search was invoked on a range that breaks its contract: reversed
/// bounds, or endpoint values that contradict the assumed monotonicity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub search: &'static str,
    pub detail: String,
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: precondition violated: {}", self.search, self.detail)
    }
}

impl std::error::Error for Precondition {}

#[derive(Debug)]
pub enum ExtractError {
    /// Config parse or validation error.
    Config(String),
    /// The query source failed; passed through unchanged.
    Source(SourceError),
    /// A day kept producing inconsistent answers. No partial output.
    RetryBudgetExhausted { day: Day, anomalies: u32 },
    /// Cache snapshot read/write/decode error.
    Cache(String),
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::Source(e) => write!(f, "{e}"),
            Self::RetryBudgetExhausted { day, anomalies } => write!(
                f,
                "day {day}: {anomalies} consistency failures, retry budget exhausted"
            ),
            Self::Cache(msg) => write!(f, "cache error: {msg}"),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<SourceError> for ExtractError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}
