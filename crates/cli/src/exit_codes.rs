//! CLI Exit Code Registry
//!
//! Single source of truth for `ptrace` exit codes. Scripts that poll the
//! issuance API on a schedule branch on these, so they only ever grow.
//!
//! | Code | Meaning                                            |
//! |------|----------------------------------------------------|
//! | 0    | Success                                            |
//! | 2    | Usage error (bad or conflicting flags)             |
//! | 3    | Config error (unreadable/invalid TOML, bad values) |
//! | 4    | I/O error (output file, cache file)                |
//! | 10   | Query source unavailable or malformed response     |
//! | 11   | Retry budget exhausted (dataset kept changing)     |
//! | 12   | Synthetic self-check mismatch                      |

use pledgetrace_extract::{ExtractError, SourceError};

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, conflicting options.
pub const EXIT_USAGE: u8 = 2;

/// Config file missing (when named explicitly), unparseable, or invalid.
pub const EXIT_CONFIG: u8 = 3;

/// Cannot read or write a file (output, cache snapshot).
pub const EXIT_IO: u8 = 4;

/// Network failure, non-success HTTP status, or undecodable response.
pub const EXIT_SOURCE_UNAVAILABLE: u8 = 10;

/// A day kept failing its consistency checks. No output was written.
pub const EXIT_RETRY_BUDGET: u8 = 11;

/// `ptrace synth` recovered something other than what it generated.
pub const EXIT_SELF_CHECK: u8 = 12;

/// Map an engine error to its exit code.
pub fn extract_exit_code(err: &ExtractError) -> u8 {
    match err {
        ExtractError::Config(_) => EXIT_CONFIG,
        ExtractError::Source(SourceError::Unavailable(_) | SourceError::Malformed(_)) => {
            EXIT_SOURCE_UNAVAILABLE
        }
        ExtractError::RetryBudgetExhausted { .. } => EXIT_RETRY_BUDGET,
        ExtractError::Cache(_) => EXIT_IO,
    }
}
