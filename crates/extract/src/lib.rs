//! `pledgetrace-extract`: reconstruct individual pledges from aggregate queries.
//!
//! Pure engine crate: receives a query source that only reports
//! `(total amount, count)` above a threshold, returns the inferred
//! `(day, amount)` multiset. No CLI or network dependencies.

pub mod bisect;
pub mod cache;
pub mod config;
pub mod counter;
pub mod daily;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod jumps;
pub mod model;
pub mod source;
pub mod synthetic;

pub use cache::QueryCache;
pub use config::ExtractConfig;
pub use diagnostics::Diagnostics;
pub use engine::Extractor;
pub use error::{ExtractError, SourceError};
pub use model::{Day, Extraction, Investment, SourceMode, Strategy, Totals};
pub use source::QuerySource;
pub use synthetic::SyntheticSource;
