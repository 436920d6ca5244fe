//! Issuance API client: the live data source behind `ptrace`.
//!
//! One blocking GET per slug per query, summed. No retries beyond what the
//! engine's day restarts already provide. No caching here; wrap the source
//! in [`pledgetrace_extract::QueryCache`] for that.

mod calendar;
mod client;
mod config;

pub use calendar::DayCalendar;
pub use client::{format_cents, parse_money_string, parse_summary, IssuanceClient, IssuanceError};
pub use config::{IssuanceConfig, DEFAULT_API_URL, DEFAULT_EPOCH, DEFAULT_SLUGS};
