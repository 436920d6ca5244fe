//! Issuance investment-summary client.
//!
//! Blocking reqwest client (no Tokio runtime required). Each query is one
//! GET per configured slug:
//!
//! ```text
//! GET {api_url}?slug=..&processed_at__date__gte=YYYY-MM-DD&shares_amount__gte=D.CC
//! -> {"total_amount_committed": {"amount": 1234.50, "count": 3}}
//! ```
//!
//! Day-exact sources use `processed_at__date` instead of the `__gte` form.

use std::time::Duration;

use log::{debug, trace};
use pledgetrace_extract::{Day, QuerySource, SourceError, SourceMode, Totals};

use crate::calendar::DayCalendar;
use crate::config::IssuanceConfig;

const USER_AGENT: &str = concat!("ptrace/", env!("CARGO_PKG_VERSION"));

const PARAM_SLUG: &str = "slug";
const PARAM_DATE_FROM: &str = "processed_at__date__gte";
const PARAM_DATE_EXACT: &str = "processed_at__date";
const PARAM_THRESHOLD: &str = "shares_amount__gte";

/// Error type for issuance API operations.
#[derive(Debug)]
pub enum IssuanceError {
    /// Connection, TLS or timeout failure
    Network(String),
    /// Non-success HTTP status with response body
    Http(u16, String),
    /// Response body is not the expected summary document
    Parse(String),
    /// Bad client configuration
    Config(String),
}

impl std::fmt::Display for IssuanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssuanceError::Network(msg) => write!(f, "Network error: {}", msg),
            IssuanceError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            IssuanceError::Parse(msg) => write!(f, "Parse error: {}", msg),
            IssuanceError::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for IssuanceError {}

impl From<IssuanceError> for SourceError {
    fn from(e: IssuanceError) -> Self {
        match e {
            IssuanceError::Parse(_) => SourceError::Malformed(e.to_string()),
            _ => SourceError::Unavailable(e.to_string()),
        }
    }
}

/// Issuance API client (blocking). Sums the answers of every slug it holds.
pub struct IssuanceClient {
    http: reqwest::blocking::Client,
    api_url: String,
    slugs: Vec<String>,
    calendar: DayCalendar,
    mode: SourceMode,
}

impl IssuanceClient {
    pub fn new(config: &IssuanceConfig, mode: SourceMode) -> Result<Self, IssuanceError> {
        config.validate()?;
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IssuanceError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            slugs: config.slugs.clone(),
            calendar: DayCalendar::new(config.epoch),
            mode,
        })
    }

    /// Client restricted to a single slug of `config`.
    pub fn for_slug(config: &IssuanceConfig, slug: &str, mode: SourceMode) -> Result<Self, IssuanceError> {
        let config = IssuanceConfig {
            slugs: vec![slug.to_string()],
            ..config.clone()
        };
        Self::new(&config, mode)
    }

    pub fn slugs(&self) -> &[String] {
        &self.slugs
    }

    pub fn calendar(&self) -> &DayCalendar {
        &self.calendar
    }

    pub fn mode(&self) -> SourceMode {
        self.mode
    }

    /// Query parameters for one slug. `day = None` covers the whole round.
    pub fn request_params(
        &self,
        slug: &str,
        threshold: Option<i64>,
        day: Option<Day>,
    ) -> Result<Vec<(&'static str, String)>, IssuanceError> {
        let (date_param, day) = match (day, self.mode) {
            (None, _) => (PARAM_DATE_FROM, 0),
            (Some(d), SourceMode::Cumulative) => (PARAM_DATE_FROM, d),
            (Some(d), SourceMode::DayExact) => (PARAM_DATE_EXACT, d),
        };
        let date = self
            .calendar
            .date_of(day)
            .ok_or_else(|| IssuanceError::Config(format!("day {} is out of calendar range", day)))?;

        let mut params = vec![
            (PARAM_SLUG, slug.to_string()),
            (date_param, date.format("%Y-%m-%d").to_string()),
        ];
        if let Some(t) = threshold {
            params.push((PARAM_THRESHOLD, format_cents(t)));
        }
        Ok(params)
    }

    /// Summed totals across all slugs.
    pub fn fetch_totals(&self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, IssuanceError> {
        let mut total = Totals::ZERO;
        for slug in &self.slugs {
            let params = self.request_params(slug, threshold, day)?;
            total = total + self.fetch_summary(&params)?;
        }
        Ok(total)
    }

    fn fetch_summary(&self, params: &[(&'static str, String)]) -> Result<Totals, IssuanceError> {
        let response = self.http.get(&self.api_url)
            .query(params)
            .send()
            .map_err(|e| IssuanceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(IssuanceError::Http(status, body));
        }

        let body: serde_json::Value = response
            .json()
            .map_err(|e| IssuanceError::Parse(e.to_string()))?;
        let totals = parse_summary(&body)?;
        debug!("issuance {:?} -> {} cents, {} pledges", params, totals.amount_cents, totals.count);
        Ok(totals)
    }
}

impl QuerySource for IssuanceClient {
    fn query(&mut self, threshold: Option<i64>, day: Option<Day>) -> Result<Totals, SourceError> {
        trace!("query threshold={:?} day={:?}", threshold, day);
        Ok(self.fetch_totals(threshold, day)?)
    }
}

// ── Free functions ──────────────────────────────────────────────────

/// Decode the `total_amount_committed` object of a summary response.
pub fn parse_summary(body: &serde_json::Value) -> Result<Totals, IssuanceError> {
    let committed = &body["total_amount_committed"];
    if !committed.is_object() {
        return Err(IssuanceError::Parse("missing total_amount_committed".into()));
    }

    let count = committed["count"]
        .as_i64()
        .filter(|&c| c >= 0)
        .ok_or_else(|| {
            IssuanceError::Parse(format!("bad count: {}", committed["count"]))
        })?;

    let amount = &committed["amount"];
    let amount_cents = if amount.is_null() && count == 0 {
        0
    } else {
        extract_amount(amount).map_err(|e| IssuanceError::Parse(format!("bad amount: {}", e)))?
    };
    Ok(Totals::new(amount_cents, count))
}

/// Amount as cents, from either a JSON string or a JSON number.
fn extract_amount(val: &serde_json::Value) -> Result<i64, String> {
    if let Some(s) = val.as_str() {
        parse_money_string(s)
    } else if let Some(whole) = val.as_i64() {
        whole.checked_mul(100).ok_or_else(|| format!("amount out of range: {}", whole))
    } else if let Some(f) = val.as_f64() {
        parse_money_string(&format!("{:.2}", f))
    } else {
        Err(format!("expected number or string, got {:?}", val))
    }
}

/// Parse a decimal dollar string (`"1234.5"`, `"-3.07"`, `"12"`) to cents.
pub fn parse_money_string(s: &str) -> Result<i64, String> {
    let s = s.trim();
    let negative = s.starts_with('-');
    let s = s.trim_start_matches('-');
    let (dollars, cents) = if let Some(dot) = s.find('.') {
        let d: i64 = s[..dot]
            .parse()
            .map_err(|e| format!("bad dollars: {}", e))?;
        let frac = &s[dot + 1..];
        let c: i64 = match frac.len() {
            0 => 0,
            1 => {
                frac.parse::<i64>()
                    .map_err(|e| format!("bad cents: {}", e))?
                    * 10
            }
            2 => frac.parse().map_err(|e| format!("bad cents: {}", e))?,
            _ => return Err(format!("too many decimal places: {}", s)),
        };
        (d, c)
    } else {
        (s.parse().map_err(|e| format!("bad amount: {}", e))?, 0)
    };
    let minor = dollars
        .checked_mul(100)
        .and_then(|d| d.checked_add(cents))
        .ok_or_else(|| format!("amount out of range: {}", s))?;
    Ok(if negative { -minor } else { minor })
}

/// Cents as `dollars.cents`, the form the API takes thresholds in.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
