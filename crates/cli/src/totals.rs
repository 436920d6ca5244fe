//! `ptrace totals`: one summary query against the issuance API.
//!
//! By default counts only pledges at or above the priority threshold, the
//! ones that claim a priority slot.

use std::io::Write;
use std::path::Path;

use clap::Args;
use pledgetrace_extract::SourceMode;
use pledgetrace_issuance::IssuanceClient;

use crate::exit_codes::{EXIT_CONFIG, EXIT_IO, EXIT_SOURCE_UNAVAILABLE};
use crate::output::format_usd;
use crate::settings::Settings;
use crate::CliError;

/// Smallest pledge that claims a priority slot ($5,000).
pub const PRIORITY_THRESHOLD_CENTS: i64 = 500_000;

/// Priority slots on offer.
pub const PRIORITY_SLOTS: i64 = 1_000;

#[derive(Debug, Args)]
pub struct TotalsArgs {
    /// Only count pledges of at least this many cents [default: 500000]
    #[arg(long, value_name = "CENTS", conflicts_with = "all")]
    pub threshold: Option<i64>,

    /// Count every pledge, not just priority ones
    #[arg(long)]
    pub all: bool,

    /// Print priority slots remaining instead of the qualifying count
    #[arg(long, conflicts_with = "all")]
    pub remaining: bool,

    /// Priority slots available, for --remaining
    #[arg(long, value_name = "N", default_value_t = PRIORITY_SLOTS)]
    pub total_slots: i64,

    /// Print the total dollar amount committed
    #[arg(long, short = 'd')]
    pub dollar: bool,

    /// Print the average pledge of the counted pledges
    #[arg(long = "average")]
    pub average: bool,

    /// Leave the timestamp off the line
    #[arg(long)]
    pub no_timestamp: bool,

    /// Offering slug (repeatable; default from config)
    #[arg(long = "slug", value_name = "SLUG")]
    pub slugs: Vec<String>,

    /// Output one CSV record
    #[arg(long, conflicts_with = "json")]
    pub csv: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,
}

impl TotalsArgs {
    fn effective_threshold(&self) -> Option<i64> {
        if self.all {
            None
        } else {
            Some(self.threshold.unwrap_or(PRIORITY_THRESHOLD_CENTS))
        }
    }
}

/// Mean pledge in cents, rounded half away from zero; `None` when nothing counted.
pub fn average_cents(amount_cents: i64, count: i64) -> Option<i64> {
    if count <= 0 {
        return None;
    }
    let half = count / 2;
    Some(if amount_cents >= 0 {
        (amount_cents + half) / count
    } else {
        (amount_cents - half) / count
    })
}

/// Labelled fields of one totals line, in print order.
struct Line {
    timestamp: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Line {
    fn human(&self) -> String {
        let body = self
            .fields
            .iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect::<Vec<_>>()
            .join(", ");
        match &self.timestamp {
            Some(ts) => format!("{ts} {body}"),
            None => body,
        }
    }

    fn write_csv(&self, out: &mut dyn Write) -> std::io::Result<()> {
        let mut wtr = csv::Writer::from_writer(out);
        let record: Vec<&str> = self
            .timestamp
            .iter()
            .map(String::as_str)
            .chain(self.fields.iter().map(|(_, v)| v.as_str()))
            .collect();
        wtr.write_record(&record)?;
        wtr.flush()
    }
}

pub fn cmd_totals(args: TotalsArgs, config_path: Option<&Path>) -> Result<(), CliError> {
    let settings = Settings::load(config_path)?;
    let mut issuance = settings.issuance;
    if !args.slugs.is_empty() {
        issuance.slugs = args.slugs.clone();
    }
    let threshold = args.effective_threshold();

    let client = IssuanceClient::new(&issuance, SourceMode::Cumulative).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: e.to_string(),
        hint: None,
    })?;
    let totals = client.fetch_totals(threshold, None).map_err(|e| CliError {
        code: EXIT_SOURCE_UNAVAILABLE,
        message: e.to_string(),
        hint: Some(format!("check api_url ({})", issuance.api_url)),
    })?;
    let now = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let average = average_cents(totals.amount_cents, totals.count);
    let remaining = args.remaining.then(|| args.total_slots - totals.count);

    if args.json {
        let mut doc = serde_json::json!({
            "slugs": issuance.slugs,
            "since": issuance.epoch.format("%Y-%m-%d").to_string(),
            "threshold_cents": threshold,
            "amount_cents": totals.amount_cents,
            "count": totals.count,
            "average_cents": average,
            "slots_remaining": remaining,
        });
        if !args.no_timestamp {
            doc["timestamp"] = serde_json::Value::String(now);
        }
        println!("{}", doc);
        return Ok(());
    }

    let mut fields = Vec::new();
    if args.dollar {
        fields.push(("dollar total", format_usd(totals.amount_cents)));
    }
    fields.push(("slots", remaining.unwrap_or(totals.count).to_string()));
    if args.average {
        let avg = average.map(format_usd).unwrap_or_else(|| "n/a".to_string());
        fields.push(("average", avg));
    }
    let line = Line {
        timestamp: (!args.no_timestamp).then_some(now),
        fields,
    };

    if args.csv {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        line.write_csv(&mut lock).map_err(|e| CliError {
            code: EXIT_IO,
            message: format!("write failed: {e}"),
            hint: None,
        })?;
    } else {
        println!("{}", line.human());
    }
    Ok(())
}
