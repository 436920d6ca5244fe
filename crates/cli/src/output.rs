//! Rendering of extraction results.

use std::io::Write;

use clap::ValueEnum;
use pledgetrace_extract::{Extraction, Investment};
use pledgetrace_issuance::{format_cents, DayCalendar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document with every slug
    Json,
    /// `slug,day,date,amount_cents,amount` rows
    Csv,
    /// Tab-separated rows with a per-slug total line
    Plain,
}

/// Reconstruction of one slug.
pub struct SlugResult {
    pub slug: String,
    pub extraction: Extraction,
}

/// `$1,234.56` for 123456 cents.
pub fn format_usd(cents: i64) -> String {
    let plain = format_cents(cents);
    let (digits, sign) = match plain.strip_prefix('-') {
        Some(rest) => (rest, "-"),
        None => (plain.as_str(), ""),
    };
    let (whole, frac) = digits.split_once('.').unwrap_or((digits, "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{frac}")
}

fn sorted(investments: &[Investment]) -> Vec<Investment> {
    let mut v = investments.to_vec();
    v.sort();
    v
}

fn date_str(calendar: &DayCalendar, day: u32) -> String {
    calendar
        .date_of(day)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

pub fn render(
    results: &[SlugResult],
    format: OutputFormat,
    calendar: &DayCalendar,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    match format {
        OutputFormat::Json => render_json(results, calendar, out),
        OutputFormat::Csv => render_csv(results, calendar, out),
        OutputFormat::Plain => render_plain(results, calendar, out),
    }
}

fn render_json(results: &[SlugResult], calendar: &DayCalendar, out: &mut dyn Write) -> std::io::Result<()> {
    let slugs: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            let investments: Vec<serde_json::Value> = sorted(&r.extraction.investments)
                .iter()
                .map(|inv| {
                    serde_json::json!({
                        "day": inv.day,
                        "date": date_str(calendar, inv.day),
                        "amount_cents": inv.amount_cents,
                    })
                })
                .collect();
            let daily: Vec<serde_json::Value> = r
                .extraction
                .daily
                .iter()
                .enumerate()
                .map(|(day, t)| {
                    serde_json::json!({
                        "day": day,
                        "amount_cents": t.amount_cents,
                        "count": t.count,
                    })
                })
                .collect();
            serde_json::json!({
                "slug": r.slug,
                "investments": investments,
                "daily": daily,
                "stats": r.extraction.stats,
            })
        })
        .collect();

    let doc = serde_json::json!({
        "epoch": calendar.epoch().format("%Y-%m-%d").to_string(),
        "slugs": slugs,
    });
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)
}

fn render_csv(results: &[SlugResult], calendar: &DayCalendar, out: &mut dyn Write) -> std::io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["slug", "day", "date", "amount_cents", "amount"])?;
    for r in results {
        for inv in sorted(&r.extraction.investments) {
            wtr.write_record([
                r.slug.clone(),
                inv.day.to_string(),
                date_str(calendar, inv.day),
                inv.amount_cents.to_string(),
                format_cents(inv.amount_cents),
            ])?;
        }
    }
    wtr.flush()
}

fn render_plain(results: &[SlugResult], calendar: &DayCalendar, out: &mut dyn Write) -> std::io::Result<()> {
    for r in results {
        let investments = sorted(&r.extraction.investments);
        for inv in &investments {
            writeln!(
                out,
                "{}\t{}\t{}\t{}",
                r.slug,
                inv.day,
                date_str(calendar, inv.day),
                format_cents(inv.amount_cents)
            )?;
        }
        let total: i64 = investments.iter().map(|i| i.amount_cents).sum();
        writeln!(
            out,
            "# {}: {} pledges, {} total, {} anomalies",
            r.slug,
            investments.len(),
            format_cents(total),
            r.extraction.stats.anomalies
        )?;
    }
    Ok(())
}
