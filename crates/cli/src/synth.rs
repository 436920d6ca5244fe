//! `ptrace synth`: self-check the engine against a seeded in-memory dataset.

use clap::Args;
use pledgetrace_extract::{
    Day, Diagnostics, ExtractConfig, Extraction, Extractor, SourceMode, Strategy, SyntheticSource,
};

use crate::exit_codes::EXIT_SELF_CHECK;
use crate::CliError;

#[derive(Debug, Args)]
#[command(after_help = "\
Examples:
  ptrace synth
  ptrace synth --seed 5eed --entries 1000 --days 60 --fast
  PLEDGETRACE_SEED=5eed ptrace synth --day-exact --json")]
pub struct SynthArgs {
    /// Hex seed for the generated dataset (random when omitted)
    #[arg(long, env = "PLEDGETRACE_SEED", value_name = "HEX")]
    pub seed: Option<String>,

    /// Number of pledges to generate
    #[arg(long, default_value_t = 200)]
    pub entries: usize,

    /// Number of days to spread them over
    #[arg(long, default_value_t = 30)]
    pub days: Day,

    /// Smallest generated amount in cents
    #[arg(long, value_name = "CENTS", default_value_t = 500)]
    pub min: i64,

    /// Largest generated amount in cents
    #[arg(long, value_name = "CENTS", default_value_t = 1_000_000)]
    pub max: i64,

    /// Serve day-exact answers instead of cumulative ones
    #[arg(long)]
    pub day_exact: bool,

    /// Use the jump search instead of step-by-step bisection
    #[arg(long)]
    pub fast: bool,

    /// Print a JSON report instead of text
    #[arg(long)]
    pub json: bool,
}

/// Accepts `5eed`, `0x5eed`, `0X5EED`.
pub fn parse_seed(s: &str) -> Result<u64, CliError> {
    let digits = s
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u64::from_str_radix(digits, 16)
        .map_err(|e| CliError::usage(format!("invalid seed '{}': {}", s, e)).with_hint("seed is up to 16 hex digits"))
}

/// Mismatches between the generated dataset and what was recovered.
pub fn verify(src: &SyntheticSource, out: &Extraction, days: Day) -> Vec<String> {
    let mut problems = Vec::new();

    let mut want = src.entries().to_vec();
    want.sort();
    let mut got = out.investments.clone();
    got.sort();
    if want != got {
        problems.push(format!(
            "recovered {} pledges, generated {}",
            got.len(),
            want.len()
        ));
    }

    let mut recovered_daily = vec![0i64; days as usize];
    for inv in &out.investments {
        if let Some(slot) = recovered_daily.get_mut(inv.day as usize) {
            *slot += inv.amount_cents;
        }
    }
    for (day, (got, want)) in recovered_daily.iter().zip(src.daily_amounts(days)).enumerate() {
        if *got != want {
            problems.push(format!("day {}: recovered {} cents, generated {}", day, got, want));
        }
    }
    problems
}

pub fn cmd_synth(args: SynthArgs, verbosity: u8) -> Result<(), CliError> {
    let seed = match &args.seed {
        Some(s) => parse_seed(s)?,
        None => {
            let seed = rand::random::<u64>();
            eprintln!("seed: {:x}", seed);
            seed
        }
    };

    let mode = if args.day_exact { SourceMode::DayExact } else { SourceMode::Cumulative };
    let config = ExtractConfig {
        mode,
        strategy: if args.fast { Strategy::Fast } else { Strategy::Stepwise },
        ..ExtractConfig::new(args.min, args.max)
    };
    let diag = Diagnostics::new(verbosity).with_label("synth");
    let extractor = Extractor::new(config, args.days, diag).map_err(|e| CliError::extract(&e))?;

    let mut src = SyntheticSource::random(seed, args.entries, args.days, args.min, args.max, mode);
    let out = extractor.run(&mut src).map_err(|e| CliError::extract(&e))?;
    let problems = verify(&src, &out, args.days);

    if args.json {
        let report = serde_json::json!({
            "seed": format!("{:x}", seed),
            "entries": src.entries().len(),
            "days": args.days,
            "mode": mode.to_string(),
            "strategy": extractor.config().strategy.to_string(),
            "queries": src.queries(),
            "anomalies": out.stats.anomalies,
            "verified": problems.is_empty(),
            "problems": problems,
        });
        println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
    } else {
        println!("seed:      {:x}", seed);
        println!("entries:   {}", src.entries().len());
        println!("days:      {}", args.days);
        println!("queries:   {}", src.queries());
        println!("anomalies: {}", out.stats.anomalies);
        for p in &problems {
            println!("mismatch:  {}", p);
        }
        println!("{}", if problems.is_empty() { "ok" } else { "FAILED" });
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CliError {
            code: EXIT_SELF_CHECK,
            message: format!("self-check failed for seed {:x}", seed),
            hint: None,
        })
    }
}
