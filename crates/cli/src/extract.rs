//! `ptrace extract`: reconstruct pledges from the live issuance API.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use log::{info, warn};
use pledgetrace_extract::{
    Diagnostics, ExtractConfig, Extraction, Extractor, QueryCache, SourceMode, Strategy,
};
use pledgetrace_issuance::{DayCalendar, IssuanceClient};

use crate::exit_codes::{EXIT_CONFIG, EXIT_IO};
use crate::output::{render, OutputFormat, SlugResult};
use crate::settings::Settings;
use crate::CliError;

#[derive(Debug, Args)]
#[command(after_help = "\
Examples:
  ptrace extract
  ptrace extract --slug aptera-rega --min 50000 --max 10000000
  ptrace extract --save-cache runs/today --format csv -o pledges.csv
  ptrace extract --load-cache runs/today --days 30 -vv")]
pub struct ExtractArgs {
    /// Offering slug to reconstruct (repeatable; default from config)
    #[arg(long = "slug", value_name = "SLUG")]
    pub slugs: Vec<String>,

    /// Smallest pledge amount in cents
    #[arg(long, value_name = "CENTS")]
    pub min: Option<i64>,

    /// Largest pledge amount in cents
    #[arg(long, value_name = "CENTS")]
    pub max: Option<i64>,

    /// Number of days from the epoch to reconstruct (default: through today)
    #[arg(long)]
    pub days: Option<u32>,

    /// Query one day at a time instead of "on or after"
    #[arg(long)]
    pub day_exact: bool,

    /// Use the jump search instead of step-by-step bisection
    #[arg(long)]
    pub fast: bool,

    /// Restarts allowed per day before giving up
    #[arg(long, value_name = "N")]
    pub max_restarts: Option<u32>,

    /// Query the API directly without memoizing answers
    #[arg(long)]
    pub no_cache: bool,

    /// Seed the cache from PREFIX-<slug>.json
    #[arg(long, value_name = "PREFIX")]
    pub load_cache: Option<String>,

    /// Save the cache to PREFIX-<slug>.json after each slug
    #[arg(long, value_name = "PREFIX")]
    pub save_cache: Option<String>,

    /// Log cache progress every N hits/misses (needs -vv)
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub cache_progress: u64,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

fn cache_path(prefix: &str, slug: &str) -> PathBuf {
    PathBuf::from(format!("{}-{}.json", prefix, slug))
}

/// File config with command-line overrides applied.
pub fn effective_config(base: &ExtractConfig, args: &ExtractArgs) -> ExtractConfig {
    let mut config = base.clone();
    if let Some(min) = args.min {
        config.min_amount_cents = min;
    }
    if let Some(max) = args.max {
        config.max_amount_cents = max;
    }
    if let Some(n) = args.max_restarts {
        config.max_restarts = n;
    }
    if args.day_exact {
        config.mode = SourceMode::DayExact;
    }
    if args.fast {
        config.strategy = Strategy::Fast;
    }
    config
}

fn check_flags(args: &ExtractArgs) -> Result<(), CliError> {
    if args.no_cache && (args.load_cache.is_some() || args.save_cache.is_some()) {
        return Err(CliError::usage("--load-cache/--save-cache cannot be combined with --no-cache"));
    }
    Ok(())
}

pub fn cmd_extract(args: ExtractArgs, config_path: Option<&Path>, verbosity: u8) -> Result<(), CliError> {
    check_flags(&args)?;
    let settings = Settings::load(config_path)?;

    let config = effective_config(&settings.extract, &args);
    config.validate().map_err(|e| CliError::extract(&e))?;

    let mut issuance = settings.issuance.clone();
    if !args.slugs.is_empty() {
        issuance.slugs = args.slugs.clone();
    }
    issuance.validate().map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: e.to_string(),
        hint: None,
    })?;

    let calendar = DayCalendar::new(issuance.epoch);
    let max_day = match args.days {
        Some(d) => d,
        None => calendar.today_day_number() + 1,
    };
    info!(
        "extracting {} slug(s), {} days from {}, {} / {}",
        issuance.slugs.len(),
        max_day,
        issuance.epoch,
        config.mode,
        config.strategy
    );

    let mut results = Vec::new();
    for slug in &issuance.slugs {
        let client = IssuanceClient::for_slug(&issuance, slug, config.mode).map_err(|e| CliError {
            code: EXIT_CONFIG,
            message: e.to_string(),
            hint: None,
        })?;
        let diag = Diagnostics::new(verbosity).with_label(slug.as_str());
        let extractor = Extractor::new(config.clone(), max_day, diag).map_err(|e| CliError::extract(&e))?;

        let extraction = if args.no_cache {
            let mut client = client;
            extractor.run(&mut client).map_err(|e| CliError::extract(&e))?
        } else {
            run_cached(&extractor, client, slug, &args)?
        };
        results.push(SlugResult { slug: slug.clone(), extraction });
    }

    write_output(&results, args.format, &calendar, args.output.as_deref())
}

fn run_cached(
    extractor: &Extractor,
    client: IssuanceClient,
    slug: &str,
    args: &ExtractArgs,
) -> Result<Extraction, CliError> {
    let mut cache = QueryCache::new(client, slug);
    cache.set_progress_period(args.cache_progress);

    if let Some(prefix) = &args.load_cache {
        let path = cache_path(prefix, slug);
        if path.exists() {
            cache.load(&path).map_err(|e| CliError::extract(&e))?;
        } else {
            warn!("[{}] no cache at {}, starting empty", slug, path.display());
        }
    }

    let extraction = extractor.run(&mut cache).map_err(|e| CliError::extract(&e))?;
    let stats = cache.stats();
    info!(
        "[{}] cache: {} hits, {} misses, {} flushes",
        slug, stats.hits, stats.misses, stats.flushes
    );

    if let Some(prefix) = &args.save_cache {
        cache.save(&cache_path(prefix, slug)).map_err(|e| CliError::extract(&e))?;
    }
    Ok(extraction)
}

fn write_output(
    results: &[SlugResult],
    format: OutputFormat,
    calendar: &DayCalendar,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let io_err = |e: io::Error| CliError {
        code: EXIT_IO,
        message: format!("cannot write output: {}", e),
        hint: None,
    };
    match output {
        Some(path) => {
            let file = File::create(path).map_err(|e| CliError {
                code: EXIT_IO,
                message: format!("cannot create {}: {}", path.display(), e),
                hint: None,
            })?;
            let mut w = BufWriter::new(file);
            render(results, format, calendar, &mut w).map_err(io_err)?;
            w.flush().map_err(io_err)
        }
        None => {
            let stdout = io::stdout();
            let mut w = stdout.lock();
            render(results, format, calendar, &mut w).map_err(io_err)
        }
    }
}
