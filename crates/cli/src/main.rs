// ptrace - reconstruct individual pledges from aggregate threshold queries

mod exit_codes;
mod extract;
mod output;
mod settings;
mod synth;
mod totals;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pledgetrace_extract::ExtractError;

use exit_codes::{extract_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "ptrace")]
#[command(about = "Reconstruct individual pledges from aggregate threshold queries")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/pledgetrace/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More output on stderr (-v days, -vv steps, -vvv requests)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct every pledge of the configured offerings
    Extract(extract::ExtractArgs),

    /// Run the engine against a seeded synthetic dataset and verify it
    Synth(synth::SynthArgs),

    /// Print the current committed amount and pledge count
    Totals(totals::TotalsArgs),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("PTRACE_GIT_HASH"), ")",
        "\nengine:  pledgetrace-extract ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("PTRACE_TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    /// Engine error with its registry exit code and, where one helps, a hint.
    pub fn extract(err: &ExtractError) -> Self {
        let hint = match err {
            ExtractError::RetryBudgetExhausted { .. } => {
                Some("the dataset is changing quickly; retry later or raise --max-restarts".to_string())
            }
            ExtractError::Source(_) => Some("check network access and issuance.api_url".to_string()),
            ExtractError::Config(_) => Some("amounts are in cents; --min must not exceed --max".to_string()),
            _ => None,
        };
        Self { code: extract_exit_code(err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Extract(args) => extract::cmd_extract(args, config, cli.verbose),
        Commands::Synth(args) => synth::cmd_synth(args, cli.verbose),
        Commands::Totals(args) => totals::cmd_totals(args, config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
