use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "silence",
    version,
    about = "Check which alarm silence rules apply at a given time"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every rule against a timestamp
    Check(CheckArgs),
    /// Report rules that fail to load or can never match
    Lint(LintArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// Rule file (YAML)
    #[arg(short, long)]
    rules: PathBuf,

    /// Timestamp to evaluate: local wall-clock time (YYYY-MM-DD[ HH:MM[:SS]])
    /// in the reference zone, or an RFC 3339 instant. Defaults to now.
    #[arg(long)]
    at: Option<String>,

    /// Reference zone (IANA name); overrides the rule file's `timezone`
    #[arg(long)]
    timezone: Option<String>,

    /// Only show rules that apply to this environment
    #[arg(long)]
    env: Option<String>,

    /// Only show rules of this product
    #[arg(long)]
    product: Option<String>,

    /// Alarm message (JSON) to match against each rule's pattern and path
    #[arg(long, value_name = "FILE")]
    message: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct LintArgs {
    /// Rule file (YAML)
    #[arg(short, long)]
    rules: PathBuf,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SILENCE_LOG").unwrap_or_else(|_| EnvFilter::new("silence=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => commands::check(args),
        Commands::Lint(args) => commands::lint(args),
    }
}
