use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Result;
use asmspy::commands::{analyze_command, AnalyzeRequest};
use asmspy::log_filter_for;
use asmspy_core::AnalysisOptions;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

/// Assembly reference conflict detector.
///
/// This CLI is a thin wrapper around `asmspy-core`. It scans a directory of
/// .NET modules and lists every referenced assembly that is requested at more
/// than one version.
#[derive(Parser, Debug)]
#[command(
    name = "asmspy",
    version,
    about = "Find conflicting assembly reference versions",
    long_about = None
)]
struct Cli {
    /// Directory to scan.
    #[arg(short = 'p', long)]
    path: String,

    /// Include every referenced assembly, not only the conflicting ones.
    #[arg(short = 'a', long, default_value_t = false)]
    all: bool,

    /// Do not report System* and mscorlib references.
    #[arg(short = 's', long, default_value_t = false)]
    skip_system: bool,

    /// Recurse into subdirectories in order to find additional files.
    #[arg(short = 'd', long, visible_alias = "subdirectories", default_value_t = false)]
    recurse: bool,

    /// Emit JSON instead of human-readable text.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Disable colored version output.
    #[arg(long, default_value_t = false)]
    no_color: bool,

    /// JSON file overriding scanned extensions and system prefixes.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cap the number of worker threads used for extraction.
    #[arg(long)]
    threads: Option<NonZeroUsize>,

    /// Increase log verbosity on stderr (-v, -vv, -vvv).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter_for(cli.verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let request = AnalyzeRequest {
        path: cli.path,
        options: AnalysisOptions {
            include_all: cli.all,
            skip_system: cli.skip_system,
            recurse: cli.recurse,
            threads: cli.threads.map(NonZeroUsize::get),
        },
        config_path: cli.config,
        json: cli.json,
        color: !cli.no_color,
    };

    analyze_command(&request)
}
