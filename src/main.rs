// SPDX-License-Identifier: PMPL-1.0-or-later
//! a11ybot CLI - scan HTML and JSX sources for accessibility defects

use a11ybot::cache::{FileCache, DEFAULT_MAX_AGE_DAYS};
use a11ybot::config::Config;
use a11ybot::report::{generate_report, OutputFormat};
use a11ybot::scanner::{collect_files, Scanner};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// File the JSON report is written to when `report = true`
const REPORT_FILE: &str = "a11ybot-report.json";

/// Accessibility scanner and auto-fixer for HTML and JSX
#[derive(Parser)]
#[command(name = "a11ybot")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files and directories, optionally fixing what can be fixed
    Check {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Rewrite fixable issues in place
        #[arg(long)]
        fix: bool,

        /// Configuration file (defaults to ./a11ybot.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: FormatArg,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Ignore and do not update the scan cache
        #[arg(long)]
        no_cache: bool,

        /// Scan files one at a time
        #[arg(long)]
        no_parallel: bool,

        /// Maximum files scanned at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Drop old entries from the scan cache
    CleanCache {
        /// Cache directory
        #[arg(long, default_value = ".a11ybot-cache")]
        cache_dir: PathBuf,

        /// Remove entries older than this many days
        #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS)]
        max_age_days: i64,

        /// Remove every entry
        #[arg(long)]
        all: bool,

        /// Enable verbose logging
        #[arg(long, short)]
        verbose: bool,
    },
}

/// Output format CLI argument
#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// SARIF for IDE/CI
    Sarif,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Sarif => OutputFormat::Sarif,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("a11ybot=debug")
    } else {
        EnvFilter::new("a11ybot=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            paths,
            fix,
            config,
            format,
            output,
            no_cache,
            no_parallel,
            concurrency,
            cache_dir,
            verbose,
        } => {
            init_logging(verbose);

            let cwd = std::env::current_dir()?;
            let mut config = Config::discover(config.as_deref(), &cwd)?;
            config.fix |= fix;
            if no_cache {
                config.performance.cache = false;
            }
            if no_parallel {
                config.performance.parallel = false;
            }
            if let Some(n) = concurrency {
                config.performance.max_concurrent_files = n;
            }
            if let Some(dir) = cache_dir {
                config.performance.cache_dir = dir;
            }
            config.validate()?;

            let files = collect_files(&paths, &config.ignore)?;
            info!(files = files.len(), "Starting scan");

            let fixing = config.fix;
            let write_report_file = config.report && output.is_none();
            let scanner = if config.performance.cache && !fixing {
                let cache = FileCache::open(&config.performance.cache_dir);
                Scanner::with_cache(config, cache)
            } else {
                Scanner::new(config)
            };

            let results = scanner.scan_files(files).await;

            let report = generate_report(&results, format.into());
            write_output(&report, output.as_deref())?;

            if write_report_file {
                let json = generate_report(&results, OutputFormat::Json);
                write_output(&json, Some(Path::new(REPORT_FILE)))?;
            }

            if !fixing && results.iter().any(|r| r.has_errors()) {
                std::process::exit(1);
            }
        }

        Commands::CleanCache {
            cache_dir,
            max_age_days,
            all,
            verbose,
        } => {
            init_logging(verbose);
            let mut cache = FileCache::open(&cache_dir);

            if all {
                let count = cache.len();
                cache.clear()?;
                eprintln!("Removed {} cache entries", count);
            } else {
                let removed = cache.cleanup(chrono::Duration::days(max_age_days.max(0)))?;
                eprintln!(
                    "Removed {} cache entries older than {} day(s), {} remaining",
                    removed,
                    max_age_days,
                    cache.len()
                );
            }
        }
    }

    Ok(())
}

/// Write output to file or stdout
fn write_output(content: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            std::fs::write(p, content)?;
            eprintln!("Report written to {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
