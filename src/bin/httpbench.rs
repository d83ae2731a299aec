//! httpbench command line
//!
//! Runs one load test against an already running server and prints a
//! Markdown comparison with every recorded benchmark.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use httpbench::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "httpbench")]
#[command(about = "Benchmark an HTTP server and compare against previous runs")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load generator and compare with cached results
    Run {
        /// Name to record this result under
        #[arg(short, long)]
        name: String,

        /// Store the result in the cache after reporting
        #[arg(short, long)]
        save: bool,

        #[command(flatten)]
        overrides: Overrides,
    },
    /// Show every cached result without running a benchmark
    Show {
        /// Cache file to read
        #[arg(long)]
        cache: Option<PathBuf>,
    },
    /// Print the effective configuration
    Config,
}

#[derive(Args, Default)]
struct Overrides {
    /// Load generator threads
    #[arg(short, long)]
    threads: Option<u32>,

    /// Concurrent connections
    #[arg(short, long)]
    connections: Option<u32>,

    /// Test duration in seconds
    #[arg(short, long)]
    duration: Option<u64>,

    /// Target URL
    #[arg(short, long)]
    url: Option<String>,

    /// Cache file to read and update
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Load generator program
    #[arg(long)]
    generator: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut HarnessConfig) {
        if let Some(threads) = self.threads {
            config.load.threads = threads;
        }
        if let Some(connections) = self.connections {
            config.load.connections = connections;
        }
        if let Some(duration) = self.duration {
            config.load.duration_seconds = duration;
        }
        if let Some(url) = self.url {
            config.load.target_url = url;
        }
        if let Some(cache) = self.cache {
            config.cache_path = cache;
        }
        if let Some(generator) = self.generator {
            config.generator.program = generator;
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Defaults, then the config file, then environment variables
fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig> {
    let mut config = match path {
        Some(path) => HarnessConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    Ok(config)
}

async fn run(config: HarnessConfig, name: String, save: bool) -> Result<bool> {
    config.validate().context("Invalid configuration")?;
    debug!("Effective configuration: {:?}", config);

    let generator = Arc::new(CommandLoadGenerator::new(config.generator.clone()));
    let runner = BenchmarkRunner::new(config, generator);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = runner
        .run(&RunOptions::new(name, save), &mut out)
        .await
        .context("Benchmark run failed")?;

    for reason in &summary.entry_errors {
        warn!("{}", reason);
    }
    if summary.saved {
        info!("Saved results to {}", runner.cache().path().display());
    }

    Ok(summary.output_error.is_none() && summary.save_error.is_none())
}

async fn show(config: HarnessConfig) -> Result<()> {
    let generator = Arc::new(CommandLoadGenerator::new(config.generator.clone()));
    let runner = BenchmarkRunner::new(config, generator);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let (rendered, errors) = runner
        .show_cached(&mut out)
        .await
        .context("Failed to read cached results")?;

    info!("Rendered {} cached results, {} unreadable", rendered, errors.len());
    Ok(())
}

fn print_config(config: &HarnessConfig) -> Result<()> {
    let text = config.to_toml().context("Failed to serialize configuration")?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Returns `Ok(false)` when the run finished but the report could not be written or saved
async fn dispatch(cli: Cli) -> Result<bool> {
    let mut config = load_config(cli.config.as_ref())?;
    match cli.command {
        Commands::Run { name, save, overrides } => {
            overrides.apply(&mut config);
            run(config, name, save).await
        }
        Commands::Show { cache } => {
            Overrides { cache, ..Default::default() }.apply(&mut config);
            show(config).await?;
            Ok(true)
        }
        Commands::Config => {
            print_config(&config)?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match dispatch(cli).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
