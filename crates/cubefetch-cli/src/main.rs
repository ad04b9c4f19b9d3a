//! cubefetch CLI - Batched lookups against a SPARQL endpoint
//!
//! Reads a list of IRIs, splits it into batches, runs a templated query per
//! batch and prints the combined rows.
//!
//! # Usage
//!
//! ```bash
//! # Fetch labels for every cube listed in cubes.txt
//! cubefetch fetch --template labels.rq --input cubes.txt --var cube
//!
//! # Same, against another endpoint, as JSON
//! cubefetch --endpoint https://example.org/sparql fetch -t labels.rq -i cubes.txt --json
//!
//! # Show the effective configuration
//! cubefetch config show
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use cubefetch_config::{LogFormat, LoggingConfig, QueryOperation};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

/// cubefetch - Batched, cached SPARQL lookups
#[derive(Parser, Debug)]
#[command(name = "cubefetch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOptions,
}

/// Global options available to all commands
#[derive(Args, Debug, Clone)]
struct GlobalOptions {
    /// Directory whose .cubefetch/config.toml is used as local config
    #[arg(long, short = 'C', global = true, env = "CUBEFETCH_DIR")]
    dir: Option<PathBuf>,

    /// Path to a configuration file (replaces global and local config)
    #[arg(long, short = 'c', global = true, env = "CUBEFETCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// SPARQL endpoint URL
    #[arg(long, short = 'e', global = true, env = "CUBEFETCH_ENDPOINT")]
    endpoint: Option<String>,

    /// Protocol operation (get, post-urlencoded, post-direct)
    #[arg(long, global = true, value_parser = parse_operation)]
    operation: Option<QueryOperation>,
}

/// Parse a protocol operation from string
fn parse_operation(s: &str) -> Result<QueryOperation, String> {
    s.parse()
        .map_err(|e: cubefetch_config::ConfigError| e.to_string())
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> cubefetch_config::ConfigOverrides {
        cubefetch_config::ConfigOverrides {
            endpoint_url: self.endpoint.clone(),
            operation: self.operation,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a query template over a list of IRIs in batches
    Fetch(commands::fetch::FetchArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

/// Install the global subscriber.
///
/// `--quiet`/`--verbose` win, then `RUST_LOG`, then `logging.level`.
fn init_tracing(global: &GlobalOptions, logging: &LoggingConfig) -> Result<()> {
    let filter = if global.quiet {
        EnvFilter::new("error")
    } else if global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        }
        LogFormat::Text => {
            let subscriber = builder
                .with_ansi(std::io::stderr().is_terminal())
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging falls back to defaults here. `config path` and `config init`
    // must still run over a malformed file, and `fetch` reloads with its own
    // flag overrides, so each command reports load errors itself.
    let logging = commands::load_config(&cli.global)
        .map(|config| config.logging)
        .unwrap_or_default();
    init_tracing(&cli.global, &logging)?;

    // Execute the command
    match cli.command {
        Commands::Fetch(args) => commands::fetch::execute(args, cli.global).await,
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global).await,
    }
}
