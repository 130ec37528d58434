//! Symcache CLI - Inspect and maintain resolution cache databases
//!
//! A command-line interface for operators of tools built on the resolution
//! engine: look at what a cache holds, audit it for corrupted entries, and
//! reset it after a bad host update.
//!
//! # Usage
//!
//! ```bash
//! # Show schema version, stored epoch and entry counts
//! symcache status
//!
//! # List cached descriptors
//! symcache list --namespace symbols
//!
//! # Audit entries and delete the bad ones
//! symcache check --purge
//!
//! # Drop cached descriptors but keep resource identifiers
//! symcache reset --symbols
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use symcache_config::{ConfigOverrides, LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

mod commands;

/// Symcache - Resolution cache maintenance
#[derive(Parser, Debug)]
#[command(name = "symcache")]
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
    /// Cache database file (default: from configuration under --root)
    #[arg(long, global = true, env = "SYMCACHE_DB")]
    db: Option<PathBuf>,

    /// Root directory the configured cache directory is relative to
    #[arg(long, short = 'r', global = true, env = "SYMCACHE_ROOT")]
    root: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true, env = "SYMCACHE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
}

impl GlobalOptions {
    /// Convert global options to config overrides
    pub fn to_config_overrides(&self) -> ConfigOverrides {
        let log_level = if self.quiet {
            Some("error".to_string())
        } else if self.verbose {
            Some("debug".to_string())
        } else {
            None
        };
        ConfigOverrides {
            log_level,
            ..Default::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show schema version, cache epoch and entry counts
    Status(commands::status::StatusArgs),

    /// List stored entries
    List(commands::list::ListArgs),

    /// Audit stored entries for corruption
    Check(commands::check::CheckArgs),

    /// Clear cached entries
    Reset(commands::reset::ResetArgs),

    /// View and manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),
}

/// Install the stderr subscriber.
///
/// Level precedence: `-v`/`-q`, then `RUST_LOG`, then `logging.level`.
fn init_tracing(global: &GlobalOptions, logging: &LoggingConfig) -> Result<()> {
    let filter = if global.verbose || global.quiet {
        EnvFilter::new(&logging.level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_ansi(true).try_init(),
    }
    .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {}", e))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file is reported by the command itself
    let logging = commands::resolve_root(&cli.global)
        .and_then(|root| commands::load_config(&cli.global, &root))
        .map(|config| config.logging)
        .unwrap_or_else(|_| {
            let mut logging = LoggingConfig::default();
            if let Some(level) = cli.global.to_config_overrides().log_level {
                logging.level = level;
            }
            logging
        });
    init_tracing(&cli.global, &logging)?;

    match cli.command {
        Commands::Status(args) => commands::status::execute(args, cli.global),
        Commands::List(args) => commands::list::execute(args, cli.global),
        Commands::Check(args) => commands::check::execute(args, cli.global),
        Commands::Reset(args) => commands::reset::execute(args, cli.global),
        Commands::Config(cmd) => commands::config::execute(cmd, cli.global),
    }
}
