// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! PageTree CLI - crawl paginated JSON APIs into a node tree.
//!
//! # Examples
//!
//! ```bash
//! # Create the database and a default configuration
//! pagetree init
//!
//! # Add seed nodes
//! pagetree seed cocacola pepsi
//!
//! # Fetch posts for two seeds with the Facebook module
//! pagetree fetch 1 2 --module facebook --resource "<Object ID>/posts" --token EAAB...
//!
//! # Resume an interrupted run from a saved preset
//! pagetree fetch 1 2 --preset posts.json --resume
//!
//! # Show the tree with some columns
//! pagetree tree --columns "message,created_time"
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{config, delete, extract, fetch, init, modules, seed, tree};

// ============================================================================
// CLI Definition
// ============================================================================

/// PageTree CLI - crawl paginated JSON APIs into a node tree.
#[derive(Parser)]
#[command(name = "pagetree")]
#[command(about = "Concurrent, resumable crawler for paginated JSON APIs")]
#[command(long_about = r#"
PageTree fetches data from paginated JSON APIs and stores every response
as a node in a tree kept in a SQLite database. Seeds are the roots; each
fetched page adds children below the node it was requested for.

Built-in modules:
  • generic   any JSON API described by a request template
  • facebook  Graph API
  • twitter   API v2
  • youtube   Data API v3

Examples:
  pagetree seed cocacola                 # Add a seed node
  pagetree fetch 1 --module facebook     # Fetch it
  pagetree fetch 1 --resume              # Continue where it stopped
  pagetree tree --columns id,message     # Inspect the result
"#)]
#[command(version)]
#[command(author = "PageTree Contributors")]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Database file (defaults to the configured database).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and a default configuration file.
    Init(init::InitArgs),

    /// Add seed nodes.
    #[command(visible_alias = "s")]
    Seed(seed::SeedArgs),

    /// Fetch data for nodes.
    #[command(visible_alias = "f")]
    Fetch(fetch::FetchArgs),

    /// Turn a list inside node payloads into child nodes.
    #[command(visible_alias = "x")]
    Extract(extract::ExtractArgs),

    /// Show the node tree.
    #[command(visible_alias = "t")]
    Tree(tree::TreeArgs),

    /// Delete a node and everything below it.
    Delete(delete::DeleteArgs),

    /// List the built-in API modules.
    #[command(visible_alias = "m")]
    Modules,

    /// Show configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// The fetch run aborted after too many consecutive errors.
    Aborted = 2,
    /// The fetch run was cancelled.
    Cancelled = 3,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("pagetree=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagetree=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Init(args) => init::run(args, &cli).await.map(|()| ExitCode::Success),
        Commands::Seed(args) => seed::run(args, &cli).map(|()| ExitCode::Success),
        Commands::Fetch(args) => fetch::run(args, &cli).await,
        Commands::Extract(args) => extract::run(args, &cli).map(|()| ExitCode::Success),
        Commands::Tree(args) => tree::run(args, &cli).map(|()| ExitCode::Success),
        Commands::Delete(args) => delete::run(args, &cli).map(|()| ExitCode::Success),
        Commands::Modules => modules::run(&cli).map(|()| ExitCode::Success),
        Commands::Config(args) => config::run(args, &cli).map(|()| ExitCode::Success),
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    }
}
