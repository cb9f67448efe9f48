//! Config command - show configuration.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::{config_path, database_path, load_config};
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    /// What to show.
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands.
#[derive(Subcommand, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the configuration and database paths.
    Path,
}

/// Runs the config command.
pub fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let mut config = load_config(cli)?;
            if let Some(token) = config.fetch.request.access_token.as_mut() {
                *token = "***".to_string();
            }
            // Always JSON, the file format itself.
            println!("{}", JsonFormatter::new(true).format(&config)?);
        }
        ConfigAction::Path => {
            let config = load_config(cli)?;
            let path = config_path(cli);
            let database = database_path(cli, &config);
            match cli.format {
                OutputFormat::Text => {
                    println!("config   {}", path.display());
                    println!("database {}", database.display());
                }
                OutputFormat::Json => {
                    let paths = serde_json::json!({
                        "config": path.display().to_string(),
                        "database": database.display().to_string(),
                    });
                    println!("{}", JsonFormatter::new(cli.pretty).format(&paths)?);
                }
            }
        }
    }
    Ok(())
}
