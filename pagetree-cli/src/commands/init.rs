//! Init command - create the database and configuration.

use anyhow::Result;
use clap::Args;
use pagetree_store::{default_preset_dir, SCHEMA_VERSION};
use tracing::info;

use super::{config_path, database_path, load_config, open_store};
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file with defaults.
    #[arg(long)]
    pub force: bool,
}

/// Runs the init command.
pub async fn run(args: &InitArgs, cli: &Cli) -> Result<()> {
    let path = config_path(cli);
    let config = if args.force {
        pagetree_store::AppConfig::default()
    } else {
        load_config(cli)?
    };

    let wrote_config = args.force || !path.exists();
    if wrote_config {
        config.save_to(&path)?;
    }

    let store = open_store(cli, &config)?;
    let nodes = store.count()?;
    let database = database_path(cli, &config);

    let presets = default_preset_dir();
    tokio::fs::create_dir_all(&presets).await?;
    info!(database = %database.display(), nodes, "Workspace ready");

    match cli.format {
        OutputFormat::Text => {
            if wrote_config {
                println!("Wrote configuration to {}", path.display());
            }
            println!(
                "Database {} (schema v{SCHEMA_VERSION}, {nodes} nodes)",
                database.display()
            );
            println!("Presets in {}", presets.display());
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "config": path.display().to_string(),
                "config_written": wrote_config,
                "database": database.display().to_string(),
                "schema_version": SCHEMA_VERSION,
                "nodes": nodes,
                "presets": presets.display().to_string(),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&summary)?);
        }
    }

    Ok(())
}
