//! Delete command - remove a subtree.

use anyhow::Result;
use clap::Args;
use pagetree_core::NodeId;
use tracing::info;

use super::{load_config, open_store};
use crate::{Cli, OutputFormat};

/// Arguments for the delete command.
#[derive(Args)]
pub struct DeleteArgs {
    /// Nodes to delete, with all their descendants.
    #[arg(required = true)]
    pub node_ids: Vec<NodeId>,
}

/// Runs the delete command.
pub fn run(args: &DeleteArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(cli, &config)?;

    let mut deleted = 0;
    for &node_id in &args.node_ids {
        deleted += store.delete_node(node_id)?;
    }
    info!(deleted, "Nodes deleted");

    match cli.format {
        OutputFormat::Text => println!("Deleted {deleted} nodes"),
        OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": deleted })),
    }
    Ok(())
}
