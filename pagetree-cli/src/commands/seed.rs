//! Seed command - add root nodes.

use anyhow::{bail, Result};
use clap::Args;
use pagetree_core::{object_type, ChildDescriptor, NodeId};
use serde_json::Value;
use tracing::info;

use super::{load_config, open_store};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the seed command.
#[derive(Args)]
pub struct SeedArgs {
    /// Object ids of the new seed nodes.
    #[arg(required = true)]
    pub object_ids: Vec<String>,

    /// Add the nodes below an existing node instead of as roots.
    #[arg(long)]
    pub parent: Option<NodeId>,
}

/// Runs the seed command.
pub fn run(args: &SeedArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(cli, &config)?;

    let object_ids: Vec<&str> = args
        .object_ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();
    if object_ids.is_empty() {
        bail!("No object ids given");
    }

    let descriptors = object_ids.iter().map(|id| {
        ChildDescriptor::new(object_type::SEED, Value::Null).with_object_id(Some((*id).to_string()))
    });
    let nodes = match args.parent {
        Some(parent) => store.create_nodes(parent, descriptors.collect())?,
        None => descriptors
            .map(|descriptor| store.create_node(None, descriptor))
            .collect::<Result<Vec<_>, _>>()?,
    };
    info!(count = nodes.len(), "Seeds added");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            for node in &nodes {
                println!("{}", formatter.format_node(node, 0, &[]));
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_nodes(&nodes, &[])?);
        }
    }

    Ok(())
}
