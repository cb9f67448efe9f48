//! Extract command - split a list inside node payloads into children.

use anyhow::Result;
use clap::Args;
use pagetree_core::NodeId;
use pagetree_store::{unpack_list, TreeStore};
use tracing::{info, warn};

use super::{load_config, open_store};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Nodes whose payload holds the list.
    #[arg(required = true)]
    pub nodes: Vec<NodeId>,

    /// Key path of the list, e.g. `comments.data`.
    #[arg(long, short)]
    pub key: String,

    /// Key path of the object id inside each element.
    #[arg(long)]
    pub id_key: Option<String>,
}

/// Runs the extract command.
pub fn run(args: &ExtractArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(cli, &config)?;

    let created = match unpack_all(&store, args) {
        Ok(created) => created,
        Err(e) => {
            let dropped = store.rollback_new_nodes()?;
            warn!(dropped, "Extraction failed, nothing was written");
            return Err(e);
        }
    };
    let committed = store.commit_new_nodes()?;
    info!(committed, "Extracted nodes");

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            for node in &created {
                println!("{}", formatter.format_node(node, 0, &[]));
            }
            if !cli.quiet {
                println!("Extracted {committed} nodes");
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_nodes(&created, &[])?);
        }
    }
    Ok(())
}

fn unpack_all(store: &TreeStore, args: &ExtractArgs) -> Result<Vec<pagetree_core::Node>> {
    let mut created = Vec::new();
    for &node_id in &args.nodes {
        let nodes = unpack_list(store, node_id, &args.key, args.id_key.as_deref(), true)?;
        if nodes.is_empty() {
            warn!(node_id, key = %args.key, "No list found");
        }
        created.extend(nodes);
    }
    Ok(created)
}
