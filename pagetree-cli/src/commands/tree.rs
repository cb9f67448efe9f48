//! Tree command - show stored nodes.

use anyhow::Result;
use clap::Args;
use pagetree_core::{parse_columns, Node, NodeId};
use pagetree_store::TreeStore;

use super::{load_config, open_store};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the tree command.
#[derive(Args)]
pub struct TreeArgs {
    /// Show only this node and its descendants.
    pub root: Option<NodeId>,

    /// Maximum depth below the starting nodes.
    #[arg(long, short)]
    pub depth: Option<u32>,

    /// Payload columns to show, comma separated key paths.
    #[arg(long, short)]
    pub columns: Option<String>,
}

/// Runs the tree command.
pub fn run(args: &TreeArgs, cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(cli, &config)?;
    let columns = args.columns.as_deref().map(parse_columns).unwrap_or_default();

    let starts = match args.root {
        Some(id) => vec![store.get_node(id)?],
        None => store.roots()?,
    };
    let mut rows = Vec::new();
    for node in starts {
        collect(&store, node, 0, args.depth, &mut rows)?;
    }

    match cli.format {
        OutputFormat::Text => {
            if rows.is_empty() {
                println!("No nodes");
                return Ok(());
            }
            let formatter = TextFormatter::new(!cli.no_color);
            for (node, depth) in &rows {
                println!("{}", formatter.format_node(node, *depth, &columns));
            }
        }
        OutputFormat::Json => {
            let nodes: Vec<Node> = rows.into_iter().map(|(node, _)| node).collect();
            println!("{}", JsonFormatter::new(cli.pretty).format_nodes(&nodes, &columns)?);
        }
    }
    Ok(())
}

/// Depth-first walk in sibling order.
fn collect(
    store: &TreeStore,
    node: Node,
    depth: u32,
    max_depth: Option<u32>,
    rows: &mut Vec<(Node, u32)>,
) -> Result<()> {
    let expand = node.has_children() && max_depth.is_none_or(|max| depth < max);
    let id = node.id;
    rows.push((node, depth));
    if expand {
        for child in store.children_of(id)? {
            collect(store, child, depth + 1, max_depth, rows)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagetree_core::{object_type, ChildDescriptor};
    use serde_json::{json, Value};

    fn sample() -> (TreeStore, NodeId) {
        let store = TreeStore::open_in_memory().unwrap();
        let root = store
            .create_node(None, ChildDescriptor::new(object_type::SEED, Value::Null))
            .unwrap();
        let children = store
            .create_nodes(
                root.id,
                vec![
                    ChildDescriptor::new(object_type::DATA, json!({"n": 1})),
                    ChildDescriptor::new(object_type::DATA, json!({"n": 2})),
                ],
            )
            .unwrap();
        store
            .create_nodes(
                children[0].id,
                vec![ChildDescriptor::new(object_type::DATA, json!({"n": 3}))],
            )
            .unwrap();
        (store, root.id)
    }

    #[test]
    fn test_collect_depth_first() {
        let (store, root) = sample();
        let mut rows = Vec::new();
        collect(&store, store.get_node(root).unwrap(), 0, None, &mut rows).unwrap();

        let shape: Vec<_> = rows
            .iter()
            .map(|(node, depth)| (node.response.as_ref().map(|r| r["n"].clone()), *depth))
            .collect();
        assert_eq!(
            shape,
            vec![
                (None, 0),
                (Some(json!(1)), 1),
                (Some(json!(3)), 2),
                (Some(json!(2)), 1),
            ]
        );
    }

    #[test]
    fn test_collect_depth_limit() {
        let (store, root) = sample();
        let mut rows = Vec::new();
        collect(&store, store.get_node(root).unwrap(), 0, Some(1), &mut rows).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(_, depth)| *depth <= 1));
    }
}
