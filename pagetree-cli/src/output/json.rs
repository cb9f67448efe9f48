//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use pagetree_core::{project_columns, FetchStatus, Node, NodeId, RunState, RunSummary};
use pagetree_modules::ModuleDescriptor;
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Output Types
// ============================================================================

/// JSON output for a node.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutput {
    pub id: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    pub level: u32,
    pub object_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    pub status: FetchStatus,
    pub child_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, String>,
}

impl NodeOutput {
    fn new(node: &Node, columns: &[String]) -> Self {
        let columns = if columns.is_empty() {
            BTreeMap::new()
        } else {
            let payload = node.response.clone().unwrap_or_default();
            columns
                .iter()
                .cloned()
                .zip(project_columns(&payload, columns))
                .collect()
        };
        Self {
            id: node.id,
            parent_id: node.parent_id,
            level: node.level,
            object_type: node.object_type.clone(),
            object_id: node.object_id.clone(),
            status: node.status,
            child_count: node.child_count,
            error: node.error.clone(),
            query_type: node.query_type.clone(),
            query_time: node.query_time,
            continuation: node.continuation.clone(),
            columns,
        }
    }
}

/// JSON output for a module.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOutput {
    pub name: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub credential: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<&'static str>,
}

/// JSON output for a finished run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    #[serde(flatten)]
    pub state: RunState,
    pub summary: RunSummary,
}

// ============================================================================
// Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }

    /// Formats nodes, projecting the given payload columns.
    pub fn format_nodes(&self, nodes: &[Node], columns: &[String]) -> Result<String> {
        let output: Vec<NodeOutput> = nodes.iter().map(|n| NodeOutput::new(n, columns)).collect();
        self.format(&output)
    }

    /// Formats module descriptors.
    pub fn format_modules(&self, descriptors: &[ModuleDescriptor]) -> Result<String> {
        let output: Vec<ModuleOutput> = descriptors
            .iter()
            .map(|d| ModuleOutput {
                name: d.name,
                display_name: d.display_name,
                description: d.description,
                credential: d.credential.to_string(),
                docs_url: d.docs_url,
            })
            .collect();
        self.format(&output)
    }

    /// Formats the end-of-run state and counters.
    pub fn format_summary(&self, state: RunState, summary: &RunSummary) -> Result<String> {
        self.format(&RunOutput {
            state,
            summary: *summary,
        })
    }
}
