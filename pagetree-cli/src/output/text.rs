//! Text output formatting with colors.

use pagetree_core::{project_columns, FetchStatus, LogLevel, Node, RunState, RunSummary};
use pagetree_fetch::RunEvent;
use pagetree_modules::ModuleDescriptor;

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    indent: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            indent: 2,
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Formats one tree row: `#id type object-id status [columns]`.
    pub fn format_node(&self, node: &Node, depth: u32, columns: &[String]) -> String {
        let indent = " ".repeat(depth as usize * self.indent);
        let object_id = node.object_id.as_deref().unwrap_or("-");

        let mut line = format!(
            "{indent}{} {} {} {}",
            self.dim(&format!("#{}", node.id)),
            self.cyan(&node.object_type),
            self.bold(object_id),
            self.format_status(node.status)
        );
        if node.child_count > 0 {
            line.push_str(&self.dim(&format!(" ({} children)", node.child_count)));
        }
        if node.continuation.is_some() {
            line.push_str(&self.yellow(" [more]"));
        }
        if let Some(error) = &node.error {
            line.push_str(&format!(" {}", self.red(error)));
        }

        if !columns.is_empty() {
            let payload = node.response.clone().unwrap_or_default();
            let cells = project_columns(&payload, columns);
            line.push_str(&format!("  {}", cells.join(" | ")));
        }
        line
    }

    /// Formats a fetch status with its color.
    pub fn format_status(&self, status: FetchStatus) -> String {
        let text = status.to_string();
        match status {
            FetchStatus::Fetched(_) => self.green(&text),
            FetchStatus::FetchedEmpty | FetchStatus::Skipped => self.yellow(&text),
            FetchStatus::Error(_) => self.red(&text),
            FetchStatus::Fetching => self.cyan(&text),
            FetchStatus::Unfetched => self.dim(&text),
        }
    }

    // ========================================================================
    // Runs
    // ========================================================================

    /// Formats a run event.
    pub fn format_event(&self, event: &RunEvent) -> String {
        match event {
            RunEvent::Log { level, .. } => {
                let line = event.to_string();
                match level {
                    LogLevel::Error => self.red(&line),
                    LogLevel::Warn => self.yellow(&line),
                    LogLevel::Info => line,
                    LogLevel::Debug => self.dim(&line),
                }
            }
            _ => self.dim(&event.to_string()),
        }
    }

    /// Formats the end-of-run summary.
    pub fn format_summary(&self, state: RunState, summary: &RunSummary) -> String {
        let state_text = state.to_string();
        let state_text = match state {
            RunState::Completed if summary.nodes_errored == 0 => self.green(&state_text),
            RunState::Completed | RunState::Cancelled => self.yellow(&state_text),
            RunState::Aborted { .. } => self.red(&state_text),
            RunState::Idle | RunState::Running => state_text,
        };
        format!("{} {state_text}: {summary}", self.bold("Fetch"))
    }

    // ========================================================================
    // Modules
    // ========================================================================

    /// Formats a module line, with the default request template when verbose.
    pub fn format_module(&self, descriptor: &ModuleDescriptor, verbose: bool) -> String {
        let credential = if descriptor.credential.is_required() {
            self.yellow(&descriptor.credential.to_string())
        } else {
            self.dim("no credential")
        };
        let mut lines = vec![format!(
            "{:<10} {:<28} {credential}",
            self.bold(descriptor.name),
            descriptor.display_name,
        )];

        if verbose {
            lines.push(format!("  {}", descriptor.description));
            let defaults = descriptor.default_settings();
            if !defaults.base_path.is_empty() || !defaults.resource.is_empty() {
                lines.push(format!(
                    "  {} {}/{}",
                    self.dim("template"),
                    defaults.base_path,
                    defaults.resource
                ));
            }
            if let Some(url) = descriptor.docs_url {
                lines.push(format!("  {} {url}", self.dim("docs")));
            }
        }
        lines.join("\n")
    }

    // ========================================================================
    // Colors
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}
