//! Fetch command - run the fetch engine over selected nodes.

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use pagetree_core::{FetchOptions, HttpMethod, LogVerbosity, NodeId, Paging, RunState};
use pagetree_fetch::{FetchScheduler, HttpClient, HttpTransport, RunEvent};
use pagetree_modules::ModuleRegistry;
use pagetree_store::{load_preset, save_preset, AppConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{load_config, open_store};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the fetch command.
#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct FetchArgs {
    /// Nodes to fetch (defaults to every root node).
    pub nodes: Vec<NodeId>,

    /// Load fetch options from a preset file.
    #[arg(long)]
    pub preset: Option<PathBuf>,

    /// Save the effective options as a preset before running.
    #[arg(long)]
    pub save_preset: Option<PathBuf>,

    /// API module (generic, facebook, twitter, youtube).
    #[arg(long, short)]
    pub module: Option<String>,

    /// Base URL of the API.
    #[arg(long)]
    pub base_path: Option<String>,

    /// Resource path, may contain placeholders like <Object ID>.
    #[arg(long)]
    pub resource: Option<String>,

    /// Query parameter as NAME=VALUE (repeatable).
    #[arg(long = "param", short = 'p', value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Request header as NAME=VALUE (repeatable).
    #[arg(long = "header", value_parser = parse_key_value)]
    pub headers: Vec<(String, String)>,

    /// HTTP method.
    #[arg(long, value_parser = parse_method)]
    pub method: Option<HttpMethod>,

    /// JSON body for non-GET requests.
    #[arg(long)]
    pub payload: Option<String>,

    /// Key path of the list to split into child nodes.
    #[arg(long)]
    pub nodes_key: Option<String>,

    /// Key path of the object id inside each child.
    #[arg(long)]
    pub id_key: Option<String>,

    /// Paging rule: none, key:PARAM:KEY, url:KEY or count:PARAM:START:STEP.
    #[arg(long, value_parser = parse_paging)]
    pub paging: Option<Paging>,

    /// Access token or API key.
    #[arg(long)]
    pub token: Option<String>,

    /// Depth below the selected nodes to fetch (1 = the nodes themselves).
    #[arg(long)]
    pub level: Option<u32>,

    /// Fetch every node up to --level, not only the deepest ones.
    #[arg(long)]
    pub all_levels: bool,

    /// Object type to skip (repeatable).
    #[arg(long = "exclude")]
    pub excluded_types: Vec<String>,

    /// Continue interrupted pagination.
    #[arg(long)]
    pub resume: bool,

    /// Parallel workers.
    #[arg(long)]
    pub threads: Option<u32>,

    /// Requests per minute shared by all workers.
    #[arg(long)]
    pub rpm: Option<u32>,

    /// Abort after this many errors in a row.
    #[arg(long)]
    pub max_errors: Option<u32>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Add a `headers` child with the response headers of every page.
    #[arg(long)]
    pub capture_headers: bool,
}

// ============================================================================
// Argument Parsers
// ============================================================================

/// Parses `NAME=VALUE`.
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty name in '{s}'"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Parses an HTTP verb, case-insensitive.
pub fn parse_method(s: &str) -> Result<HttpMethod, String> {
    match s.trim().to_ascii_uppercase().as_str() {
        "GET" => Ok(HttpMethod::Get),
        "POST" => Ok(HttpMethod::Post),
        "PUT" => Ok(HttpMethod::Put),
        "PATCH" => Ok(HttpMethod::Patch),
        "DELETE" => Ok(HttpMethod::Delete),
        other => Err(format!("unknown HTTP method '{other}'")),
    }
}

/// Parses a paging rule.
pub fn parse_paging(s: &str) -> Result<Paging, String> {
    let parts: Vec<&str> = s.split(':').collect();
    let non_empty = |part: &str, what: &str| {
        if part.is_empty() {
            Err(format!("empty {what} in paging rule '{s}'"))
        } else {
            Ok(part.to_string())
        }
    };

    match parts.as_slice() {
        ["none"] => Ok(Paging::None),
        ["key", param, key] => Ok(Paging::Key {
            param: non_empty(param, "parameter")?,
            key: non_empty(key, "key")?,
        }),
        ["url", key] => Ok(Paging::Url {
            key: non_empty(key, "key")?,
        }),
        ["count", param, start, step] => Ok(Paging::Count {
            param: non_empty(param, "parameter")?,
            start: start
                .parse()
                .map_err(|_| format!("invalid start offset '{start}'"))?,
            step: step.parse().map_err(|_| format!("invalid step '{step}'"))?,
        }),
        _ => Err(format!(
            "expected none, key:PARAM:KEY, url:KEY or count:PARAM:START:STEP, got '{s}'"
        )),
    }
}

// ============================================================================
// Options
// ============================================================================

async fn base_options(args: &FetchArgs, config: &AppConfig) -> Result<FetchOptions> {
    let mut options = match &args.preset {
        Some(path) => load_preset(path)
            .await
            .with_context(|| format!("loading preset {}", path.display()))?,
        None => config.fetch.clone(),
    };

    match &args.module {
        Some(name) => {
            let descriptor = ModuleRegistry::get(name).ok_or_else(|| {
                anyhow!(
                    "Unknown module '{name}' (available: {})",
                    ModuleRegistry::names().join(", ")
                )
            })?;
            if args.preset.is_none() || descriptor.name != options.module {
                options.request = descriptor.default_settings();
            }
            options.module = descriptor.name.to_string();
        }
        None if args.preset.is_none() => {
            if let Some(descriptor) = ModuleRegistry::get(&options.module) {
                if options.request == Default::default() {
                    options.request = descriptor.default_settings();
                }
            }
        }
        None => {}
    }

    Ok(options)
}

/// Applies command-line overrides on top of preset or configured options.
pub fn apply_overrides(args: &FetchArgs, cli: &Cli, options: &mut FetchOptions) -> Result<()> {
    let request = &mut options.request;
    if let Some(base_path) = &args.base_path {
        request.base_path.clone_from(base_path);
    }
    if let Some(resource) = &args.resource {
        request.resource.clone_from(resource);
    }
    for (name, value) in &args.params {
        request.params.insert(name.clone(), value.clone());
    }
    for (name, value) in &args.headers {
        request.headers.insert(name.clone(), value.clone());
    }
    if let Some(method) = args.method {
        request.method = method;
    }
    if let Some(payload) = &args.payload {
        request.payload =
            Some(serde_json::from_str(payload).context("--payload is not valid JSON")?);
    }
    if let Some(key) = &args.nodes_key {
        request.nodes_key = Some(key.clone());
    }
    if let Some(key) = &args.id_key {
        request.object_id_key = Some(key.clone());
    }
    if let Some(paging) = &args.paging {
        request.paging = paging.clone();
    }
    if let Some(token) = &args.token {
        request.access_token = Some(token.clone());
    }

    if let Some(level) = args.level {
        options.level_limit = level;
    }
    if args.all_levels {
        options.include_all_nodes = true;
    }
    options
        .excluded_types
        .extend(args.excluded_types.iter().cloned());
    if args.resume {
        options.resume = true;
    }
    if let Some(threads) = args.threads {
        options.threads = threads;
    }
    if let Some(rpm) = args.rpm {
        options.requests_per_minute = rpm;
    }
    if let Some(max) = args.max_errors {
        options.max_consecutive_errors = max;
    }
    if let Some(timeout) = args.timeout {
        options.timeout_secs = timeout;
    }
    if args.capture_headers {
        options.capture_headers = true;
    }

    if cli.quiet {
        options.verbosity = LogVerbosity::Quiet;
    } else if cli.verbose {
        options.verbosity = LogVerbosity::Verbose;
    }

    options.validate()?;
    Ok(())
}

// ============================================================================
// Run
// ============================================================================

/// Runs the fetch command.
pub async fn run(args: &FetchArgs, cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    let mut options = base_options(args, &config).await?;
    apply_overrides(args, cli, &mut options)?;

    if let Some(path) = &args.save_preset {
        save_preset(path, &options)
            .await
            .with_context(|| format!("saving preset {}", path.display()))?;
    }

    let store = Arc::new(open_store(cli, &config)?);
    let nodes = if args.nodes.is_empty() {
        store.roots()?.into_iter().map(|n| n.id).collect()
    } else {
        args.nodes.clone()
    };
    if nodes.is_empty() {
        bail!("Nothing to fetch, add seeds first");
    }

    let client = match &config.general.ca_bundle {
        Some(path) => HttpClient::with_ca_bundle(path)?,
        None => HttpClient::new()?,
    };
    let transport: Arc<dyn HttpTransport> = Arc::new(client);
    let scheduler = FetchScheduler::new(store, transport, ModuleRegistry::modules());

    info!(module = %options.module, nodes = nodes.len(), "Starting fetch");
    let mut events = scheduler.subscribe();
    let handle = scheduler.start(&nodes, options)?;

    let text = TextFormatter::new(!cli.no_color);
    let show_events = cli.format == OutputFormat::Text && !cli.quiet;
    let print_event = |event: &RunEvent| {
        if !show_events {
            return;
        }
        match event {
            RunEvent::Log { .. } => println!("{}", text.format_event(event)),
            RunEvent::Progress(_) if cli.verbose => println!("{}", text.format_event(event)),
            _ => {}
        }
    };

    let wait = handle.wait();
    tokio::pin!(wait);
    let mut cancelled = false;
    let (state, summary) = loop {
        tokio::select! {
            result = &mut wait => break result?,
            Some(event) = events.recv() => print_event(&event),
            signal = tokio::signal::ctrl_c(), if !cancelled => {
                if let Err(e) = signal {
                    debug!(error = %e, "Could not listen for Ctrl-C");
                }
                cancelled = true;
                warn!("Cancelling, waiting for in-flight requests");
                scheduler.cancel();
            }
        }
    };
    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    match cli.format {
        OutputFormat::Text => println!("{}", text.format_summary(state, &summary)),
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_summary(state, &summary)?);
        }
    }

    Ok(match state {
        RunState::Aborted { .. } => ExitCode::Aborted,
        RunState::Cancelled => ExitCode::Cancelled,
        _ => ExitCode::Success,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("limit=100").unwrap(),
            ("limit".to_string(), "100".to_string())
        );
        assert_eq!(
            parse_key_value("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_key_value("fields=").unwrap(),
            ("fields".to_string(), String::new())
        );
        assert!(parse_key_value("limit").is_err());
        assert!(parse_key_value("=1").is_err());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("post").unwrap(), HttpMethod::Post);
        assert_eq!(parse_method("GET").unwrap(), HttpMethod::Get);
        assert!(parse_method("FETCH").is_err());
    }

    #[test]
    fn test_parse_paging() {
        assert_eq!(parse_paging("none").unwrap(), Paging::None);
        assert_eq!(
            parse_paging("key:cursor:meta.next").unwrap(),
            Paging::Key {
                param: "cursor".into(),
                key: "meta.next".into()
            }
        );
        assert_eq!(
            parse_paging("url:paging.next").unwrap(),
            Paging::Url {
                key: "paging.next".into()
            }
        );
        assert_eq!(
            parse_paging("count:offset:0:25").unwrap(),
            Paging::Count {
                param: "offset".into(),
                start: 0,
                step: 25
            }
        );
        assert!(parse_paging("count:offset:x:25").is_err());
        assert!(parse_paging("key::next").is_err());
        assert!(parse_paging("cursor").is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "pagetree",
            "fetch",
            "1",
            "2",
            "--param",
            "limit=10",
            "--paging",
            "url:paging.next",
            "--threads",
            "4",
            "--level",
            "2",
            "--exclude",
            "comment",
            "--resume",
        ]);
        let crate::Commands::Fetch(args) = &cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.nodes, vec![1, 2]);

        let mut options = FetchOptions::default();
        apply_overrides(args, &cli, &mut options).unwrap();
        assert_eq!(options.request.params["limit"], "10");
        assert_eq!(options.threads, 4);
        assert_eq!(options.level_limit, 2);
        assert!(options.resume);
        assert!(options.is_excluded("comment"));
        assert!(options.is_excluded("offcut"));
        assert_eq!(options.verbosity, LogVerbosity::Normal);
    }

    #[test]
    fn test_overrides_reject_invalid_options() {
        let cli = Cli::parse_from(["pagetree", "fetch", "--threads", "0"]);
        let crate::Commands::Fetch(args) = &cli.command else {
            panic!("expected fetch");
        };
        let mut options = FetchOptions::default();
        assert!(apply_overrides(args, &cli, &mut options).is_err());
    }
}
