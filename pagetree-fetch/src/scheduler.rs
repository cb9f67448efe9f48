//! Fetch scheduler and worker pool.
//!
//! A run turns a node selection into jobs, then `threads` workers take jobs
//! from a shared [`WorkQueue`], wait for the shared [`RateLimiter`], send
//! the request and write the parsed page back to the [`TreeStore`]. A page
//! that carries a continuation token puts the next page of the same node
//! back on the queue once its children are committed.
//!
//! ```text
//! Idle -> Running -> Completed | Cancelled | Aborted
//! ```
//!
//! Per-job failures are written to the node and never escape a worker.
//! Only the consecutive-error limit ends a run early. Cancellation and abort
//! are checked when a worker takes its next job; requests already in flight
//! finish normally.

use chrono::Utc;
use futures::FutureExt;
use pagetree_core::{
    object_type, ChildDescriptor, CoreError, FetchOptions, FetchStatus, Job, LogLevel,
    LogVerbosity, Node, NodeId, RunState, RunSummary, StatusUpdate,
};
use pagetree_store::{StoreError, TreeStore};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::FetchError;
use crate::events::{EventBus, RunEvent};
use crate::module::{ApiModule, ApiRequest};
use crate::queue::WorkQueue;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::transport::HttpTransport;

// ============================================================================
// Fetch Scheduler
// ============================================================================

/// Owns the modules and transport and runs one fetch at a time.
pub struct FetchScheduler {
    store: Arc<TreeStore>,
    transport: Arc<dyn HttpTransport>,
    modules: BTreeMap<String, Arc<dyn ApiModule>>,
    events: Arc<EventBus>,
    limiter: Arc<RateLimiter>,
    current: Mutex<Option<Arc<Run>>>,
}

impl FetchScheduler {
    /// Creates a scheduler. Modules are looked up by their name tag.
    pub fn new(
        store: Arc<TreeStore>,
        transport: Arc<dyn HttpTransport>,
        modules: Vec<Arc<dyn ApiModule>>,
    ) -> Self {
        let modules = modules
            .into_iter()
            .map(|m| (m.name().to_string(), m))
            .collect();
        Self {
            store,
            transport,
            modules,
            events: Arc::new(EventBus::new()),
            limiter: Arc::new(RateLimiter::per_minute(FetchOptions::default().requests_per_minute)),
            current: Mutex::new(None),
        }
    }

    /// Returns the registered module names.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    /// Registers an observer. Every subscriber receives every event.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<RunEvent> {
        self.events.subscribe()
    }

    /// Returns the state of the current (or last) run.
    pub fn state(&self) -> RunState {
        self.current_run().map_or(RunState::Idle, |run| run.state())
    }

    /// Returns the counters of the current (or last) run.
    pub fn summary(&self) -> RunSummary {
        self.current_run()
            .map(|run| run.counters.snapshot())
            .unwrap_or_default()
    }

    /// Asks the current run to stop. Calling it again, or with no run
    /// active, does nothing.
    pub fn cancel(&self) {
        if let Some(run) = self.current_run() {
            run.cancel();
        }
    }

    fn current_run(&self) -> Option<Arc<Run>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Starts a run over `selected` nodes.
    ///
    /// Validation happens before anything is spawned. Must be called from
    /// within a Tokio runtime.
    #[instrument(skip(self, selected, options), fields(module = %options.module, selected = selected.len()))]
    pub fn start(&self, selected: &[NodeId], options: FetchOptions) -> Result<RunHandle, FetchError> {
        options.validate().map_err(|e| match e {
            CoreError::InvalidOptions(message) => FetchError::InvalidOptions(message),
            other => FetchError::InvalidOptions(other.to_string()),
        })?;
        if selected.is_empty() {
            return Err(FetchError::InvalidOptions("no nodes selected".to_string()));
        }
        let module = self.modules.get(&options.module).cloned().ok_or_else(|| {
            FetchError::InvalidOptions(format!(
                "unknown module '{}' (registered: {})",
                options.module,
                self.module_names().join(", ")
            ))
        })?;

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|run| !run.state().is_terminal()) {
            return Err(FetchError::AlreadyRunning);
        }

        let options = Arc::new(options);
        let jobs = self.plan(module.as_ref(), selected, &options)?;
        let run = Arc::new(Run {
            store: Arc::clone(&self.store),
            transport: Arc::clone(&self.transport),
            module,
            limiter: Arc::clone(&self.limiter),
            events: Arc::clone(&self.events),
            queue: WorkQueue::new(jobs),
            counters: Counters::default(),
            state: Mutex::new(RunState::Running),
            cancelled: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
            abort_streak: AtomicU32::new(0),
            options,
        });
        *current = Some(Arc::clone(&run));
        drop(current);

        info!("Fetch run started");
        Ok(RunHandle {
            join: tokio::spawn(run.execute()),
        })
    }

    /// Expands the selection and decides which nodes get a job.
    fn plan(
        &self,
        module: &dyn ApiModule,
        selected: &[NodeId],
        options: &Arc<FetchOptions>,
    ) -> Result<Vec<Job>, FetchError> {
        let log = |level, message: String| emit_log(&self.events, options.verbosity, level, message);

        let mut seen = HashSet::new();
        let mut jobs = Vec::new();
        for node in self.expand_selection(selected, options)? {
            if !seen.insert(node.id) {
                continue;
            }
            if options.is_excluded(&node.object_type) {
                log(
                    LogLevel::Debug,
                    format!("Node {} has excluded type '{}'", node.id, node.object_type),
                );
                continue;
            }
            if !options.resume {
                jobs.push(Job::new(node.id, Arc::clone(options)));
                continue;
            }

            if let Some(token) = node.continuation.clone() {
                log(
                    LogLevel::Debug,
                    format!("Node {} resumes from a stored continuation", node.id),
                );
                jobs.push(Job::resume(node.id, token, Arc::clone(options)));
            } else if module.supports_resume(&node) {
                jobs.push(Job::new(node.id, Arc::clone(options)));
            } else {
                log(
                    LogLevel::Info,
                    format!("Node {} already fetched ({}), skipped", node.id, node.status),
                );
            }
        }

        debug!(jobs = jobs.len(), "Run planned");
        Ok(jobs)
    }

    /// Nodes at `level_limit` below each selected node (1 = the node
    /// itself), plus the levels in between with `include_all_nodes`.
    fn expand_selection(
        &self,
        selected: &[NodeId],
        options: &FetchOptions,
    ) -> Result<Vec<Node>, FetchError> {
        let depth = options.level_limit.saturating_sub(1);
        let mut nodes = Vec::new();

        for &id in selected {
            let root = match self.store.get_node(id) {
                Ok(node) => node,
                Err(StoreError::NotFound(_)) => {
                    emit_log(
                        &self.events,
                        options.verbosity,
                        LogLevel::Warn,
                        format!("Selected node {id} does not exist"),
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let mut frontier = vec![root];
            for level in 0..=depth {
                if level == depth || options.include_all_nodes {
                    nodes.extend(frontier.iter().cloned());
                }
                if level == depth {
                    break;
                }
                let mut next = Vec::new();
                for node in frontier.iter().filter(|n| n.has_children()) {
                    next.extend(self.store.children_of(node.id)?);
                }
                frontier = next;
            }
        }

        Ok(nodes)
    }
}

// ============================================================================
// Run Handle
// ============================================================================

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    join: JoinHandle<(RunState, RunSummary)>,
}

impl RunHandle {
    /// Waits for the run to end and returns its terminal state and counters.
    pub async fn wait(self) -> Result<(RunState, RunSummary), FetchError> {
        self.join
            .await
            .map_err(|e| FetchError::Panicked(e.to_string()))
    }
}

// ============================================================================
// Counters
// ============================================================================

#[derive(Debug, Default)]
struct Counters {
    processed: AtomicU64,
    succeeded: AtomicU64,
    errored: AtomicU64,
    consecutive_errors: AtomicU32,
    requests: AtomicU64,
    created: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> RunSummary {
        RunSummary {
            nodes_processed: self.processed.load(Ordering::SeqCst),
            nodes_succeeded: self.succeeded.load(Ordering::SeqCst),
            nodes_errored: self.errored.load(Ordering::SeqCst),
            consecutive_errors: self.consecutive_errors.load(Ordering::SeqCst),
            requests: self.requests.load(Ordering::SeqCst),
            nodes_created: self.created.load(Ordering::SeqCst),
        }
    }
}

// ============================================================================
// Run
// ============================================================================

/// What happened to one job.
#[derive(Debug, Clone, PartialEq)]
enum PageOutcome {
    /// The node was deleted before or during the job.
    Dropped,
    /// The page was recorded with `status`.
    Done {
        status: FetchStatus,
        next: Option<String>,
    },
}

impl PageOutcome {
    fn done(status: FetchStatus) -> Self {
        Self::Done { status, next: None }
    }
}

struct Run {
    store: Arc<TreeStore>,
    transport: Arc<dyn HttpTransport>,
    module: Arc<dyn ApiModule>,
    options: Arc<FetchOptions>,
    limiter: Arc<RateLimiter>,
    events: Arc<EventBus>,
    queue: WorkQueue,
    counters: Counters,
    state: Mutex<RunState>,
    cancelled: AtomicBool,
    aborted: AtomicBool,
    abort_streak: AtomicU32,
}

impl Run {
    fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: RunState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn log(&self, level: LogLevel, message: String) {
        emit_log(&self.events, self.options.verbosity, level, message);
    }

    fn cancel(&self) {
        if self.state().is_terminal() || self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.queue.stop();
        self.log(LogLevel::Info, "Cancelling, waiting for running requests".to_string());
    }

    fn abort(&self, streak: u32) {
        if self.cancelled.load(Ordering::SeqCst) || self.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.abort_streak.store(streak, Ordering::SeqCst);
        self.queue.stop();
        self.log(
            LogLevel::Error,
            format!("Aborting after {streak} consecutive errors"),
        );
    }

    fn final_state(&self) -> RunState {
        if self.aborted.load(Ordering::SeqCst) {
            RunState::Aborted {
                consecutive_errors: self.abort_streak.load(Ordering::SeqCst),
            }
        } else if self.cancelled.load(Ordering::SeqCst) {
            RunState::Cancelled
        } else {
            RunState::Completed
        }
    }

    async fn execute(self: Arc<Self>) -> (RunState, RunSummary) {
        self.limiter
            .reset(RateLimitConfig::per_minute(self.options.requests_per_minute))
            .await;
        self.log(
            LogLevel::Info,
            format!(
                "Fetching {} nodes with module '{}' on {} workers",
                self.queue.len().await,
                self.module.name(),
                self.options.threads
            ),
        );

        let workers: Vec<_> = (0..self.options.threads)
            .map(|worker_id| tokio::spawn(Arc::clone(&self).worker(worker_id)))
            .collect();
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = %e, "Worker task failed");
            }
        }

        let state = self.final_state();
        let summary = self.counters.snapshot();
        self.set_state(state);

        let level = match state {
            RunState::Aborted { .. } => LogLevel::Error,
            RunState::Cancelled => LogLevel::Warn,
            _ => LogLevel::Info,
        };
        self.log(level, format!("Fetch {state}: {summary}"));
        self.events.emit(&RunEvent::Finished { state, summary });
        (state, summary)
    }

    async fn worker(self: Arc<Self>, worker_id: u32) {
        debug!(worker_id, "Worker started");
        while let Some(job) = self.queue.pop().await {
            let outcome = match AssertUnwindSafe(self.process(&job)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => self.recover(&job, panic.as_ref()),
            };
            let next = self.record(&job, outcome);
            self.queue.finish(job.node_id, next).await;
            self.events.emit(&RunEvent::Progress(self.counters.snapshot()));
        }
        debug!(worker_id, "Worker stopped");
    }

    /// Updates counters and returns the continuation job, if any.
    fn record(&self, job: &Job, outcome: PageOutcome) -> Option<Job> {
        let PageOutcome::Done { status, next } = outcome else {
            return None;
        };

        if status.is_error() {
            self.counters.processed.fetch_add(1, Ordering::SeqCst);
            self.counters.errored.fetch_add(1, Ordering::SeqCst);
            let streak = self.counters.consecutive_errors.fetch_add(1, Ordering::SeqCst) + 1;
            if streak >= self.options.max_consecutive_errors {
                self.abort(streak);
            }
            return None;
        }

        if status.is_success() {
            self.counters.consecutive_errors.store(0, Ordering::SeqCst);
            if let Some(token) = next {
                return Some(job.next_page(token));
            }
            self.counters.succeeded.fetch_add(1, Ordering::SeqCst);
        }

        self.counters.processed.fetch_add(1, Ordering::SeqCst);
        None
    }

    /// Fetches one page for one node.
    #[instrument(level = "debug", skip(self, job), fields(node_id = job.node_id, page = job.page))]
    async fn process(&self, job: &Job) -> PageOutcome {
        let node = match self.store.mark_fetching(job.node_id) {
            Ok(node) => node,
            Err(StoreError::NotFound(id)) => return self.dropped(id),
            Err(e) => {
                self.log(LogLevel::Error, format!("Node {}: {e}", job.node_id));
                return PageOutcome::done(FetchStatus::Error(None));
            }
        };

        let settings = &self.options.request;
        let request = match self
            .module
            .build_request(&node, settings, job.continuation.as_deref())
        {
            Ok(request) => request,
            Err(FetchError::Unresolvable(reason)) => return self.skip(job, &reason),
            Err(e) => return self.fail(job, None, None, &e),
        };

        self.limiter.acquire().await;
        self.counters.requests.fetch_add(1, Ordering::SeqCst);

        let timeout = self.options.timeout();
        let response = match tokio::time::timeout(timeout, self.transport.execute(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return self.fail(job, Some(&request), e.http_code(), &e),
            Err(_) => {
                let e = FetchError::Timeout(self.options.timeout_secs);
                return self.fail(job, Some(&request), None, &e);
            }
        };

        if !response.is_success() {
            let e = FetchError::HttpStatus {
                code: response.status,
                message: response.excerpt(),
            };
            return self.fail(job, Some(&request), Some(response.status), &e);
        }

        let page = match self.module.parse_response(
            &node,
            settings,
            job.continuation.as_deref(),
            &response,
        ) {
            Ok(page) => page,
            Err(e) => return self.fail(job, Some(&request), Some(response.status), &e),
        };

        let mut children: Vec<_> = page
            .children
            .into_iter()
            .filter(|child| !self.options.is_excluded(&child.object_type))
            .collect();
        let data_children = children.len();
        if self.options.capture_headers && !self.options.is_excluded(object_type::HEADERS) {
            children.push(ChildDescriptor::new(
                object_type::HEADERS,
                response.headers_json(),
            ));
        }
        let created = match self.store.create_nodes(node.id, children) {
            Ok(created) => created.len(),
            Err(StoreError::NotFound(id)) => return self.dropped(id),
            Err(e) => {
                let e = FetchError::from_store(e);
                return self.fail(job, Some(&request), Some(response.status), &e);
            }
        };
        self.counters
            .created
            .fetch_add(created as u64, Ordering::SeqCst);

        let next = match page.continuation {
            Some(token) if job.continuation.as_deref() == Some(token.as_str()) => {
                self.log(
                    LogLevel::Warn,
                    format!("Node {}: server repeated the same page token, stopping", node.id),
                );
                None
            }
            other => other,
        };

        // Empty only when the node ends up with nothing below it.
        let status = if data_children == 0 && next.is_none() && !node.has_children() {
            FetchStatus::FetchedEmpty
        } else {
            FetchStatus::Fetched(response.status)
        };

        let mut update = StatusUpdate::status(status)
            .with_query_type(self.module.name())
            .with_query_params(request.snapshot())
            .with_continuation(next.clone());
        update.object_id = page.object_id;
        if self.options.capture_headers {
            update.headers = Some(response.headers_json());
        }
        match self.store.update_status(node.id, update) {
            Ok(_) => {}
            Err(StoreError::NotFound(id)) => return self.dropped(id),
            Err(e) => {
                self.log(LogLevel::Error, format!("Node {}: could not store status: {e}", node.id));
                return PageOutcome::done(FetchStatus::Error(None));
            }
        }

        self.log(
            LogLevel::Debug,
            format!(
                "Node {}: {status}, page {}, {created} new children",
                node.id, job.page
            ),
        );
        if created > 0 && self.options.auto_expand {
            self.events.emit(&RunEvent::Expand(node.id));
        }

        PageOutcome::Done { status, next }
    }

    fn skip(&self, job: &Job, reason: &str) -> PageOutcome {
        let update = StatusUpdate {
            status: FetchStatus::Skipped,
            error: Some(reason.to_string()),
            ..Default::default()
        }
        .with_query_type(self.module.name());

        if let Err(e) = self.store.update_status(job.node_id, update) {
            self.log(LogLevel::Error, format!("Node {}: could not store status: {e}", job.node_id));
        }
        self.log(LogLevel::Info, format!("Node {} skipped: {reason}", job.node_id));
        PageOutcome::done(FetchStatus::Skipped)
    }

    /// Records a failed page. The job's own continuation token stays on the
    /// node so a resumed run retries this page.
    fn fail(
        &self,
        job: &Job,
        request: Option<&ApiRequest>,
        code: Option<u16>,
        err: &FetchError,
    ) -> PageOutcome {
        let mut update = StatusUpdate::error(code, err.to_string())
            .with_query_type(self.module.name())
            .with_continuation(job.continuation.clone());
        update.query_params = request.map(ApiRequest::snapshot);

        match self.store.update_status(job.node_id, update) {
            Ok(_) => {}
            Err(StoreError::NotFound(id)) => return self.dropped(id),
            Err(e) => {
                self.log(LogLevel::Error, format!("Node {}: could not store error: {e}", job.node_id));
            }
        }
        self.log(LogLevel::Error, format!("Node {}: {err}", job.node_id));
        PageOutcome::done(FetchStatus::Error(code))
    }

    /// The node was deleted while its job ran. Not counted as an error.
    fn dropped(&self, node_id: NodeId) -> PageOutcome {
        self.log(LogLevel::Warn, format!("Node {node_id} no longer exists, job dropped"));
        PageOutcome::Dropped
    }

    fn recover(&self, job: &Job, panic: &(dyn Any + Send)) -> PageOutcome {
        let message = panic
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        warn!(node_id = job.node_id, %message, "Job panicked");
        self.fail(job, None, None, &FetchError::Panicked(message))
    }
}

/// Mirrors a run log line to tracing and, if the run's verbosity allows
/// it, to observers.
fn emit_log(events: &EventBus, verbosity: LogVerbosity, level: LogLevel, message: String) {
    match level {
        LogLevel::Debug => debug!("{message}"),
        LogLevel::Info => info!("{message}"),
        LogLevel::Warn => warn!("{message}"),
        LogLevel::Error => error!("{message}"),
    }
    if verbosity.allows(level) {
        events.emit(&RunEvent::Log {
            timestamp: Utc::now(),
            level,
            message,
        });
    }
}
