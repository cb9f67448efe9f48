// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # PageTree Fetch
//!
//! The fetch engine of PageTree: a pool of workers that walks a selection
//! of tree nodes, sends one request per page through an [`ApiModule`],
//! follows continuation tokens and writes every page back to the tree.
//!
//! ## Building Blocks
//!
//! - [`module::ApiModule`] - Turns nodes into requests and responses into children
//! - [`transport::HttpTransport`] - Sends requests ([`host::http::HttpClient`] in production)
//! - [`rate_limit::RateLimiter`] - Token bucket shared by all workers
//! - [`queue::WorkQueue`] - Job queue with per-node in-flight tracking
//! - [`events::EventBus`] - Fan-out of log, progress and expand events
//! - [`scheduler::FetchScheduler`] - Ties it all together
//!
//! ## Example
//!
//! ```ignore
//! use pagetree_fetch::{FetchScheduler, HttpClient};
//!
//! let scheduler = FetchScheduler::new(store, Arc::new(HttpClient::new()?), modules);
//! let mut events = scheduler.subscribe();
//! let handle = scheduler.start(&[seed_id], options)?;
//! let (state, summary) = handle.wait().await?;
//! ```

pub mod error;
pub mod events;
pub mod host;
pub mod module;
pub mod queue;
pub mod rate_limit;
pub mod scheduler;
pub mod transport;


// Errors
pub use error::FetchError;

// Module interface
pub use module::{default_supports_resume, ApiModule, ApiRequest, ParsedPage, RawResponse};

// Engine
pub use events::{EventBus, RunEvent};
pub use queue::WorkQueue;
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use scheduler::{FetchScheduler, RunHandle};

// Transport
pub use host::http::HttpClient;
pub use transport::HttpTransport;
