// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # PageTree Modules
//!
//! Built-in [`ApiModule`](pagetree_fetch::ApiModule) implementations.
//!
//! Each module directory includes:
//!
//! - **Descriptor**: Static facts (display name, credential, default template)
//! - **Module**: Request building and response parsing
//!
//! ## Supported APIs
//!
//! | Module | Children | Continuation | Credential |
//! |--------|----------|--------------|------------|
//! | `generic` | nodes key | key, url or count paging | optional bearer token |
//! | `facebook` | `data` | `paging.next` | `access_token` |
//! | `twitter` | `data` | `meta.next_token` | bearer token |
//! | `youtube` | `items` | `nextPageToken` | `key` |
//!
//! ## Usage
//!
//! ```ignore
//! use pagetree_modules::ModuleRegistry;
//!
//! let scheduler = FetchScheduler::new(store, transport, ModuleRegistry::modules());
//! let settings = ModuleRegistry::get("youtube").unwrap().default_settings();
//! ```

pub mod descriptor;
pub mod error;
pub mod payload;
pub mod registry;
pub mod template;

// Modules (alphabetical)
pub mod facebook;
pub mod generic;
pub mod twitter;
pub mod youtube;

// Re-export key types
pub use descriptor::{Credential, ModuleDescriptor};
pub use error::ModuleError;
pub use registry::ModuleRegistry;

pub use facebook::FacebookModule;
pub use generic::GenericModule;
pub use twitter::TwitterModule;
pub use youtube::YoutubeModule;
