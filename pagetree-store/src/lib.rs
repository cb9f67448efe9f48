// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `PageTree` Store
//!
//! Persistence for the `PageTree` workspace.
//!
//! This crate provides:
//!
//! - **`TreeStore`**: the SQLite node tree, with per-node status updates,
//!   page-atomic child creation and delayed commit
//! - **`unpack_list`**: turning a list inside a stored payload into children
//! - **`AppConfig`**: the JSON configuration file
//! - **Persistence**: atomic JSON file helpers and fetch presets
//!
//! ## Usage
//!
//! ```ignore
//! use pagetree_core::{object_type, ChildDescriptor};
//! use pagetree_store::TreeStore;
//!
//! let store = TreeStore::open(&path)?;
//! let seed = store.create_node(
//!     None,
//!     ChildDescriptor::new(object_type::SEED, serde_json::Value::Null)
//!         .with_object_id(Some("facebook".to_string())),
//! )?;
//!
//! for child in store.children_of(seed.id)? {
//!     println!("{} {}", child.id, child.status);
//! }
//! ```

pub mod config;
pub mod error;
pub mod persistence;
pub mod schema;
pub mod tree_store;
pub mod unpack;

pub use config::{AppConfig, GeneralConfig};
pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_data_dir, default_preset_dir, load_json, load_json_or_default,
    load_preset, save_json, save_preset,
};
pub use schema::SCHEMA_VERSION;
pub use tree_store::TreeStore;
pub use unpack::unpack_list;

#[cfg(test)]
mod store_tests;
