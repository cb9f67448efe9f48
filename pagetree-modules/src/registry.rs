//! Module registry.
//!
//! The registry provides static access to every built-in module and is the
//! single place the command line and the scheduler look modules up.

use pagetree_fetch::ApiModule;
use std::sync::{Arc, OnceLock};

use crate::descriptor::ModuleDescriptor;
use crate::facebook::facebook_descriptor;
use crate::generic::generic_descriptor;
use crate::twitter::twitter_descriptor;
use crate::youtube::youtube_descriptor;

// ============================================================================
// Static Registry
// ============================================================================

/// Static storage for all module descriptors.
static DESCRIPTORS: OnceLock<Vec<ModuleDescriptor>> = OnceLock::new();

/// Static storage for the module instances.
static MODULES: OnceLock<Vec<Arc<dyn ApiModule>>> = OnceLock::new();

/// Generic first, then the dedicated APIs alphabetically.
fn init_descriptors() -> Vec<ModuleDescriptor> {
    vec![
        generic_descriptor(),
        facebook_descriptor(),
        twitter_descriptor(),
        youtube_descriptor(),
    ]
}

// ============================================================================
// Module Registry
// ============================================================================

/// Global registry of the built-in modules.
pub struct ModuleRegistry;

impl ModuleRegistry {
    /// Returns all module descriptors.
    pub fn all() -> &'static [ModuleDescriptor] {
        DESCRIPTORS.get_or_init(init_descriptors)
    }

    /// Gets a descriptor by name tag.
    pub fn get(name: &str) -> Option<&'static ModuleDescriptor> {
        Self::all().iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Returns one shared instance of every module, ready for the scheduler.
    pub fn modules() -> Vec<Arc<dyn ApiModule>> {
        MODULES
            .get_or_init(|| Self::all().iter().map(ModuleDescriptor::module).collect())
            .clone()
    }

    /// Returns all name tags.
    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(|d| d.name).collect()
    }

    /// Returns the number of registered modules.
    pub fn count() -> usize {
        Self::all().len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_all_modules() {
        assert_eq!(ModuleRegistry::count(), 4);
        assert_eq!(
            ModuleRegistry::names(),
            vec!["generic", "facebook", "twitter", "youtube"]
        );
    }

    #[test]
    fn test_descriptor_names_match_modules() {
        for descriptor in ModuleRegistry::all() {
            assert_eq!(descriptor.module().name(), descriptor.name);
        }
        let names: Vec<_> = ModuleRegistry::modules()
            .iter()
            .map(|m| m.name().to_string())
            .collect();
        assert_eq!(names, ModuleRegistry::names());
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(ModuleRegistry::get("YouTube").map(|d| d.name), Some("youtube"));
        assert!(ModuleRegistry::get("myspace").is_none());
    }

    #[test]
    fn test_credentials() {
        let generic = ModuleRegistry::get("generic").unwrap();
        assert!(!generic.credential.is_required());
        for name in ["facebook", "twitter", "youtube"] {
            assert!(ModuleRegistry::get(name).unwrap().credential.is_required());
        }
    }
}
