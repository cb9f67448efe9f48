//! Generic module descriptor.

use pagetree_core::RequestSettings;
use pagetree_fetch::ApiModule;
use std::sync::Arc;

use super::module::GenericModule;
use crate::descriptor::{Credential, ModuleDescriptor};

/// Descriptor of the generic REST module.
pub fn generic_descriptor() -> ModuleDescriptor {
    ModuleDescriptor {
        name: GenericModule::NAME,
        display_name: "Generic",
        description: "Any JSON API described by a request template",
        credential: Credential::None,
        docs_url: None,
        defaults: generic_defaults,
        build: build_generic,
    }
}

fn generic_defaults() -> RequestSettings {
    RequestSettings::default().with_object_id_key("id")
}

fn build_generic() -> Arc<dyn ApiModule> {
    Arc::new(GenericModule)
}
