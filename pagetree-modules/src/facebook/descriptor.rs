//! Facebook module descriptor.

use pagetree_core::RequestSettings;
use pagetree_fetch::ApiModule;
use std::sync::Arc;

use super::module::{FacebookModule, ENDPOINT};
use crate::descriptor::{Credential, ModuleDescriptor};

/// Descriptor of the Facebook Graph API module.
pub fn facebook_descriptor() -> ModuleDescriptor {
    ModuleDescriptor {
        name: FacebookModule::NAME,
        display_name: "Facebook",
        description: "Facebook Graph API, paged by paging.next",
        credential: Credential::QueryParam("access_token"),
        docs_url: Some("https://developers.facebook.com/docs/graph-api"),
        defaults: facebook_defaults,
        build: build_facebook,
    }
}

fn facebook_defaults() -> RequestSettings {
    RequestSettings::new(ENDPOINT.base_path, "<Object ID>/posts")
        .with_param("limit", "100")
        .with_nodes_key("data")
        .with_object_id_key("id")
}

fn build_facebook() -> Arc<dyn ApiModule> {
    Arc::new(FacebookModule)
}
