//! Twitter module descriptor.

use pagetree_core::RequestSettings;
use pagetree_fetch::ApiModule;
use std::sync::Arc;

use super::module::{TwitterModule, ENDPOINT};
use crate::descriptor::{Credential, ModuleDescriptor};

/// Descriptor of the Twitter API v2 module.
pub fn twitter_descriptor() -> ModuleDescriptor {
    ModuleDescriptor {
        name: TwitterModule::NAME,
        display_name: "Twitter",
        description: "Twitter API v2, paged by meta.next_token",
        credential: Credential::BearerToken,
        docs_url: Some("https://developer.twitter.com/en/docs/twitter-api"),
        defaults: twitter_defaults,
        build: build_twitter,
    }
}

fn twitter_defaults() -> RequestSettings {
    RequestSettings::new(ENDPOINT.base_path, ENDPOINT.resource)
        .with_param("max_results", "100")
        .with_param("tweet.fields", "created_at,public_metrics")
}

fn build_twitter() -> Arc<dyn ApiModule> {
    Arc::new(TwitterModule)
}
