//! YouTube module descriptor.

use pagetree_core::RequestSettings;
use pagetree_fetch::ApiModule;
use std::sync::Arc;

use super::module::{YoutubeModule, ENDPOINT};
use crate::descriptor::{Credential, ModuleDescriptor};

/// Descriptor of the YouTube Data API module.
pub fn youtube_descriptor() -> ModuleDescriptor {
    ModuleDescriptor {
        name: YoutubeModule::NAME,
        display_name: "YouTube",
        description: "YouTube Data API v3, paged by nextPageToken",
        credential: Credential::QueryParam("key"),
        docs_url: Some("https://developers.google.com/youtube/v3/docs"),
        defaults: youtube_defaults,
        build: build_youtube,
    }
}

fn youtube_defaults() -> RequestSettings {
    RequestSettings::new(ENDPOINT.base_path, ENDPOINT.resource)
        .with_param("part", "snippet")
        .with_param("channelId", "<Object ID>")
        .with_param("maxResults", "50")
        .with_param("type", "video")
}

fn build_youtube() -> Arc<dyn ApiModule> {
    Arc::new(YoutubeModule)
}
