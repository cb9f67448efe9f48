//! YouTube Data API v3 module.
//!
//! Authenticates with an API `key` query parameter. List endpoints return
//! their entries under `items` and the cursor under `nextPageToken`, which
//! goes back out as `pageToken`. Search results nest the object id by kind
//! (`id.videoId`, `id.channelId`, `id.playlistId`).

mod descriptor;
mod module;

pub use descriptor::youtube_descriptor;
pub use module::YoutubeModule;
