//! Twitter API v2 module.
//!
//! Authenticates with an app bearer token. Timelines and searches return
//! their entries under `data`, expansions under `includes` and the paging
//! cursor under `meta.next_token`, which goes back out as
//! `pagination_token`.

mod descriptor;
mod module;

pub use descriptor::twitter_descriptor;
pub use module::TwitterModule;
