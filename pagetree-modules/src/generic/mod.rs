//! Generic REST module.
//!
//! Everything comes from the request template: base path, resource with
//! placeholders, query parameters, headers, verb and JSON body. Responses
//! are split at the nodes key into one child per list entry, with the rest
//! of the document kept as an `offcut` child.
//!
//! ## Paging
//!
//! | Rule | Request | Next page |
//! |------|---------|-----------|
//! | `none` | once | - |
//! | `key` | cursor sent as `param` | cursor read from `key` |
//! | `url` | next URL as is | URL read from `key` |
//! | `count` | offset sent as `param` | offset + `step`, until a page is empty |

mod descriptor;
mod module;

pub use descriptor::generic_descriptor;
pub use module::GenericModule;
