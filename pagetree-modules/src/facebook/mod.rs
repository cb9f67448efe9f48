//! Facebook Graph API module.
//!
//! Requests go to `https://graph.facebook.com/<version>/<resource>` with an
//! `access_token` query parameter. Edge responses carry their entries under
//! `data` and the next page as a full URL under `paging.next`:
//!
//! ```json
//! {
//!   "data": [{"id": "1_2", "message": "..."}],
//!   "paging": {"cursors": {...}, "next": "https://graph.facebook.com/..."}
//! }
//! ```
//!
//! Object lookups (no `data` list) become a single child and report the
//! object's `id` back to the fetched node.

mod descriptor;
mod module;

pub use descriptor::facebook_descriptor;
pub use module::FacebookModule;
