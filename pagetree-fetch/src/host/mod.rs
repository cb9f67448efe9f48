//! Host APIs used by the fetch engine.
//!
//! - [`http`] - reqwest-backed [`HttpTransport`](crate::transport::HttpTransport)

pub mod http;

pub use http::HttpClient;
