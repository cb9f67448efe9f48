//! HTTP transport seam.
//!
//! Workers never talk to reqwest directly. Production code uses
//! [`HttpClient`](crate::host::http::HttpClient); tests plug in scripted
//! transports.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::module::{ApiRequest, RawResponse};

/// Executes resolved requests.
///
/// Any status code is a successful transport result. Only connection-level
/// failures are errors. Timeouts are applied by the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request and reads the whole body.
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, FetchError>;
}
