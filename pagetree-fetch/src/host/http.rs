//! HTTP client with tracing and an optional extra root certificate.

use async_trait::async_trait;
use pagetree_core::HttpMethod;
use reqwest::{Certificate, Client, Method};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::error::FetchError;
use crate::module::{ApiRequest, RawResponse};
use crate::transport::HttpTransport;

/// Upper bound for a single request. Runs apply their own, usually shorter,
/// timeout on top.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// User agent string for `PageTree`.
const USER_AGENT: &str = concat!("PageTree/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// HTTP Client
// ============================================================================

/// reqwest-backed [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Creates a client trusting the platform roots.
    pub fn new() -> Result<Self, FetchError> {
        Self::builder(None)
    }

    /// Creates a client that also trusts the PEM certificate(s) at `path`.
    pub fn with_ca_bundle(path: &Path) -> Result<Self, FetchError> {
        let pem = std::fs::read(path)?;
        let certificates = Certificate::from_pem_bundle(&pem)?;
        info!(path = %path.display(), count = certificates.len(), "Loaded extra root certificates");
        Self::builder(Some(certificates))
    }

    fn builder(certificates: Option<Vec<Certificate>>) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT);
        for certificate in certificates.into_iter().flatten() {
            builder = builder.add_root_certificate(certificate);
        }
        Ok(Self {
            inner: builder.build()?,
        })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(DEFAULT_TIMEOUT_SECS)
    } else if err.is_connect() || err.is_request() {
        FetchError::Network(err.to_string())
    } else {
        FetchError::Http(err)
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: &ApiRequest) -> Result<RawResponse, FetchError> {
        let url = request.full_url()?;
        debug!("Sending request");

        let mut builder = self.inner.request(method(request.method), url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.text().await.map_err(classify)?;

        debug!(status, bytes = body.len(), "Response received");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
