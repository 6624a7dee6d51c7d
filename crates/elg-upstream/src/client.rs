use std::time::Duration;

use elg_common::{GatewayError, Rq};
use tracing::warn;

use crate::request::build_request_xml;
use crate::response::parse_response_xml;

/// A short-lived HTTP client for one upstream geolocation lookup.
///
/// Built fresh per request rather than shared: the upstream connection is
/// scoped to the lifetime of a single client request, matching the "one
/// socket, closed when done" resource policy of the gateway as a whole.
pub struct UpstreamClient {
    http: reqwest::Client,
    api_url: String,
}

impl UpstreamClient {
    /// Build a client bounded by `timeout` for every request it sends.
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::UpstreamError(format!("building HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: api_url.into(),
        })
    }

    /// Translate `rq` into the upstream XML request, POST it, and parse the
    /// response into `(lat, lon, hpe)`.
    pub async fn locate(&self, rq: &Rq, api_key: &str) -> Result<(f64, f64, f64), GatewayError> {
        let body = build_request_xml(rq, api_key)?;

        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| GatewayError::UpstreamError(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url = %self.api_url, "upstream returned non-success status");
            return Err(GatewayError::UpstreamError(format!(
                "non-success status: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::UpstreamError(format!("reading response body: {e}")))?;

        parse_response_xml(&bytes)
    }
}
