//! Open Policy Agent client implementing [`RuleEvaluator`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use gate_policy::{EvaluationRequest, EvaluationVerdict, PolicyError, PolicyResult, RuleEvaluator};
use hyper::header::CONTENT_TYPE;
use hyper::{Body, Request, Uri};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AdapterError, AdapterResult};
use crate::http_client::{HyperClient, build_https_client, parse_http_url, send, to_uri};

/// Configuration for the evaluator client.
#[derive(Clone, Debug)]
pub struct OpaConfig {
    endpoint: url::Url,
    timeout: Duration,
}

impl OpaConfig {
    /// Creates a configuration posting to `endpoint`, typically
    /// `http://opa:8181/v1/data/gates/evaluate`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the URL is not an absolute
    /// `http(s)` URL.
    pub fn new(endpoint: impl AsRef<str>) -> AdapterResult<Self> {
        Ok(Self {
            endpoint: parse_http_url(endpoint.as_ref(), "evaluator URL")?,
            timeout: Duration::from_secs(10),
        })
    }

    /// Sets the HTTP timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Rule evaluator backed by an OPA data API endpoint.
pub struct OpaEvaluator {
    client: HyperClient,
    endpoint: Uri,
    timeout: Duration,
}

impl fmt::Debug for OpaEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaEvaluator")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl OpaEvaluator {
    /// Constructs a new evaluator from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the endpoint is invalid or the
    /// HTTP client cannot be constructed.
    #[allow(clippy::needless_pass_by_value)]
    pub fn new(config: OpaConfig) -> AdapterResult<Self> {
        Ok(Self {
            client: build_https_client()?,
            endpoint: to_uri(&config.endpoint)?,
            timeout: config.timeout,
        })
    }

    async fn post(&self, request: &EvaluationRequest) -> AdapterResult<EvaluationVerdict> {
        let body = serde_json::to_vec(&DataRequest { input: request }).map_err(|err| {
            AdapterError::transport(format!("failed to encode evaluator request: {err}"))
        })?;

        let req = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .map_err(|err| {
                AdapterError::transport(format!("failed to build evaluator request: {err}"))
            })?;

        debug!(definition_id = %request.policy().id, key = %request.policy().key, "submitting rules to evaluator");
        let bytes = send(&self.client, req, self.timeout, "evaluator").await?;
        parse_verdict(&bytes)
    }
}

#[async_trait]
impl RuleEvaluator for OpaEvaluator {
    async fn evaluate(&self, request: &EvaluationRequest) -> PolicyResult<EvaluationVerdict> {
        self.post(request)
            .await
            .map_err(|err| PolicyError::evaluator(err.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct DataRequest<'a> {
    input: &'a EvaluationRequest,
}

#[derive(Debug, Deserialize)]
struct DataResponse {
    #[serde(default)]
    result: Option<EvaluationVerdict>,
}

fn parse_verdict(bytes: &[u8]) -> AdapterResult<EvaluationVerdict> {
    let response: DataResponse = serde_json::from_slice(bytes).map_err(|err| {
        AdapterError::response(format!("failed to decode evaluator response: {err}"))
    })?;
    response
        .result
        .ok_or_else(|| AdapterError::response("evaluator returned no result"))
}
