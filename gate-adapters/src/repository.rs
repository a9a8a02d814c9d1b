//! Artifact repository client backing the definition data sources.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use gate_policy::{ComponentTarget, DataFetcher, FetchedDocument};
use gate_primitives::DataSource;
use hyper::header::ACCEPT;
use hyper::{Body, Request};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{AdapterError, AdapterResult};
use crate::http_client::{HyperClient, build_https_client, parse_http_url, send, to_uri};

const COMPONENT_PLACEHOLDER: &str = "{component}";
const VERSION_PLACEHOLDER: &str = "{version}";

/// Configuration for one repository endpoint.
#[derive(Clone, Debug)]
pub struct RepositoryConfig {
    base_url: Url,
    path_template: String,
    timeout: Duration,
}

impl RepositoryConfig {
    /// Creates a configuration for `path_template` below `base_url`.
    ///
    /// The template may reference `{component}` and `{version}`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the base URL is not an
    /// absolute `http(s)` URL.
    pub fn new(base_url: impl AsRef<str>, path_template: impl Into<String>) -> AdapterResult<Self> {
        let base_url = parse_http_url(base_url.as_ref(), "repository base URL")?;
        if base_url.cannot_be_a_base() {
            return Err(AdapterError::configuration(
                "repository base URL cannot carry a path",
            ));
        }
        Ok(Self {
            base_url,
            path_template: path_template.into(),
            timeout: Duration::from_secs(10),
        })
    }

    /// Sets the HTTP timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Renders the document URL for `target`, percent-encoding each
    /// substituted path segment.
    #[must_use]
    pub fn document_url(&self, target: &ComponentTarget) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in self.path_template.split('/').filter(|s| !s.is_empty()) {
                let rendered = segment
                    .replace(COMPONENT_PLACEHOLDER, target.component_id.as_str())
                    .replace(VERSION_PLACEHOLDER, &target.version);
                segments.push(&rendered);
            }
        }
        url
    }
}

/// Fetches one kind of document from the artifact repository.
pub struct RepositoryFetcher {
    client: HyperClient,
    source: DataSource,
    config: RepositoryConfig,
}

impl fmt::Debug for RepositoryFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryFetcher")
            .field("source", &self.source.label())
            .field("base_url", &self.config.base_url.as_str())
            .field("path_template", &self.config.path_template)
            .finish_non_exhaustive()
    }
}

impl RepositoryFetcher {
    /// Creates a fetcher serving `source`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the HTTP client cannot be
    /// constructed.
    pub fn new(source: DataSource, config: RepositoryConfig) -> AdapterResult<Self> {
        Ok(Self {
            client: build_https_client()?,
            source,
            config,
        })
    }

    async fn get(&self, target: &ComponentTarget) -> AdapterResult<Value> {
        let url = self.config.document_url(target);
        let request = Request::get(to_uri(&url)?)
            .header(ACCEPT, "application/json")
            .body(Body::empty())
            .map_err(|err| {
                AdapterError::transport(format!("failed to build repository request: {err}"))
            })?;

        debug!(source = self.source.label(), url = %url, "fetching repository document");
        let bytes = send(&self.client, request, self.config.timeout, "repository").await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            AdapterError::response(format!("failed to decode repository document: {err}"))
        })
    }
}

#[async_trait]
impl DataFetcher for RepositoryFetcher {
    async fn fetch(&self, target: &ComponentTarget) -> FetchedDocument {
        match self.get(target).await {
            Ok(Value::Null) => FetchedDocument::Absent,
            Ok(document) => FetchedDocument::Present(document),
            Err(err) => {
                warn!(
                    source = self.source.label(),
                    component_id = %target.component_id,
                    version = %target.version,
                    error = %err,
                    "repository fetch failed"
                );
                FetchedDocument::Absent
            }
        }
    }
}
