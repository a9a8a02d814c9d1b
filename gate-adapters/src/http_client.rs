use std::sync::Arc;

use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::{Duration, timeout};
use webpki_roots::TLS_SERVER_ROOTS;

use crate::error::{AdapterError, AdapterResult};

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

#[allow(clippy::unnecessary_wraps)]
pub(crate) fn build_https_client() -> AdapterResult<HyperClient> {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|anchor| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            anchor.subject,
            anchor.spki,
            anchor.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);

    let connector = HttpsConnector::from((http, Arc::new(config)));

    Ok(Client::builder().build::<_, Body>(connector))
}

/// Sends `request` and returns the body of a successful response.
pub(crate) async fn send(
    client: &HyperClient,
    request: Request<Body>,
    limit: Duration,
    service: &str,
) -> AdapterResult<hyper::body::Bytes> {
    let response = timeout(limit, client.request(request))
        .await
        .map_err(|_| AdapterError::transport(format!("{service} request timed out")))?
        .map_err(|err| AdapterError::transport(format!("{service} request failed: {err}")))?;

    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .map_err(|err| AdapterError::transport(format!("failed to read {service} response: {err}")))?;

    if !status.is_success() {
        let reason = String::from_utf8_lossy(&bytes).to_string();
        return Err(AdapterError::Response {
            reason: format!("{service} returned {status}: {reason}"),
        });
    }
    Ok(bytes)
}

/// Parses an absolute `http(s)` URL.
pub(crate) fn parse_http_url(input: &str, what: &str) -> AdapterResult<url::Url> {
    let parsed = url::Url::parse(input.trim())
        .map_err(|err| AdapterError::configuration(format!("invalid {what}: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AdapterError::configuration(format!(
            "{what} must start with http:// or https://"
        )));
    }
    Ok(parsed)
}

pub(crate) fn to_uri(url: &url::Url) -> AdapterResult<Uri> {
    url.as_str()
        .parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid endpoint {url}: {err}")))
}
