use std::sync::Arc;
use std::time::Duration;

use hyper::body::{Bytes, to_bytes};
use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, CONTENT_TYPE, HOST};
use hyper::{Body, Client, Request, StatusCode, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use webpki_roots::TLS_SERVER_ROOTS;

use crate::error::{CredentialError, CredentialResult};
use crate::provider::ProviderKind;

pub(crate) type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

pub(crate) const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

pub(crate) fn build_https_client() -> HyperClient {
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

    Client::builder().build::<_, Body>(connector)
}

pub(crate) fn parse_endpoint(provider: ProviderKind, endpoint: &str) -> CredentialResult<Uri> {
    endpoint.parse::<Uri>().map_err(|err| {
        CredentialError::configuration(format!("invalid {provider} endpoint `{endpoint}`: {err}"))
    })
}

/// Host header value for `uri`, including a non-default port.
pub(crate) fn host_of(provider: ProviderKind, uri: &Uri) -> CredentialResult<String> {
    uri.authority()
        .map(|authority| authority.as_str().to_owned())
        .ok_or_else(|| CredentialError::configuration(format!("{provider} endpoint has no host")))
}

/// Sends one form-encoded POST and returns the status and body.
pub(crate) async fn post_form(
    client: &HyperClient,
    provider: ProviderKind,
    endpoint: &Uri,
    headers: &[(&str, String)],
    body: String,
    limit: Duration,
) -> CredentialResult<(StatusCode, Bytes)> {
    let mut builder = Request::post(endpoint.clone())
        .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
        .header(ACCEPT, "application/json")
        .header(HOST, host_of(provider, endpoint)?);
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }

    let request = builder.body(Body::from(body)).map_err(|err| {
        CredentialError::transport(provider, format!("failed to build request: {err}"))
    })?;

    let response = timeout(limit, client.request(request))
        .await
        .map_err(|_| CredentialError::transport(provider, "request timed out"))?
        .map_err(|err| CredentialError::transport(provider, format!("request failed: {err}")))?;

    let status = response.status();
    let bytes = to_bytes(response.into_body()).await.map_err(|err| {
        CredentialError::transport(provider, format!("failed to read response: {err}"))
    })?;

    Ok((status, bytes))
}

/// Classifies a non-success status: client errors are rejections, anything
/// else is a transport fault.
pub(crate) fn failure_for_status(
    provider: ProviderKind,
    status: StatusCode,
    reason: String,
) -> CredentialError {
    if status.is_client_error() {
        CredentialError::Rejected {
            provider,
            reason,
            status: status.as_u16(),
        }
    } else {
        CredentialError::transport(provider, format!("provider returned {status}: {reason}"))
    }
}
