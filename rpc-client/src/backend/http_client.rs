// SPDX-License-Identifier: CC0-1.0

//! `reqwest`-based transports.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, WWW_AUTHENTICATE};

use super::{BackendKind, Endpoint, timeout_error};
use crate::auth::{AuthType, DigestChallenge, make_cnonce};
use crate::error::{RpcError, RpcResult};

fn map_err(e: reqwest::Error) -> RpcError {
    if e.is_timeout() {
        timeout_error(e)
    } else {
        RpcError::Http(e)
    }
}

/// Async client with a pooled connection. Basic auth only.
#[derive(Debug)]
pub struct ReqwestBackend {
    endpoint: Arc<Endpoint>,
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(endpoint: Arc<Endpoint>) -> RpcResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(endpoint.timeout)
            .danger_accept_invalid_certs(!endpoint.verify_server)
            .build()?;
        Ok(Self {
            endpoint,
            client,
        })
    }

    pub(super) async fn run(
        &self,
        body: String,
        timeout: Option<Duration>,
        wallet: Option<&str>,
    ) -> RpcResult<(Vec<u8>, u16)> {
        self.endpoint.log_payload(BackendKind::Reqwest, &body);
        let mut req = self.client.post(self.endpoint.request_url(wallet)).body(body);
        if let Some(timeout) = timeout {
            req = req.timeout(timeout);
        }
        if let Some(auth) = self.endpoint.auth_for(AuthType::Basic) {
            req = req.basic_auth(&auth.user, Some(&auth.password));
        }
        let resp = req.send().await.map_err(map_err)?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await.map_err(map_err)?;
        Ok((bytes.to_vec(), status))
    }
}

/// Blocking client driven from the blocking thread pool. Supports digest
/// auth, answering the server's challenge with a second request.
#[derive(Debug)]
pub struct BlockingBackend {
    endpoint: Arc<Endpoint>,
}

impl BlockingBackend {
    pub fn new(endpoint: Arc<Endpoint>) -> Self {
        Self {
            endpoint,
        }
    }

    pub(super) async fn run(
        &self,
        body: String,
        timeout: Option<Duration>,
        wallet: Option<&str>,
    ) -> RpcResult<(Vec<u8>, u16)> {
        self.endpoint.log_payload(BackendKind::Blocking, &body);
        let endpoint = Arc::clone(&self.endpoint);
        let url = endpoint.request_url(wallet);
        let uri = endpoint.request_path(wallet);
        let timeout = timeout.unwrap_or(endpoint.timeout);
        tokio::task::spawn_blocking(move || blocking_post(&endpoint, &url, &uri, body, timeout))
            .await
            .map_err(|e| RpcError::Backend(e.to_string()))?
    }
}

// The blocking client owns a runtime of its own, so it is built and dropped
// on the blocking pool.
fn blocking_post(
    endpoint: &Endpoint,
    url: &str,
    uri: &str,
    body: String,
    timeout: Duration,
) -> RpcResult<(Vec<u8>, u16)> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(!endpoint.verify_server)
        .build()?;

    let send = |authorization: Option<String>| {
        let mut req = client.post(url).header(CONTENT_TYPE, "application/json").body(body.clone());
        if let Some(value) = authorization {
            req = req.header(AUTHORIZATION, value);
        }
        req.send().map_err(map_err)
    };

    let mut resp = send(endpoint.auth_for(AuthType::Basic).map(|a| a.basic_header()))?;

    let challenge = (resp.status() == StatusCode::UNAUTHORIZED)
        .then(|| resp.headers().get(WWW_AUTHENTICATE).and_then(|v| v.to_str().ok()).and_then(DigestChallenge::parse))
        .flatten();
    if let (Some(auth), Some(challenge)) = (endpoint.auth_for(AuthType::Digest), challenge) {
        let header = challenge.response_header(auth, "POST", uri, 1, &make_cnonce());
        resp = send(Some(header))?;
    }

    let status = resp.status().as_u16();
    let bytes = resp.bytes().map_err(map_err)?;
    Ok((bytes.to_vec(), status))
}
