// SPDX-License-Identifier: CC0-1.0

//! The JSON-RPC core shared by every daemon family.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::net::TcpStream;

use crate::backend::{Backend, BackendKind, Endpoint};
use crate::call_sigs::{CallSigs, ICall};
use crate::error::{RpcError, RpcResult};

/// Requests per concurrent batch in [`RpcClient::gathered_call`].
pub const GATHER_CHUNK_SIZE: usize = 1024;

/// Optional daemon features detected at connect time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// The daemon keeps a full copy of the chain.
    FullNode,
    /// `setlabel` is available.
    LabelApi,
    /// `signrawtransactionwithkey` is available.
    SignWithKey,
    /// `eth_chainId` is available.
    EthChainId,
}

/// Per-call transport options.
#[derive(Clone, Debug, Default)]
pub struct CallOptions<'a> {
    /// Overrides the endpoint's default timeout.
    pub timeout: Option<Duration>,
    /// Selects the request path; see [`crate::backend::HostPath`].
    pub wallet: Option<&'a str>,
}

impl<'a> CallOptions<'a> {
    pub fn wallet(wallet: &'a str) -> Self {
        Self {
            wallet: Some(wallet),
            ..Default::default()
        }
    }

    pub fn timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Default::default()
        }
    }
}

/// How responses and request envelopes are shaped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Envelope {
    /// `{"id", "jsonrpc", "method", "params"}`; the answer is in `result`.
    JsonRpc,
    /// The bare parameters are posted and the whole body is the answer.
    Raw,
}

/// Transport-level RPC client.
#[derive(Debug)]
pub struct RpcClient {
    endpoint: Arc<Endpoint>,
    backend: Backend,
    envelope: Envelope,
    call_sigs: Option<CallSigs>,
    fail_on_command: Option<String>,
}

impl RpcClient {
    pub fn new(endpoint: Endpoint, backend: BackendKind) -> RpcResult<Self> {
        let endpoint = Arc::new(endpoint);
        Ok(Self {
            backend: Backend::new(backend, Arc::clone(&endpoint))?,
            endpoint,
            envelope: Envelope::JsonRpc,
            call_sigs: None,
            fail_on_command: None,
        })
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_call_sigs(mut self, call_sigs: Option<CallSigs>) -> Self {
        self.call_sigs = call_sigs;
        self
    }

    pub fn with_fail_on_command(mut self, method: Option<String>) -> Self {
        self.fail_on_command = method;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    fn envelope(id: usize, method: &str, params: Value) -> Value {
        json!({ "id": id, "jsonrpc": "2.0", "method": method, "params": params })
    }

    /// Calls `method` with positional `params`, exactly as a command-line
    /// client would.
    pub async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        self.call_with(method, params, &CallOptions::default()).await
    }

    /// [`RpcClient::call`] with per-call options.
    pub async fn call_with(&self, method: &str, params: Value, opts: &CallOptions<'_>) -> RpcResult<Value> {
        let method = match &self.fail_on_command {
            Some(m) if m == method => format!("badcommand_{}", method),
            _ => method.to_string(),
        };
        self.send(Self::envelope(1, &method, params), opts).await
    }

    /// Calls `method` and deserializes the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> RpcResult<T> {
        Ok(serde_json::from_value(self.call(method, params).await?)?)
    }

    /// Posts `payload` as is and processes the response.
    pub async fn send(&self, payload: Value, opts: &CallOptions<'_>) -> RpcResult<Value> {
        let (body, status) = self.backend.run(&payload, opts.timeout, opts.wallet).await?;
        self.process_http_resp(&body, status)
    }

    /// One request carrying a JSON array of calls to `method`, ids `1..=n`.
    /// Returns the `result` of each in request order, whatever order the
    /// daemon answers in.
    pub async fn batch_call(
        &self,
        method: &str,
        param_list: Vec<Value>,
        opts: &CallOptions<'_>,
    ) -> RpcResult<Vec<Value>> {
        let count = param_list.len();
        let payload: Vec<Value> =
            param_list.into_iter().enumerate().map(|(n, params)| Self::envelope(n + 1, method, params)).collect();
        let (body, status) = self.backend.run(&Value::Array(payload), opts.timeout, opts.wallet).await?;
        if status != 200 {
            return Err(failure_from_body(&body, status));
        }
        self.log_response(&body);
        let mut responses: Vec<Value> = serde_json::from_slice(&body)?;
        if responses.len() != count {
            return Err(RpcError::failure(format!(
                "batch of {} calls to '{}' returned {} responses",
                count,
                method,
                responses.len()
            )));
        }
        responses.sort_by_key(|r| r.get("id").and_then(Value::as_u64).unwrap_or(u64::MAX));
        Ok(responses
            .into_iter()
            .map(|mut r| r.get_mut("result").map(Value::take).unwrap_or(Value::Null))
            .collect())
    }

    /// Many independent calls issued concurrently, in chunks of
    /// [`GATHER_CHUNK_SIZE`]. Results are returned in call order; the first
    /// failure fails the whole operation.
    pub async fn gathered_call(&self, calls: &[(&str, Value)], opts: &CallOptions<'_>) -> RpcResult<Vec<Value>> {
        let mut results = Vec::with_capacity(calls.len());
        for chunk in calls.chunks(GATHER_CHUNK_SIZE) {
            let requests = chunk
                .iter()
                .enumerate()
                .map(|(n, (method, params))| self.send(Self::envelope(n + 1, method, params.clone()), opts));
            for result in join_all(requests).await {
                results.push(result?);
            }
        }
        Ok(results)
    }

    /// [`RpcClient::gathered_call`] with the same method for every call.
    pub async fn gathered_call_method(
        &self,
        method: &str,
        args_list: &[Value],
        opts: &CallOptions<'_>,
    ) -> RpcResult<Vec<Value>> {
        let calls: Vec<(&str, Value)> = args_list.iter().map(|args| (method, args.clone())).collect();
        self.gathered_call(&calls, opts).await
    }

    /// Indirect call through the daemon's call-signature table.
    pub async fn icall(&self, call: &ICall<'_>, opts: &CallOptions<'_>) -> RpcResult<Value> {
        let sigs = self.call_sigs.ok_or_else(|| RpcError::UnknownMethod(format!("{:?}", call)))?;
        let (method, params) = sigs.resolve(call)?;
        self.call_with(method, params, opts).await
    }

    fn log_response(&self, body: &[u8]) {
        if self.endpoint.debug {
            tracing::debug!("RPC RESPONSE data ==> {}", String::from_utf8_lossy(body));
        }
    }

    /// Turns a response body and status into a result value or a failure.
    pub fn process_http_resp(&self, body: &[u8], status: u16) -> RpcResult<Value> {
        if status != 200 {
            return Err(failure_from_body(body, status));
        }
        self.log_response(body);

        let mut resp: Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(_) => return Err(RpcError::failure(String::from_utf8_lossy(body))),
        };
        if let Some(error) = resp.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::failure(error_message(error)));
        }
        match self.envelope {
            Envelope::Raw => Ok(resp),
            Envelope::JsonRpc => match resp.get_mut("result") {
                Some(result) => Ok(result.take()),
                None => Err(RpcError::failure(resp.to_string())),
            },
        }
    }
}

fn error_message(error: &Value) -> String {
    match error.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

fn failure_from_body(body: &[u8], status: u16) -> RpcError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.get("message")).and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());
    RpcError::Failure {
        status: Some(status),
        message,
    }
}

/// Checks that something is listening on `host:port`.
pub async fn probe(host: &str, port: u16) -> RpcResult<()> {
    let socket_error = || RpcError::Socket {
        host: host.to_string(),
        port,
    };
    match tokio::time::timeout(Duration::from_secs(1), TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => Ok(()),
        _ => Err(socket_error()),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn client(envelope: Envelope) -> RpcClient {
        let ep = Endpoint::new("localhost", 1, Duration::from_secs(1));
        RpcClient::new(ep, BackendKind::Raw).unwrap().with_envelope(envelope)
    }

    #[test]
    fn test_process_ok() {
        let c = client(Envelope::JsonRpc);
        let v = c.process_http_resp(br#"{"result":{"blocks":5},"error":null,"id":1}"#, 200).unwrap();
        assert_eq!(v, json!({"blocks": 5}));
        assert_eq!(c.process_http_resp(br#"{"result":null,"id":1}"#, 200).unwrap(), Value::Null);

        let raw = client(Envelope::Raw);
        assert_eq!(raw.process_http_resp(br#"{"height":10}"#, 200).unwrap(), json!({"height": 10}));
    }

    #[test]
    fn test_process_exact_amounts() {
        let c = client(Envelope::JsonRpc);
        let v = c.process_http_resp(br#"{"result":0.00001000}"#, 200).unwrap();
        assert_eq!(v.to_string(), "0.00001000");
    }

    #[test]
    fn test_process_errors() {
        let c = client(Envelope::JsonRpc);
        assert_matches!(
            c.process_http_resp(br#"{"error":{"code":-32601,"message":"Method not found"}}"#, 200),
            Err(RpcError::Failure { status: None, message }) if message == "Method not found"
        );
        assert_matches!(
            c.process_http_resp(br#"{"error":"plain"}"#, 200),
            Err(RpcError::Failure { message, .. }) if message == "plain"
        );
        assert_matches!(
            c.process_http_resp(br#"{"id":1}"#, 200),
            Err(RpcError::Failure { message, .. }) if message == r#"{"id":1}"#
        );
        assert_matches!(
            c.process_http_resp(b"not json", 200),
            Err(RpcError::Failure { message, .. }) if message == "not json"
        );

        let err = c
            .process_http_resp(br#"{"result":null,"error":{"code":-8,"message":"Block height out of range"}}"#, 500)
            .unwrap_err();
        assert_eq!(err.to_string(), "500 Internal Server Error: Block height out of range");

        let err = c.process_http_resp(b"", 401).unwrap_err();
        assert_eq!(err.to_string(), "401 Unauthorized: ");
    }

    #[test]
    fn test_call_options() {
        let opts = CallOptions::wallet("cold");
        assert_eq!(opts.wallet, Some("cold"));
        assert_eq!(opts.timeout, None);
        assert_eq!(CallOptions::timeout(Duration::from_secs(3)).timeout, Some(Duration::from_secs(3)));
    }
}
