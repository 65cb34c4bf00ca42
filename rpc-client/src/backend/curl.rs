// SPDX-License-Identifier: CC0-1.0

//! Transport that shells out to `curl`.
//!
//! Credentials passed this way are visible in the process list, so this
//! backend is meant for testing. Payloads too large for a command line are
//! sent with [`RawBackend`] instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;

use super::{BackendKind, Endpoint, RawBackend};
use crate::auth::AuthType;
use crate::error::{RpcError, RpcResult};

/// Longest payload passed on the command line, well below any ARG_MAX.
const ARG_MAX: usize = 8192;

#[derive(Debug)]
pub struct CurlBackend {
    endpoint: Arc<Endpoint>,
    fallback: RawBackend,
}

impl CurlBackend {
    pub fn new(endpoint: Arc<Endpoint>) -> Self {
        Self {
            fallback: RawBackend::new(Arc::clone(&endpoint)),
            endpoint,
        }
    }

    fn exec_opts(&self) -> Vec<String> {
        let ep = &self.endpoint;
        let mut opts = vec!["--header".to_string(), "Content-Type: application/json".to_string()];
        if let (Some(auth), Some(auth_type)) = (&ep.auth, ep.auth_type) {
            opts.push("--user".to_string());
            opts.push(format!("{}:{}", auth.user, auth.password));
            if auth_type == AuthType::Digest {
                opts.push("--digest".to_string());
            }
        }
        if ep.https && !ep.verify_server {
            opts.push("--insecure".to_string());
        }
        opts.push("--silent".to_string());
        opts
    }

    pub(super) async fn run(
        &self,
        body: String,
        timeout: Option<Duration>,
        wallet: Option<&str>,
    ) -> RpcResult<(Vec<u8>, u16)> {
        if body.len() > ARG_MAX {
            return self.fallback.run(body, timeout, wallet).await;
        }
        self.endpoint.log_payload(BackendKind::Curl, &body);

        let timeout = timeout.unwrap_or(self.endpoint.timeout);
        let output = Command::new("curl")
            .args(["--proxy", ""])
            .arg("--connect-timeout")
            .arg(timeout.as_secs_f64().to_string())
            .args(["--write-out", "%{http_code}"])
            .arg("--data-binary")
            .arg(&body)
            .args(self.exec_opts())
            .arg(self.endpoint.request_url(wallet))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| RpcError::Backend(format!("unable to execute curl: {}", e)))?;

        if !output.status.success() {
            return Err(RpcError::Backend(format!("curl exited with {}", output.status)));
        }
        split_status(output.stdout)
    }
}

/// `--write-out %{http_code}` appends the three-digit status to the body.
fn split_status(mut stdout: Vec<u8>) -> RpcResult<(Vec<u8>, u16)> {
    if stdout.len() < 3 {
        return Err(RpcError::Backend("short output from curl".to_string()));
    }
    let code = stdout.split_off(stdout.len() - 3);
    let status = std::str::from_utf8(&code)
        .ok()
        .and_then(|c| c.parse::<u16>().ok())
        .ok_or_else(|| RpcError::Backend("no HTTP status in curl output".to_string()))?;
    Ok((stdout, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Auth;

    #[test]
    fn test_split_status() {
        let (body, status) = split_status(b"{\"result\":null}200".to_vec()).unwrap();
        assert_eq!(body, b"{\"result\":null}");
        assert_eq!(status, 200);
        assert!(split_status(b"20".to_vec()).is_err());
        assert!(split_status(b"{}abc".to_vec()).is_err());
    }

    #[test]
    fn test_exec_opts() {
        let mut ep = Endpoint::new("node", 18082, Duration::from_secs(1));
        ep.https = true;
        ep.verify_server = false;
        ep.auth = Some(Auth::new("monero", "pw"));
        ep.auth_type = Some(AuthType::Digest);
        let opts = CurlBackend::new(Arc::new(ep)).exec_opts();
        assert_eq!(
            opts,
            ["--header", "Content-Type: application/json", "--user", "monero:pw", "--digest", "--insecure", "--silent"]
        );
    }
}
