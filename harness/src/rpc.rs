//! Cookie-authenticated JSON-RPC client for the node.
//!
//! The node rotates its credential on every start and writes it to a
//! cookie file (`user:password` on a single line), so credentials are
//! re-read per call rather than captured at client construction — the
//! client can be built before the node has finished writing the file.

use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};
use tracing::trace;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not read cookie file {path}: {source}")]
    Cookie {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed cookie file {path}")]
    MalformedCookie { path: PathBuf },
    #[error("rpc error {code}: {message}")]
    Server { code: i64, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(&'static str),
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    cookie_path: PathBuf,
}

impl RpcClient {
    #[must_use]
    pub fn new(port: u16, cookie_path: PathBuf) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("http://127.0.0.1:{port}"),
            cookie_path,
        }
    }

    #[must_use]
    pub fn cookie_path(&self) -> &std::path::Path {
        &self.cookie_path
    }

    fn credentials(&self) -> Result<(String, String), RpcError> {
        let raw = fs::read_to_string(&self.cookie_path).map_err(|source| RpcError::Cookie {
            path: self.cookie_path.clone(),
            source,
        })?;
        let (user, password) =
            raw.trim_end()
                .split_once(':')
                .ok_or_else(|| RpcError::MalformedCookie {
                    path: self.cookie_path.clone(),
                })?;
        Ok((user.to_string(), password.to_string()))
    }

    /// Issue a single JSON-RPC call and unwrap its result.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let (user, password) = self.credentials()?;
        let body = json!({
            "jsonrpc": "2.0",
            "id": 0,
            "method": method,
            "params": params,
        });
        trace!("rpc call {method}");

        let response: Value = self
            .http
            .post(&self.url)
            .basic_auth(user, Some(password))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::Server {
                code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }
        response
            .get("result")
            .cloned()
            .ok_or(RpcError::MalformedResponse("missing result field"))
    }
}
