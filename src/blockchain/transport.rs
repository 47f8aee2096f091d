//! JSON-RPC transport used by the chain client.
//!
//! The client only needs "send this method with these params, give me the
//! `result`". [`HttpTransport`] does that over HTTP; tests plug in their own
//! [`Transport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Endpoint this transport talks to.
    fn url(&self) -> &str;

    /// Performs one JSON-RPC call.
    ///
    /// Returns `Ok(None)` when the node answered with neither an error nor a result.
    async fn request(&self, method: &str, params: Value) -> Result<Option<Value>, TransportError>;
}

/// JSON-RPC 2.0 over HTTP.
#[derive(Debug)]
pub struct HttpTransport {
    endpoint: String,
    url: Url,
    client: Client,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(provider_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        if provider_url.trim().is_empty() {
            return Err(ConfigError::EmptyProviderUrl);
        }
        let url = Url::parse(provider_url).map_err(|e| ConfigError::InvalidValue {
            name: "provider_url".to_string(),
            value: format!("{}: {}", provider_url, e),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                name: "network_timeout".to_string(),
                value: e.to_string(),
            })?;

        Ok(Self {
            endpoint: provider_url.to_string(),
            url,
            client,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn url(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, method: &str, params: Value) -> Result<Option<Value>, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        debug!("rpc request {} (id {})", method, id);

        let response: Value = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?
            .json()
            .await?;

        if !response.is_object() {
            return Err(TransportError::InvalidResponse(response.to_string()));
        }
        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            return Err(TransportError::Rpc(error.to_string()));
        }

        match response.get("result") {
            None | Some(Value::Null) => Ok(None),
            Some(result) => Ok(Some(result.clone())),
        }
    }
}
