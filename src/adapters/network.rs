//! Read-only network connector.
//!
//! Never user-selectable; it backs read queries when no wallet is
//! connected. Activation verifies that the configured RPC endpoint is
//! reachable and serves the expected chain via `eth_chainId`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;

use crate::connection::adapter::{AdapterError, ConnectorAdapter, ErrorCallback};

/// Chain served when the environment does not name one.
pub const DEFAULT_CHAIN_ID: u64 = 94;

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// JSON-RPC backed fallback connector.
pub struct NetworkAdapter {
    client: reqwest::Client,
    rpc_urls: HashMap<u64, String>,
    chain_id: Mutex<u64>,
    /// Chain id confirmed by the last successful activation.
    connected: Mutex<Option<u64>>,
    error_callback: Mutex<Option<ErrorCallback>>,
}

impl NetworkAdapter {
    pub fn new(rpc_urls: HashMap<u64, String>) -> Arc<Self> {
        Arc::new(Self {
            client: reqwest::Client::new(),
            rpc_urls,
            chain_id: Mutex::new(DEFAULT_CHAIN_ID),
            connected: Mutex::new(None),
            error_callback: Mutex::new(None),
        })
    }

    pub fn chain_id(&self) -> u64 {
        *self.chain_id.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn connected_chain(&self) -> Option<u64> {
        *self.connected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Point the connector at `chain_id`.
    ///
    /// A chain without a configured RPC URL is reported through the error
    /// listener and the current chain is kept.
    pub fn select_chain(&self, chain_id: u64) {
        if !self.rpc_urls.contains_key(&chain_id) {
            self.report(AdapterError::Unavailable(format!(
                "no RPC URL configured for chain {chain_id}"
            )));
            return;
        }
        *self.chain_id.lock().unwrap_or_else(PoisonError::into_inner) = chain_id;
    }

    fn report(&self, error: AdapterError) {
        let callback = self
            .error_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => callback(error),
            None => tracing::debug!(error = %error, "network connector error with no listener"),
        }
    }

    async fn query_chain_id(&self, url: &str) -> Result<u64, AdapterError> {
        let response = self
            .client
            .post(url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "eth_chainId",
                "params": []
            }))
            .send()
            .await
            .map_err(|e| AdapterError::Unavailable(format!("RPC request failed: {e}")))?;

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Provider(format!("malformed RPC response: {e}")))?;

        match body {
            RpcResponse {
                error: Some(err), ..
            } => Err(AdapterError::Provider(format!(
                "RPC error {}: {}",
                err.code, err.message
            ))),
            RpcResponse {
                result: Some(hex), ..
            } => parse_chain_id(&hex),
            _ => Err(AdapterError::Provider("RPC response has no result".into())),
        }
    }
}

impl ConnectorAdapter for NetworkAdapter {
    fn activate(&self) -> BoxFuture<'_, Result<(), AdapterError>> {
        async move {
            let expected = self.chain_id();
            let url = self.rpc_urls.get(&expected).ok_or_else(|| {
                AdapterError::Unavailable(format!("no RPC URL configured for chain {expected}"))
            })?;

            let reported = self.query_chain_id(url).await?;
            if reported != expected {
                return Err(AdapterError::Provider(format!(
                    "RPC endpoint serves chain {reported}, expected {expected}"
                )));
            }

            *self.connected.lock().unwrap_or_else(PoisonError::into_inner) = Some(reported);
            tracing::debug!(chain_id = reported, url = %url, "network connector ready");
            Ok(())
        }
        .boxed()
    }

    fn reset_state(&self) {
        *self.connected.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn on_error(&self, callback: ErrorCallback) {
        *self
            .error_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }
}

/// Parse a `0x`-prefixed hex quantity as returned by `eth_chainId`.
fn parse_chain_id(hex: &str) -> Result<u64, AdapterError> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .ok_or_else(|| AdapterError::Provider(format!("chain id is not hex: {hex}")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|_| AdapterError::Provider(format!("chain id is not hex: {hex}")))
}
