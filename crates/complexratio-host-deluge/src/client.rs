//! Deluge Web UI JSON-RPC client

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{DelugeError, DelugeResult, RpcRequest, RpcResponse, NOT_AUTHENTICATED};

/// Session-cookie based client for `<url>/json`
pub struct DelugeClient {
    http: reqwest::Client,
    endpoint: String,
    password: String,
    next_id: AtomicU64,
}

impl DelugeClient {
    pub fn new(url: &str, password: impl Into<String>, timeout: Duration) -> DelugeResult<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/json", url.trim_end_matches('/')),
            password: password.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Log in with the Web UI password; the session lives in the cookie jar
    pub async fn login(&self) -> DelugeResult<()> {
        let accepted: bool = self.call_once("auth.login", &json!([self.password])).await?;
        if !accepted {
            warn!(endpoint = %self.endpoint, "Deluge Web UI rejected the password");
            return Err(DelugeError::LoginRejected);
        }

        info!(endpoint = %self.endpoint, "Logged in to Deluge Web UI");
        Ok(())
    }

    /// Call a method, logging in again once if the session expired
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> DelugeResult<T> {
        match self.call_once(method, &params).await {
            Err(DelugeError::Rpc { code, .. }) if code == NOT_AUTHENTICATED => {
                debug!(method, "Session expired, logging in again");
                self.login().await?;
                self.call_once(method, &params).await
            }
            other => other,
        }
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &Value,
    ) -> DelugeResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest { method, params, id };

        let response: RpcResponse = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.id.is_some_and(|r| r != id) {
            return Err(DelugeError::Decode(format!(
                "response id {:?} does not match request id {}",
                response.id, id
            )));
        }

        response.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalized() {
        let client =
            DelugeClient::new("http://localhost:8112/", "deluge", Duration::from_secs(1)).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8112/json");
    }

    #[tokio::test]
    async fn test_unreachable_web_ui() {
        // Nothing listens on the discard port
        let client =
            DelugeClient::new("http://127.0.0.1:9", "deluge", Duration::from_millis(500)).unwrap();
        let err = client.login().await.unwrap_err();
        assert!(matches!(err, DelugeError::Http(_)));
    }
}
