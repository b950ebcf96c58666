//! HTTP plumbing for the attestation engine's gateway.
//!
//! Every gateway method returns a result envelope, `{"Ok": ...}` or
//! `{"Err": {"message": ...}}`; the client unwraps it so callers only
//! see typed values or an [`AdapterError`].

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::AdapterError;

/// JSON-over-HTTP client for one gateway endpoint.
pub(super) struct GatewayClient {
    base_url: String,
    client: reqwest::Client,
}

/// Engine result envelope.
#[derive(Debug, Deserialize)]
pub(super) enum RpcResult<T> {
    Ok(T),
    Err(RemoteError),
}

/// Error payload of an `Err` envelope; only the message is surfaced.
#[derive(Debug, Deserialize)]
pub(super) struct RemoteError {
    #[serde(default)]
    pub message: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// POST a method call and unwrap the result envelope
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, AdapterError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Transport(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }

        let result: RpcResult<T> = response
            .json()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        match result {
            RpcResult::Ok(value) => Ok(value),
            RpcResult::Err(e) => Err(AdapterError::Remote(e.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let client = GatewayClient::new("http://localhost:8000/");
        assert_eq!(client.api_url("run_create"), "http://localhost:8000/run_create");
    }

    #[test]
    fn test_ok_envelope_parsing() {
        let parsed: RpcResult<String> = serde_json::from_str(r#"{"Ok": "0xB"}"#).unwrap();
        assert!(matches!(parsed, RpcResult::Ok(ref s) if s == "0xB"));
    }

    #[test]
    fn test_err_envelope_parsing() {
        let parsed: RpcResult<String> =
            serde_json::from_str(r#"{"Err": {"code": 404, "message": "Recipe not found"}}"#)
                .unwrap();
        assert!(matches!(parsed, RpcResult::Err(ref e) if e.message == "Recipe not found"));
    }

    #[test]
    fn test_ok_envelope_with_null_value() {
        // "not ready yet" responses carry an explicit null
        let parsed: RpcResult<Option<String>> = serde_json::from_str(r#"{"Ok": null}"#).unwrap();
        assert!(matches!(parsed, RpcResult::Ok(None)));
    }
}
