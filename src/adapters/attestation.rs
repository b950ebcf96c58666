//! Attestation service client.
//!
//! Starts attestation creation for a paid run and resolves the resulting
//! UID. The UID endpoint answers `Ok(null)` while the attestation
//! transaction has not produced a UID yet; that is not an error.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::RunId;

use super::gateway::GatewayClient;
use super::{AdapterError, AttestationService};

/// Attestation service over the engine's HTTP gateway.
pub struct HttpAttestationService {
    gateway: GatewayClient,
}

impl HttpAttestationService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            gateway: GatewayClient::new(base_url),
        }
    }
}

#[async_trait]
impl AttestationService for HttpAttestationService {
    async fn start_run(&self, run_id: &RunId) -> Result<String, AdapterError> {
        self.gateway
            .call("run_start", json!({ "run_id": run_id }))
            .await
    }

    async fn attestation_uid(&self, run_id: &RunId) -> Result<Option<String>, AdapterError> {
        self.gateway
            .call("run_attestation_uid", json!({ "run_id": run_id }))
            .await
    }
}
