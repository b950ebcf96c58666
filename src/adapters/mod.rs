//! Adapter interfaces for the workflow's external collaborators.
//!
//! The orchestrator talks to three remote systems it does not implement:
//! the run/recipe registry, the chain payment submitter, and the
//! attestation service. Each is a trait here so the workflow can be
//! driven against test doubles; the production implementations speak
//! JSON over HTTP.

pub mod attestation;
mod gateway;
pub mod payment;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Recipe, RecipeId, Run, RunId};

pub use attestation::HttpAttestationService;
pub use payment::EthRpcSubmitter;
pub use registry::HttpRegistry;

/// Failure talking to a collaborator.
///
/// `Remote` carries the collaborator's own error message; `Transport`
/// covers everything below it (connection, HTTP status, malformed body).
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
    #[error("{0}")]
    Remote(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Confirmation data for a mined transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: String,

    /// Block the transaction was included in
    pub block_number: Option<u64>,

    /// Execution status, `true` when the transaction succeeded
    pub status: Option<bool>,
}

/// Run and recipe registry; the source of truth for all durable state.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Create a run for a recipe, priced for the given chain
    async fn create_run(&self, recipe_id: &RecipeId, chain_id: u64) -> Result<Run, AdapterError>;

    /// Cancel a run that has not been paid for
    async fn cancel_run(&self, run_id: &RunId) -> Result<Run, AdapterError>;

    async fn get_run(&self, run_id: &RunId) -> Result<Run, AdapterError>;

    /// Runs created by the authenticated user
    async fn list_runs(&self) -> Result<Vec<Run>, AdapterError>;

    async fn get_recipe(&self, name: &str) -> Result<Recipe, AdapterError>;

    async fn list_recipes(&self) -> Result<Vec<Recipe>, AdapterError>;
}

#[async_trait]
impl<T: Registry + ?Sized> Registry for Arc<T> {
    async fn create_run(&self, recipe_id: &RecipeId, chain_id: u64) -> Result<Run, AdapterError> {
        (**self).create_run(recipe_id, chain_id).await
    }

    async fn cancel_run(&self, run_id: &RunId) -> Result<Run, AdapterError> {
        (**self).cancel_run(run_id).await
    }

    async fn get_run(&self, run_id: &RunId) -> Result<Run, AdapterError> {
        (**self).get_run(run_id).await
    }

    async fn list_runs(&self) -> Result<Vec<Run>, AdapterError> {
        (**self).list_runs().await
    }

    async fn get_recipe(&self, name: &str) -> Result<Recipe, AdapterError> {
        (**self).get_recipe(name).await
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, AdapterError> {
        (**self).list_recipes().await
    }
}

/// Broadcasts payment transactions and retrieves their receipts.
#[async_trait]
pub trait PaymentSubmitter: Send + Sync {
    /// Broadcast the payment for a run; `Ok(None)` means the submitter
    /// accepted the request but returned no transaction hash
    async fn submit(
        &self,
        contract: &str,
        run_id: &RunId,
        value: u128,
    ) -> Result<Option<String>, AdapterError>;

    /// Block until the transaction receipt is available
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt, AdapterError>;
}

#[async_trait]
impl<T: PaymentSubmitter + ?Sized> PaymentSubmitter for Arc<T> {
    async fn submit(
        &self,
        contract: &str,
        run_id: &RunId,
        value: u128,
    ) -> Result<Option<String>, AdapterError> {
        (**self).submit(contract, run_id, value).await
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt, AdapterError> {
        (**self).wait_for_receipt(tx_hash).await
    }
}

/// Starts attestation creation and resolves the resulting UID.
#[async_trait]
pub trait AttestationService: Send + Sync {
    /// Ask the engine to create the attestation for a paid run; returns
    /// the attestation transaction hash
    async fn start_run(&self, run_id: &RunId) -> Result<String, AdapterError>;

    /// Fetch the attestation UID; `Ok(None)` means the attestation is
    /// not resolved yet, which is not an error
    async fn attestation_uid(&self, run_id: &RunId) -> Result<Option<String>, AdapterError>;
}

#[async_trait]
impl<T: AttestationService + ?Sized> AttestationService for Arc<T> {
    async fn start_run(&self, run_id: &RunId) -> Result<String, AdapterError> {
        (**self).start_run(run_id).await
    }

    async fn attestation_uid(&self, run_id: &RunId) -> Result<Option<String>, AdapterError> {
        (**self).attestation_uid(run_id).await
    }
}
