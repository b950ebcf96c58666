//! Registry client for runs and recipes.
//!
//! The registry owns all durable run and recipe state; this client is a
//! thin typed wrapper over its gateway methods.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::{Recipe, RecipeId, Run, RunId};

use super::gateway::GatewayClient;
use super::{AdapterError, Registry};

/// Registry over the engine's HTTP gateway.
pub struct HttpRegistry {
    gateway: GatewayClient,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            gateway: GatewayClient::new(base_url),
        }
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn create_run(&self, recipe_id: &RecipeId, chain_id: u64) -> Result<Run, AdapterError> {
        self.gateway
            .call(
                "run_create",
                json!({ "recipe_id": recipe_id, "chain_id": chain_id }),
            )
            .await
    }

    async fn cancel_run(&self, run_id: &RunId) -> Result<Run, AdapterError> {
        self.gateway
            .call("run_cancel", json!({ "run_id": run_id }))
            .await
    }

    async fn get_run(&self, run_id: &RunId) -> Result<Run, AdapterError> {
        self.gateway
            .call("run_get", json!({ "run_id": run_id }))
            .await
    }

    async fn list_runs(&self) -> Result<Vec<Run>, AdapterError> {
        self.gateway.call("run_list_for_user", json!({})).await
    }

    async fn get_recipe(&self, name: &str) -> Result<Recipe, AdapterError> {
        self.gateway
            .call("recipe_get_by_name", json!({ "name": name }))
            .await
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, AdapterError> {
        self.gateway.call("recipe_list", json!({})).await
    }
}
