//! Recipe definitions as served by the registry.
//!
//! A recipe is a named template: a set of queries against external data
//! sources plus a processor that turns the query results into attestation
//! data for a given schema.

use serde::{Deserialize, Serialize};

/// Registry-issued recipe identifier, 12 bytes.
pub type RecipeId = [u8; 12];

/// Publish lifecycle of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipePublishState {
    Draft,
    Unpublished,
    Published,
}

/// One query a recipe issues against an external data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeQuery {
    /// Endpoint the query is sent to
    pub endpoint: String,

    /// Query text (typically GraphQL)
    pub query: String,

    /// Query variables as a JSON template; `{user_eth_address}`-style
    /// placeholders are filled in by the engine
    pub variables: String,
}

/// A named attestation template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Registry-issued identifier
    pub id: RecipeId,

    /// Unique machine name
    pub name: String,

    /// Human-facing name, falls back to `name`
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub keywords: Option<Vec<String>>,

    /// Address of the recipe author
    pub creator: String,

    /// Creation time, unix seconds
    pub created: u64,

    /// Data-source queries, executed in order
    pub queries: Vec<RecipeQuery>,

    /// Script run over the query results to produce attestation data
    pub processor: String,

    /// Attestation schema the output must conform to
    pub schema: String,

    /// Resolver contract for the schema
    pub resolver: String,

    /// Whether produced attestations can be revoked
    pub revokable: bool,

    pub publish_state: RecipePublishState,
}

impl Recipe {
    /// Name to show in listings
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
