//! Domain types for the attestation engine client.
//!
//! This module contains the wire-level data structures:
//! - Recipe: attestation templates and their queries
//! - Run: one execution of a recipe, from payment to attestation

pub mod recipe;
pub mod run;

// Re-export commonly used types
pub use recipe::{Recipe, RecipeId, RecipePublishState, RecipeQuery};
pub use run::{run_id_from_hex, run_id_hex, PaymentVerifiedStatus, Run, RunId};
