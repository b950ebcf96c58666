//! attestor - client for a recipe-based on-chain attestation engine
//!
//! Users pick a recipe (a templated query against external data
//! sources), pay the run fee in the chain's native token, and the engine
//! produces an on-chain attestation referencing the query result. This
//! crate owns the client-side workflow that drives one run end to end.
//!
//! # Architecture
//!
//! The workflow orchestrator sequences a run through its steps:
//! - Create the run in the remote registry
//! - Submit the payment transaction and wait for its receipt
//! - Trigger attestation creation
//! - Poll for the attestation UID with a bounded budget
//!
//! The registry is the source of truth for all durable state; the
//! orchestrator holds observable, best-effort cached state only.
//!
//! # Modules
//!
//! - `adapters`: external collaborators (registry, payment, attestation)
//! - `core`: orchestration logic (RunWorkflow, WorkflowState, PollPolicy)
//! - `domain`: data structures (Run, Recipe)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List recipes
//! attestor recipes
//!
//! # Run a recipe end to end
//! attestor run ens-name-holder --chain 10
//!
//! # Check a run later
//! attestor status 0x0102030405060708090a0b0c
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{AdapterError, AttestationService, PaymentSubmitter, Registry, TransactionReceipt};
pub use core::{PollPolicy, RunWorkflow, WorkflowSettings, WorkflowState, WorkflowStatus};
pub use domain::{Recipe, Run};
