//! Observable workflow state.
//!
//! Status is an explicit tagged union rather than being inferred from
//! which optional Run fields happen to be set. Presentation layers read
//! snapshots of [`WorkflowState`] through a watch channel; every
//! transition publishes a new snapshot.

use serde::{Deserialize, Serialize};

use crate::domain::{Recipe, Run};

/// Position of the run workflow in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// No workflow in progress
    Idle,

    /// Creating the run in the registry
    Initializing,

    /// Submitting the payment transaction
    PaymentPending,

    /// Payment submitted, waiting for the receipt
    PaymentSubmitted,

    /// Payment transaction confirmed on chain
    PaymentConfirmed,

    /// Asking the attestation service to start the run
    AttestationPending,

    /// Attestation transaction submitted, polling for the UID
    AttestationSubmitted,

    /// Attestation UID resolved
    AttestationResolved,

    /// UID poll budget exhausted without a result; the registry may
    /// still resolve the UID later
    AttestationUnresolved,

    /// A step failed; requires reset before a new attempt
    Errored,
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl WorkflowStatus {
    /// No further transitions happen from this status without a reset
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AttestationResolved | Self::AttestationUnresolved | Self::Errored
        )
    }

    /// Short lowercase label for display
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::PaymentPending => "payment-pending",
            Self::PaymentSubmitted => "payment-submitted",
            Self::PaymentConfirmed => "payment-confirmed",
            Self::AttestationPending => "attestation-pending",
            Self::AttestationSubmitted => "attestation-submitted",
            Self::AttestationResolved => "attestation-resolved",
            Self::AttestationUnresolved => "attestation-unresolved",
            Self::Errored => "errored",
        }
    }
}

/// Snapshot of the workflow as seen by presentation layers.
#[derive(Debug, Clone, Default)]
pub struct WorkflowState {
    pub status: WorkflowStatus,

    /// Recipe the next workflow invocation will run
    pub selected_recipe: Option<Recipe>,

    /// Run owned by the current invocation; cached UI state, the
    /// registry holds the authoritative record
    pub run_in_progress: Option<Run>,

    /// Human-readable description of the current step
    pub progress_message: Option<String>,

    /// Message of the last failure, if any
    pub error_message: Option<String>,

    /// The payment receipt matched the submitted transaction
    pub payment_confirmed: bool,

    /// Outcome of the presentation layer's dry-run of the recipe
    pub simulation_ok: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_idle() {
        let state = WorkflowState::default();
        assert_eq!(state.status, WorkflowStatus::Idle);
        assert!(state.run_in_progress.is_none());
        assert!(state.error_message.is_none());
        assert!(!state.payment_confirmed);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(WorkflowStatus::AttestationResolved.is_terminal());
        assert!(WorkflowStatus::AttestationUnresolved.is_terminal());
        assert!(WorkflowStatus::Errored.is_terminal());

        assert!(!WorkflowStatus::Idle.is_terminal());
        assert!(!WorkflowStatus::PaymentSubmitted.is_terminal());
        assert!(!WorkflowStatus::AttestationPending.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&WorkflowStatus::PaymentConfirmed).unwrap();
        assert_eq!(json, "\"payment_confirmed\"");
    }
}
