//! Run workflow orchestration.
//!
//! Sequences one run end to end: create the run in the registry, submit
//! the payment transaction, wait for its receipt, trigger attestation
//! creation, and poll for the attestation UID with a bounded budget.
//! Every transition publishes a new [`WorkflowState`] snapshot; every
//! step failure is caught locally and stored as a message, nothing
//! propagates past the orchestrator.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{AdapterError, AttestationService, PaymentSubmitter, Registry};
use crate::domain::{Recipe, Run};

use super::poll::{poll, PollPolicy};
use super::state::{WorkflowState, WorkflowStatus};

/// Fixed parameters of one workflow instance.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Chain the runs target
    pub chain_id: u64,

    /// Payment contract receiving the run fee on that chain
    pub payment_contract: String,

    /// Budget for the attestation UID poll
    pub uid_poll: PollPolicy,
}

/// The run workflow orchestrator.
///
/// One invocation runs as a sequence of suspension points on a single
/// logical owner; observers read state through [`RunWorkflow::subscribe`].
/// A reset bumps the generation counter, which every in-flight invocation
/// re-checks after each suspension point, so results arriving after a
/// reset are discarded rather than landing on fresh state.
pub struct RunWorkflow<R, P, A> {
    registry: R,
    payment: P,
    attestation: A,
    settings: WorkflowSettings,
    state: watch::Sender<WorkflowState>,
    generation: AtomicU64,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when an invocation ends, however it ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<R, P, A> RunWorkflow<R, P, A>
where
    R: Registry,
    P: PaymentSubmitter,
    A: AttestationService,
{
    pub fn new(registry: R, payment: P, attestation: A, settings: WorkflowSettings) -> Self {
        let (state, _) = watch::channel(WorkflowState::default());
        Self {
            registry,
            payment,
            attestation,
            settings,
            state,
            generation: AtomicU64::new(0),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Observe state snapshots; a new one is sent on every transition
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.state.subscribe()
    }

    /// Clone of the current state snapshot
    pub fn current_state(&self) -> WorkflowState {
        self.state.borrow().clone()
    }

    /// Select the recipe the next invocation will run
    pub fn select_recipe(&self, recipe: Option<Recipe>) {
        self.state.send_modify(|s| s.selected_recipe = recipe);
    }

    /// Record the outcome of the presentation layer's recipe dry-run
    pub fn set_simulation_ok(&self, ok: bool) {
        self.state.send_modify(|s| s.simulation_ok = Some(ok));
    }

    /// Clear all workflow state and return to `Idle`.
    ///
    /// The selected recipe survives a reset; everything an invocation
    /// wrote is cleared unconditionally. In-flight network operations
    /// are not aborted, but their results will be discarded.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.status = WorkflowStatus::Idle;
            s.run_in_progress = None;
            s.progress_message = None;
            s.error_message = None;
            s.payment_confirmed = false;
            s.simulation_ok = None;
        });
        info!("workflow reset");
    }

    /// Create a run for the selected recipe and drive it to attestation.
    ///
    /// With no recipe selected this performs no remote call and leaves
    /// state unchanged. Initialization failures are stored and halt the
    /// workflow; nothing is retried.
    #[instrument(skip(self))]
    pub async fn init_and_run(&self) {
        let Some(_guard) = self.begin() else { return };
        let gen = self.generation.load(Ordering::SeqCst);

        let Some(recipe) = self.current_state().selected_recipe else {
            debug!("no recipe selected, nothing to run");
            return;
        };

        if !self.update(gen, |s| {
            s.status = WorkflowStatus::Initializing;
            s.progress_message = Some("Initializing run...".to_string());
            s.error_message = None;
        }) {
            return;
        }

        info!(recipe = %recipe.name, chain_id = self.settings.chain_id, "initializing run");

        match self
            .registry
            .create_run(&recipe.id, self.settings.chain_id)
            .await
        {
            Ok(run) => self.pay_and_attest_inner(gen, run).await,
            Err(e) => {
                error!(error = %e, "run initialization failed");
                self.fail(gen, error_text(&e, "Error initializing run."));
            }
        }
    }

    /// Pay for an already-created run and continue to attestation
    #[instrument(skip(self, run), fields(run = %run.id_hex()))]
    pub async fn pay_and_attest(&self, run: Run) {
        let Some(_guard) = self.begin() else { return };
        let gen = self.generation.load(Ordering::SeqCst);
        self.pay_and_attest_inner(gen, run).await;
    }

    /// Create the attestation for an already-paid run
    #[instrument(skip(self, run), fields(run = %run.id_hex()))]
    pub async fn create_attestation(&self, run: Run) {
        let Some(_guard) = self.begin() else { return };
        let gen = self.generation.load(Ordering::SeqCst);
        self.create_attestation_inner(gen, run).await;
    }

    async fn pay_and_attest_inner(&self, gen: u64, mut run: Run) {
        if !self.update(gen, |s| {
            s.run_in_progress = Some(run.clone());
            s.status = WorkflowStatus::PaymentPending;
            s.progress_message = Some("Submitting payment...".to_string());
            s.payment_confirmed = false;
            s.error_message = None;
        }) {
            return;
        }

        let submitted = self
            .payment
            .submit(&self.settings.payment_contract, &run.id, run.fee)
            .await;

        let hash = match submitted {
            Ok(Some(hash)) => hash,
            Ok(None) => {
                error!("payment submission returned no transaction hash");
                self.fail(gen, "Transaction submission returned no hash.".to_string());
                return;
            }
            Err(e) => {
                error!(error = %e, "payment submission failed");
                self.fail(gen, error_text(&e, "Error paying for run."));
                return;
            }
        };

        info!(tx = %hash, "payment submitted");
        run.payment_transaction_hash = Some(hash.clone());
        if !self.update(gen, |s| {
            s.run_in_progress = Some(run.clone());
            s.status = WorkflowStatus::PaymentSubmitted;
            s.progress_message = Some("Waiting for payment confirmation...".to_string());
        }) {
            return;
        }

        let receipt = match self.payment.wait_for_receipt(&hash).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(error = %e, "receipt wait failed");
                self.fail(gen, error_text(&e, "Error waiting for transaction receipt."));
                return;
            }
        };

        // A receipt for a different transaction is a hard failure, not a
        // submission failure
        if receipt.transaction_hash != hash {
            error!(expected = %hash, got = %receipt.transaction_hash, "receipt hash mismatch");
            self.fail(
                gen,
                "Transaction receipt does not match the submitted transaction.".to_string(),
            );
            return;
        }

        if !self.update(gen, |s| {
            s.payment_confirmed = true;
            s.status = WorkflowStatus::PaymentConfirmed;
        }) {
            return;
        }

        self.create_attestation_inner(gen, run).await;
    }

    async fn create_attestation_inner(&self, gen: u64, mut run: Run) {
        if !self.update(gen, |s| {
            s.run_in_progress = Some(run.clone());
            s.status = WorkflowStatus::AttestationPending;
            s.progress_message = Some("Creating attestation...".to_string());
            s.error_message = None;
        }) {
            return;
        }

        match self.attestation.start_run(&run.id).await {
            Ok(tx_hash) => {
                info!(tx = %tx_hash, "attestation transaction submitted");
                run.attestation_transaction_hash = Some(tx_hash);
                if !self.update(gen, |s| {
                    s.run_in_progress = Some(run.clone());
                    s.status = WorkflowStatus::AttestationSubmitted;
                    s.progress_message =
                        Some("Attestation submitted, waiting for UID...".to_string());
                }) {
                    return;
                }
            }
            Err(e) => {
                error!(error = %e, "attestation creation failed");
                self.fail(gen, error_text(&e, "Error creating attestation."));
                return;
            }
        }

        let attestation = &self.attestation;
        let run_id = run.id;
        let uid = poll(&self.settings.uid_poll, || {
            attestation.attestation_uid(&run_id)
        })
        .await;

        match uid {
            Ok(Some(uid)) => {
                info!(%uid, "attestation uid resolved");
                run.attestation_uid = Some(uid);
                self.update(gen, |s| {
                    s.run_in_progress = Some(run.clone());
                    s.status = WorkflowStatus::AttestationResolved;
                    s.progress_message = Some("Attestation resolved.".to_string());
                });
            }
            Ok(None) => {
                // Exhaustion is not an error; the registry may still
                // resolve the UID later
                warn!("uid poll budget exhausted, attestation unresolved");
                self.update(gen, |s| s.status = WorkflowStatus::AttestationUnresolved);
            }
            Err(e) => {
                error!(error = %e, "uid lookup failed");
                self.fail(gen, error_text(&e, "Error getting attestation UID."));
            }
        }
    }

    /// Claim the single in-flight slot; a second invocation while one is
    /// running is rejected without touching state
    fn begin(&self) -> Option<FlightGuard<'_>> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            warn!("a workflow invocation is already in flight, ignoring");
            return None;
        }
        Some(FlightGuard(&self.in_flight))
    }

    /// Apply a state change unless the workflow was reset since `gen`
    fn update(&self, gen: u64, f: impl FnOnce(&mut WorkflowState)) -> bool {
        if self.generation.load(Ordering::SeqCst) != gen {
            debug!("workflow was reset, dropping stale update");
            return false;
        }
        self.state.send_modify(f);
        true
    }

    fn fail(&self, gen: u64, message: String) {
        self.update(gen, |s| {
            s.status = WorkflowStatus::Errored;
            s.error_message = Some(message);
        });
    }
}

/// Message for the shared error field, with a per-step fallback for
/// errors that carry no text
fn error_text(err: &AdapterError, fallback: &str) -> String {
    let message = err.to_string();
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_text_prefers_the_error_message() {
        let err = AdapterError::Remote("Recipe not found".to_string());
        assert_eq!(error_text(&err, "Error initializing run."), "Recipe not found");
    }

    #[test]
    fn test_error_text_falls_back_when_empty() {
        let err = AdapterError::Remote(String::new());
        assert_eq!(
            error_text(&err, "Error initializing run."),
            "Error initializing run."
        );
    }
}
