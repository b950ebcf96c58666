//! Run state as tracked by the remote registry.
//!
//! A Run is one execution of a recipe, from initialization through payment
//! to attestation resolution. The registry is the source of truth; a Run
//! held in memory is cached client state. Optional fields are only ever
//! filled in as the run progresses, never cleared.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::recipe::RecipeId;

/// Registry-issued run identifier, 12 bytes.
pub type RunId = [u8; 12];

/// Parse a run id from its hex representation (with or without `0x`).
pub fn run_id_from_hex(s: &str) -> Result<RunId, IdError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|_| IdError::NotHex)?;
    bytes
        .try_into()
        .map_err(|_| IdError::WrongLength { expected: 12 })
}

/// Hex representation of a run id, `0x`-prefixed.
pub fn run_id_hex(id: &RunId) -> String {
    format!("0x{}", hex::encode(id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("id is not valid hex")]
    NotHex,

    #[error("id must be {expected} bytes")]
    WrongLength { expected: usize },
}

/// Registry-side verdict on the payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentVerifiedStatus {
    Pending,
    Verified,
    VerificationFailed,
}

/// One execution of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Registry-issued identifier
    pub id: RunId,

    /// Recipe this run executes
    pub recipe_id: RecipeId,

    /// Address of the user who created the run
    pub creator: String,

    /// Chain the attestation targets
    pub chain_id: u64,

    /// Fee in wei, due before the attestation is created
    pub fee: u128,

    /// Creation time, unix seconds
    pub created: u64,

    /// Hash of the payment transaction, present once submitted
    #[serde(default)]
    pub payment_transaction_hash: Option<String>,

    /// Registry verdict on the payment
    #[serde(default)]
    pub payment_verified_status: Option<PaymentVerifiedStatus>,

    /// Last payment verification failure reported by the registry
    #[serde(default)]
    pub payment_verify_error: Option<String>,

    /// Hash of the attestation transaction, present once the
    /// attestation call succeeds
    #[serde(default)]
    pub attestation_transaction_hash: Option<String>,

    /// Attestation UID, present once resolved on chain
    #[serde(default)]
    pub attestation_uid: Option<String>,

    /// Last attestation creation failure reported by the registry
    #[serde(default)]
    pub attestation_create_error: Option<String>,

    /// Whether the run was cancelled before payment
    #[serde(default)]
    pub is_cancelled: bool,
}

impl Run {
    /// Hex representation of the run id
    pub fn id_hex(&self) -> String {
        run_id_hex(&self.id)
    }

    /// A payment transaction has been submitted for this run
    pub fn is_paid(&self) -> bool {
        self.payment_transaction_hash.is_some()
    }

    /// The attestation transaction has been submitted
    pub fn is_attested(&self) -> bool {
        self.attestation_transaction_hash.is_some()
    }

    /// The attestation UID has been resolved
    pub fn is_resolved(&self) -> bool {
        self.attestation_uid.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_run() -> Run {
        Run {
            id: [1u8; 12],
            recipe_id: [2u8; 12],
            creator: "0xa32aECda752cF4EF89956e83d60C04835d4FA867".to_string(),
            chain_id: 11155111,
            fee: 100,
            created: 1_700_000_000,
            payment_transaction_hash: None,
            payment_verified_status: None,
            payment_verify_error: None,
            attestation_transaction_hash: None,
            attestation_uid: None,
            attestation_create_error: None,
            is_cancelled: false,
        }
    }

    #[test]
    fn test_progress_predicates() {
        let mut run = test_run();
        assert!(!run.is_paid());
        assert!(!run.is_attested());
        assert!(!run.is_resolved());

        run.payment_transaction_hash = Some("0xA".to_string());
        assert!(run.is_paid());

        run.attestation_transaction_hash = Some("0xB".to_string());
        run.attestation_uid = Some("U1".to_string());
        assert!(run.is_attested());
        assert!(run.is_resolved());
    }

    #[test]
    fn test_run_id_hex_roundtrip() {
        let id: RunId = [0xab; 12];
        let hex = run_id_hex(&id);
        assert_eq!(hex, "0xabababababababababababab");
        assert_eq!(run_id_from_hex(&hex).unwrap(), id);
        assert_eq!(run_id_from_hex("abababababababababababab").unwrap(), id);
    }

    #[test]
    fn test_run_id_parse_errors() {
        assert_eq!(run_id_from_hex("0xzz"), Err(IdError::NotHex));
        assert_eq!(
            run_id_from_hex("0xabcd"),
            Err(IdError::WrongLength { expected: 12 })
        );
    }

    #[test]
    fn test_run_wire_format() {
        let json = serde_json::to_value(test_run()).unwrap();
        // Ids travel as byte arrays, optional fields as null
        assert!(json["id"].is_array());
        assert!(json["payment_transaction_hash"].is_null());
        assert_eq!(json["fee"], 100);
    }
}
