//! Error types for the SealBid auction engine.
//!
//! All errors use the `SB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / commitment errors
//! - 2xx: Round lifecycle errors
//! - 3xx: Access errors
//! - 4xx: Clearing errors
//! - 5xx: Ledger errors
//! - 9xx: General / internal errors
//!
//! Every error aborts the enclosing ledger transaction. Only
//! [`AuctionError::TransactionConflict`] is worth retrying; everything else
//! is a business-rule violation or a caller error.

use thiserror::Error;

use crate::RoundStatus;

/// Central error enum for all SealBid operations.
#[derive(Debug, Error)]
pub enum AuctionError {
    // =================================================================
    // Order / Commitment Errors (1xx)
    // =================================================================
    /// A referenced commitment, order or round does not exist.
    #[error("SB_ERR_100: Not found: {what}")]
    NotFound { what: String },

    /// A revealed order does not match its commitment. Treated as tampering.
    #[error("SB_ERR_101: Hash mismatch for {key}: {reason}")]
    HashMismatch { key: String, reason: String },

    /// A published commitment vanished without a recorded deletion.
    #[error("SB_ERR_102: Commitment missing: {key}")]
    CommitmentMissing { key: String },

    /// The order failed validation (bad quantity, price, item, side).
    #[error("SB_ERR_103: Invalid order: {reason}")]
    InvalidOrder { reason: String },

    // =================================================================
    // Round Lifecycle Errors (2xx)
    // =================================================================
    /// Operation attempted against a round or record in the wrong state.
    #[error("SB_ERR_200: Invalid state: {reason}")]
    InvalidState { reason: String },

    /// The round cannot close: outstanding orders or unmet demand remain.
    #[error("SB_ERR_201: Auction still active: {reason}")]
    AuctionStillActive { reason: String },

    // =================================================================
    // Access Errors (3xx)
    // =================================================================
    /// Caller is not the owner, not in the owning organization, or lacks a role.
    #[error("SB_ERR_300: Permission denied: {reason}")]
    PermissionDenied { reason: String },

    // =================================================================
    // Clearing Errors (4xx)
    // =================================================================
    /// Allocation produced a state that sells or fills more than exists.
    #[error("SB_ERR_400: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // Ledger Errors (5xx)
    // =================================================================
    /// A composite key component is empty or contains a reserved character.
    #[error("SB_ERR_500: Invalid key: {reason}")]
    InvalidKey { reason: String },

    /// The transaction's read set went stale before commit.
    #[error("SB_ERR_501: Transaction conflict on {key}")]
    TransactionConflict { key: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("SB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("SB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config document, bad values).
    #[error("SB_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl AuctionError {
    /// Shorthand for [`AuctionError::NotFound`].
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Shorthand for [`AuctionError::InvalidState`].
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// [`AuctionError::InvalidState`] for a round in the wrong lifecycle status.
    pub fn wrong_status(expected: RoundStatus, actual: RoundStatus) -> Self {
        Self::InvalidState {
            reason: format!("expected round status {expected}, got {actual}"),
        }
    }

    /// Shorthand for [`AuctionError::PermissionDenied`].
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            reason: reason.into(),
        }
    }

    /// Whether a client may resubmit the same operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AuctionError>;

impl From<serde_json::Error> for AuctionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = AuctionError::not_found("round 3");
        let msg = format!("{err}");
        assert!(msg.starts_with("SB_ERR_100"), "Got: {msg}");
        assert!(msg.contains("round 3"));
    }

    #[test]
    fn wrong_round_status_display() {
        let err = AuctionError::wrong_status(RoundStatus::Open, RoundStatus::Closed);
        let msg = format!("{err}");
        assert!(matches!(err, AuctionError::InvalidState { .. }));
        assert!(msg.contains("SB_ERR_200"));
        assert!(msg.contains("OPEN"));
        assert!(msg.contains("CLOSED"));
    }

    #[test]
    fn only_conflicts_are_retryable() {
        assert!(
            AuctionError::TransactionConflict {
                key: "k".into()
            }
            .is_retryable()
        );
        assert!(!AuctionError::permission_denied("nope").is_retryable());
        assert!(
            !AuctionError::HashMismatch {
                key: "k".into(),
                reason: "r".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn serde_json_error_converts() {
        let err: AuctionError = serde_json::from_str::<u64>("not json").unwrap_err().into();
        assert!(matches!(err, AuctionError::Serialization(_)));
    }

    #[test]
    fn all_errors_have_sb_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(AuctionError::CommitmentMissing { key: "k".into() }),
            Box::new(AuctionError::AuctionStillActive {
                reason: "r".into(),
            }),
            Box::new(AuctionError::InvalidKey { reason: "r".into() }),
            Box::new(AuctionError::Internal("test".into())),
            Box::new(AuctionError::SupplyInvariantViolation {
                reason: "r".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("SB_ERR_"),
                "Error missing SB_ERR_ prefix: {msg}"
            );
        }
    }
}
