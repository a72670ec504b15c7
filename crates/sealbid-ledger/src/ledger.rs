//! The transaction-scoped ledger interface.

use chrono::{DateTime, Utc};
use sealbid_types::{CommitmentHash, CompositeKey, Identity, Partition, Result, TxId};

/// View of the replicated ledger from inside one transaction.
///
/// Reads take `&mut self` because implementations record what was read for
/// commit-time validation. Nothing written through this trait is visible to
/// other transactions until the transaction commits.
pub trait Ledger {
    /// Write `value` under `key`.
    ///
    /// # Errors
    /// [`sealbid_types::AuctionError::PermissionDenied`] when writing into a
    /// confidential partition of another organization.
    fn put(&mut self, partition: &Partition, key: &CompositeKey, value: Vec<u8>) -> Result<()>;

    /// Read the value under `key`, if any.
    fn get(&mut self, partition: &Partition, key: &CompositeKey) -> Result<Option<Vec<u8>>>;

    /// Remove `key`. Deleting an absent key is not an error.
    fn delete(&mut self, partition: &Partition, key: &CompositeKey) -> Result<()>;

    /// Every entry whose key has `prefix` as a leading partial key, in key
    /// order.
    fn range_scan(
        &mut self,
        partition: &Partition,
        prefix: &CompositeKey,
    ) -> Result<Vec<(CompositeKey, Vec<u8>)>>;

    /// SHA-256 of the value under `key`, without revealing the value. Allowed
    /// for every partition, including other organizations' confidential ones.
    fn hash_of(
        &mut self,
        partition: &Partition,
        key: &CompositeKey,
    ) -> Result<Option<CommitmentHash>>;

    /// Verified identity of the transaction's submitter.
    fn caller_identity(&self) -> &Identity;

    fn tx_id(&self) -> TxId;

    fn tx_timestamp(&self) -> DateTime<Utc>;

    /// Queue an event, published only if the transaction commits.
    fn emit_event(&mut self, name: &str, payload: Vec<u8>) -> Result<()>;
}
