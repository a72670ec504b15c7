//! In-memory ledger with simulate/validate/commit semantics.
//!
//! ## Protocol
//!
//! 1. [`MemoryLedger::begin`] verifies the caller's credential and opens a
//!    [`LedgerTx`] over the committed state.
//! 2. The transaction executes against the [`Ledger`] trait. Every committed
//!    version it observes (point reads, hash reads and range scans) goes into
//!    its read set; writes and events are buffered. The transaction sees its
//!    own buffered writes.
//! 3. [`LedgerTx::into_proposal`] freezes the result into a [`Proposal`].
//! 4. [`MemoryLedger::commit`] re-checks the read set against current state.
//!    Any changed version, or any key appearing in or vanishing from a
//!    scanned range, rejects the whole proposal with
//!    [`AuctionError::TransactionConflict`]. Otherwise all writes apply at a
//!    single new height and the events are published.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sealbid_types::{
    AuctionError, CommitmentHash, CompositeKey, Identity, Partition, Result, TxId,
};

use crate::{Credential, Ledger, MembershipService};

type StateKey = (Partition, String);

#[derive(Debug, Clone)]
struct Versioned {
    value: Vec<u8>,
    version: u64,
}

/// Event published by a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub tx_id: TxId,
    pub name: String,
    pub payload: Vec<u8>,
}

/// Result of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_id: TxId,
    /// Ledger height after applying the proposal.
    pub height: u64,
    pub writes: usize,
    pub events: usize,
}

#[derive(Debug, Clone)]
struct RangeRead {
    partition: Partition,
    start: String,
    end: String,
    observed: Vec<(String, u64)>,
}

/// A simulated transaction awaiting validation.
#[derive(Debug, Clone)]
pub struct Proposal {
    tx_id: TxId,
    reads: BTreeMap<StateKey, Option<u64>>,
    range_reads: Vec<RangeRead>,
    writes: BTreeMap<StateKey, Option<Vec<u8>>>,
    events: Vec<LedgerEvent>,
}

impl Proposal {
    #[must_use]
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty() && self.events.is_empty()
    }
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

/// Committed ledger state plus the membership service.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: BTreeMap<StateKey, Versioned>,
    height: u64,
    events: Vec<LedgerEvent>,
    membership: MembershipService,
}

impl MemoryLedger {
    #[must_use]
    pub fn new(membership: MembershipService) -> Self {
        Self {
            state: BTreeMap::new(),
            height: 0,
            events: Vec::new(),
            membership,
        }
    }

    /// Number of committed transactions that wrote or emitted anything.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Events published so far, in commit order.
    #[must_use]
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Number of live committed records across all partitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Whether a committed record exists. Bypasses partition access checks.
    #[must_use]
    pub fn contains(&self, partition: &Partition, key: &CompositeKey) -> bool {
        self.state.contains_key(&(partition.clone(), key.encode()))
    }

    /// Open a transaction for the holder of `credential`.
    ///
    /// # Errors
    /// [`AuctionError::PermissionDenied`] if the credential does not verify.
    pub fn begin(&self, credential: &Credential) -> Result<LedgerTx<'_>> {
        let identity = self.membership.verify(credential)?;
        let tx_id = TxId::new();
        debug!(%tx_id, caller = %identity, "Transaction started");
        Ok(LedgerTx {
            ledger: self,
            identity,
            tx_id,
            timestamp: Utc::now(),
            reads: BTreeMap::new(),
            range_reads: Vec::new(),
            writes: BTreeMap::new(),
            events: Vec::new(),
        })
    }

    /// Validate `proposal` against current state and apply it.
    ///
    /// # Errors
    /// [`AuctionError::TransactionConflict`] if anything it read has changed.
    pub fn commit(&mut self, proposal: Proposal) -> Result<CommitReceipt> {
        for (state_key, seen) in &proposal.reads {
            let current = self.state.get(state_key).map(|v| v.version);
            if current != *seen {
                let key = describe(&state_key.0, &state_key.1);
                warn!(tx_id = %proposal.tx_id, %key, "Stale read, proposal rejected");
                return Err(AuctionError::TransactionConflict { key });
            }
        }
        for range in &proposal.range_reads {
            let current: Vec<(String, u64)> = self
                .scan(&range.partition, &range.start, &range.end)
                .map(|(k, v)| (k.clone(), v.version))
                .collect();
            if current != range.observed {
                let key = format!("range {}", describe(&range.partition, &range.start));
                warn!(tx_id = %proposal.tx_id, %key, "Phantom in scanned range, proposal rejected");
                return Err(AuctionError::TransactionConflict { key });
            }
        }

        let writes = proposal.writes.len();
        let events = proposal.events.len();
        if proposal.is_read_only() {
            return Ok(CommitReceipt {
                tx_id: proposal.tx_id,
                height: self.height,
                writes,
                events,
            });
        }

        self.height += 1;
        let version = self.height;
        for (state_key, write) in proposal.writes {
            match write {
                Some(value) => {
                    self.state.insert(state_key, Versioned { value, version });
                }
                None => {
                    self.state.remove(&state_key);
                }
            }
        }
        self.events.extend(proposal.events);

        info!(tx_id = %proposal.tx_id, height = version, writes, events, "Transaction committed");
        Ok(CommitReceipt {
            tx_id: proposal.tx_id,
            height: version,
            writes,
            events,
        })
    }

    /// Simulate `f` for the holder of `credential` and commit the result.
    ///
    /// If `f` fails, nothing it wrote or emitted reaches the ledger.
    pub fn transact<T, F>(&mut self, credential: &Credential, f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerTx<'_>) -> Result<T>,
    {
        let (value, proposal) = {
            let mut tx = self.begin(credential)?;
            match f(&mut tx) {
                Ok(value) => (value, tx.into_proposal()),
                Err(err) => {
                    debug!(tx_id = %tx.tx_id, error = %err, "Transaction discarded");
                    return Err(err);
                }
            }
        };
        self.commit(proposal)?;
        Ok(value)
    }

    fn scan<'a>(
        &'a self,
        partition: &Partition,
        start: &str,
        end: &str,
    ) -> impl Iterator<Item = (&'a String, &'a Versioned)> + 'a {
        self.state
            .range((partition.clone(), start.to_string())..(partition.clone(), end.to_string()))
            .map(|((_, k), v)| (k, v))
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl MemoryLedger {
    /// Ledger whose membership service knows every given organization.
    pub fn with_authorities(
        config: sealbid_types::AuctionConfig,
        authorities: &[&crate::OrgAuthority],
    ) -> Self {
        let mut membership = MembershipService::new(config);
        for authority in authorities {
            membership.register_org(authority.org().clone(), authority.verifying_key());
        }
        Self::new(membership)
    }
}

fn describe(partition: &Partition, encoded: &str) -> String {
    match CompositeKey::parse(encoded) {
        Ok(key) => format!("{partition}:{key}"),
        Err(_) => format!("{partition}:{}", encoded.escape_debug()),
    }
}

// ---------------------------------------------------------------------------
// LedgerTx
// ---------------------------------------------------------------------------

/// One executing transaction.
#[derive(Debug)]
pub struct LedgerTx<'a> {
    ledger: &'a MemoryLedger,
    identity: Identity,
    tx_id: TxId,
    timestamp: DateTime<Utc>,
    reads: BTreeMap<StateKey, Option<u64>>,
    range_reads: Vec<RangeRead>,
    writes: BTreeMap<StateKey, Option<Vec<u8>>>,
    events: Vec<LedgerEvent>,
}

impl LedgerTx<'_> {
    /// Freeze this transaction into a proposal for [`MemoryLedger::commit`].
    #[must_use]
    pub fn into_proposal(self) -> Proposal {
        Proposal {
            tx_id: self.tx_id,
            reads: self.reads,
            range_reads: self.range_reads,
            writes: self.writes,
            events: self.events,
        }
    }

    fn check_access(&self, partition: &Partition, op: &str) -> Result<()> {
        match partition.owner() {
            Some(owner) if *owner != self.identity.org => {
                Err(AuctionError::permission_denied(format!(
                    "{op} on {partition} by member of {}",
                    self.identity.org
                )))
            }
            _ => Ok(()),
        }
    }

    fn read_committed(&mut self, state_key: &StateKey) -> Option<Vec<u8>> {
        let committed = self.ledger.state.get(state_key);
        self.reads
            .entry(state_key.clone())
            .or_insert_with(|| committed.map(|v| v.version));
        committed.map(|v| v.value.clone())
    }

    fn effective(&mut self, state_key: &StateKey) -> Option<Vec<u8>> {
        match self.writes.get(state_key) {
            Some(buffered) => buffered.clone(),
            None => self.read_committed(state_key),
        }
    }
}

impl Ledger for LedgerTx<'_> {
    fn put(&mut self, partition: &Partition, key: &CompositeKey, value: Vec<u8>) -> Result<()> {
        self.check_access(partition, "put")?;
        self.writes.insert((partition.clone(), key.encode()), Some(value));
        Ok(())
    }

    fn get(&mut self, partition: &Partition, key: &CompositeKey) -> Result<Option<Vec<u8>>> {
        self.check_access(partition, "get")?;
        Ok(self.effective(&(partition.clone(), key.encode())))
    }

    fn delete(&mut self, partition: &Partition, key: &CompositeKey) -> Result<()> {
        self.check_access(partition, "delete")?;
        self.writes.insert((partition.clone(), key.encode()), None);
        Ok(())
    }

    fn range_scan(
        &mut self,
        partition: &Partition,
        prefix: &CompositeKey,
    ) -> Result<Vec<(CompositeKey, Vec<u8>)>> {
        self.check_access(partition, "range_scan")?;
        let start = prefix.encode();
        let end = prefix.range_end();

        let mut merged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        let mut observed = Vec::new();
        for (k, v) in self.ledger.scan(partition, &start, &end) {
            observed.push((k.clone(), v.version));
            merged.insert(k.clone(), v.value.clone());
        }
        self.range_reads.push(RangeRead {
            partition: partition.clone(),
            start: start.clone(),
            end: end.clone(),
            observed,
        });

        let buffered = self
            .writes
            .range((partition.clone(), start)..(partition.clone(), end));
        for ((_, k), write) in buffered {
            match write {
                Some(value) => {
                    merged.insert(k.clone(), value.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }

        merged
            .into_iter()
            .map(|(k, v)| Ok((CompositeKey::parse(&k)?, v)))
            .collect()
    }

    fn hash_of(
        &mut self,
        partition: &Partition,
        key: &CompositeKey,
    ) -> Result<Option<CommitmentHash>> {
        let value = self.effective(&(partition.clone(), key.encode()));
        Ok(value.map(|v| CommitmentHash::of_bytes(&v)))
    }

    fn caller_identity(&self) -> &Identity {
        &self.identity
    }

    fn tx_id(&self) -> TxId {
        self.tx_id
    }

    fn tx_timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn emit_event(&mut self, name: &str, payload: Vec<u8>) -> Result<()> {
        self.events.push(LedgerEvent {
            tx_id: self.tx_id,
            name: name.to_string(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sealbid_types::{AuctionConfig, OrgId};

    use super::*;
    use crate::OrgAuthority;

    struct Fixture {
        ledger: MemoryLedger,
        org1: OrgAuthority,
        org2: OrgAuthority,
    }

    fn fixture() -> Fixture {
        let org1 = OrgAuthority::new("Org1MSP");
        let org2 = OrgAuthority::new("Org2MSP");
        let ledger = MemoryLedger::with_authorities(AuctionConfig::default(), &[&org1, &org2]);
        Fixture { ledger, org1, org2 }
    }

    fn key(object: &str, attrs: &[&str]) -> CompositeKey {
        CompositeKey::new(object, attrs.iter().copied()).unwrap()
    }

    fn org1_private() -> Partition {
        Partition::OrgPrivate(OrgId::new("Org1MSP"))
    }

    #[test]
    fn committed_writes_are_visible_to_later_transactions() {
        let mut f = fixture();
        let alice = f.org1.member("alice");
        f.ledger
            .transact(&alice, |tx| tx.put(&Partition::Public, &key("k", &["1"]), b"v".to_vec()))
            .unwrap();
        let value = f
            .ledger
            .transact(&alice, |tx| tx.get(&Partition::Public, &key("k", &["1"])))
            .unwrap();
        assert_eq!(value.as_deref(), Some(&b"v"[..]));
        assert_eq!(f.ledger.height(), 1);
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let mut f = fixture();
        let alice = f.org1.member("alice");
        f.ledger
            .transact(&alice, |tx| {
                let k = key("k", &["1"]);
                tx.put(&Partition::Public, &k, b"v".to_vec())?;
                assert_eq!(tx.get(&Partition::Public, &k)?.as_deref(), Some(&b"v"[..]));
                assert_eq!(tx.range_scan(&Partition::Public, &key("k", &[]))?.len(), 1);
                tx.delete(&Partition::Public, &k)?;
                assert!(tx.get(&Partition::Public, &k)?.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn failed_transaction_leaves_no_trace() {
        let mut f = fixture();
        let alice = f.org1.member("alice");
        let err = f
            .ledger
            .transact(&alice, |tx| {
                tx.put(&Partition::Public, &key("k", &["1"]), b"v".to_vec())?;
                tx.emit_event("Something", Vec::new())?;
                Err::<(), _>(AuctionError::invalid_state("boom"))
            })
            .unwrap_err();
        assert!(matches!(err, AuctionError::InvalidState { .. }));
        assert!(f.ledger.is_empty());
        assert!(f.ledger.events().is_empty());
        assert_eq!(f.ledger.height(), 0);
    }

    #[test]
    fn stale_point_read_conflicts() {
        let mut f = fixture();
        let alice = f.org1.member("alice");
        let k = key("k", &["1"]);

        let (p1, p2) = {
            let mut t1 = f.ledger.begin(&alice).unwrap();
            let mut t2 = f.ledger.begin(&alice).unwrap();
            assert!(t1.get(&Partition::Public, &k).unwrap().is_none());
            assert!(t2.get(&Partition::Public, &k).unwrap().is_none());
            t1.put(&Partition::Public, &k, b"a".to_vec()).unwrap();
            t2.put(&Partition::Public, &k, b"b".to_vec()).unwrap();
            (t1.into_proposal(), t2.into_proposal())
        };
        f.ledger.commit(p1).unwrap();
        let err = f.ledger.commit(p2).unwrap_err();
        assert!(matches!(err, AuctionError::TransactionConflict { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn phantom_in_scanned_range_conflicts() {
        let mut f = fixture();
        let alice = f.org1.member("alice");

        let (scanner, inserter) = {
            let mut t1 = f.ledger.begin(&alice).unwrap();
            let mut t2 = f.ledger.begin(&alice).unwrap();
            let seen = t1.range_scan(&Partition::Public, &key("bid", &["apples"])).unwrap();
            assert!(seen.is_empty());
            t1.put(&Partition::Public, &key("summary", &["apples"]), b"0".to_vec()).unwrap();
            t2.put(&Partition::Public, &key("bid", &["apples", "x"]), b"1".to_vec()).unwrap();
            (t1.into_proposal(), t2.into_proposal())
        };
        f.ledger.commit(inserter).unwrap();
        let err = f.ledger.commit(scanner).unwrap_err();
        assert!(matches!(err, AuctionError::TransactionConflict { .. }));
    }

    #[test]
    fn private_partition_is_org_scoped() {
        let mut f = fixture();
        let alice = f.org1.member("alice");
        let bob = f.org2.member("bob");
        let k = key("bid", &["apples", "1"]);

        f.ledger
            .transact(&alice, |tx| tx.put(&org1_private(), &k, b"secret".to_vec()))
            .unwrap();

        let err = f
            .ledger
            .transact(&bob, |tx| tx.get(&org1_private(), &k))
            .unwrap_err();
        assert!(matches!(err, AuctionError::PermissionDenied { .. }));

        let err = f
            .ledger
            .transact(&bob, |tx| tx.put(&org1_private(), &k, b"x".to_vec()))
            .unwrap_err();
        assert!(matches!(err, AuctionError::PermissionDenied { .. }));

        // Hashes of foreign confidential data are readable.
        let hash = f
            .ledger
            .transact(&bob, |tx| tx.hash_of(&org1_private(), &k))
            .unwrap();
        assert_eq!(hash, Some(CommitmentHash::of_bytes(b"secret")));
    }

    #[test]
    fn range_scan_is_ordered_and_prefix_bounded() {
        let mut f = fixture();
        let alice = f.org1.member("alice");
        f.ledger
            .transact(&alice, |tx| {
                let rows = [["apples", "b"], ["apples", "a"], ["applesauce", "c"], ["pears", "d"]];
                for attrs in rows {
                    tx.put(&Partition::Public, &key("bid", &attrs), attrs[1].as_bytes().to_vec())?;
                }
                Ok(())
            })
            .unwrap();
        let found = f
            .ledger
            .transact(&alice, |tx| tx.range_scan(&Partition::Public, &key("bid", &["apples"])))
            .unwrap();
        let values: Vec<_> = found.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn events_publish_on_commit_only() {
        let mut f = fixture();
        let alice = f.org1.member("alice");
        let tx_id = f
            .ledger
            .transact(&alice, |tx| {
                tx.emit_event("CreateAuction", b"{}".to_vec())?;
                Ok(tx.tx_id())
            })
            .unwrap();
        assert_eq!(f.ledger.events().len(), 1);
        assert_eq!(f.ledger.events()[0].tx_id, tx_id);
        assert_eq!(f.ledger.events()[0].name, "CreateAuction");
    }

    #[test]
    fn caller_identity_comes_from_credential() {
        let mut f = fixture();
        let admin = f.org2.with_role("root", "auctionAdmin");
        let identity = f
            .ledger
            .transact(&admin, |tx| Ok(tx.caller_identity().clone()))
            .unwrap();
        assert_eq!(identity.org, OrgId::new("Org2MSP"));
        assert!(identity.has(sealbid_types::Capability::AuctionAdmin));
    }
}
