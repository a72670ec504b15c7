//! # sealbid-ledger
//!
//! The ledger collaborator the auction engine runs on.
//!
//! ## Architecture
//!
//! - [`Ledger`]: the narrow, transaction-scoped interface every engine
//!   operation receives (`put`, `get`, `delete`, `range_scan`, `hash_of`,
//!   caller identity, transaction id/timestamp, events).
//! - [`MemoryLedger`]: in-memory implementation with simulate/validate/commit
//!   semantics. A [`LedgerTx`] records the versions it read and buffers its
//!   writes; [`MemoryLedger::commit`] rejects a [`Proposal`] whose reads went
//!   stale and otherwise applies everything atomically.
//! - [`MembershipService`]: verifies ed25519-signed [`Credential`]s and
//!   derives the caller's [`sealbid_types::Capabilities`].

pub mod ledger;
pub mod membership;
pub mod memory;

pub use ledger::Ledger;
pub use membership::{Credential, MembershipService};
pub use memory::{CommitReceipt, LedgerEvent, LedgerTx, MemoryLedger, Proposal};

#[cfg(any(test, feature = "test-helpers"))]
pub use membership::OrgAuthority;
