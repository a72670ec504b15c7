//! # sealbid-clearing
//!
//! **Pure deterministic clearing for SealBid rounds.**
//!
//! Given a round's sellers, bidders and the cumulative quantity sold so far,
//! computes the new cumulative sold and every party's fill. It has:
//!
//! - **Zero side effects**: no ledger access, no identity checks
//! - **Deterministic output**: same round in, same allocation out on every peer
//! - **Floor division only**: truncation residue is reported, never rounded up

pub mod allocation;
pub mod conservation;
pub mod determinism;

pub use allocation::{ClearingOutcome, ClearingRegime, allocate};
pub use conservation::verify_conservation;
pub use determinism::{allocation_root_hex, compute_allocation_root, verify_allocation_root};
