//! Allocation root for cross-peer consistency.
//!
//! Every endorsing peer clearing the same round must produce the same fills.
//! The allocation root is a hash over the round's identity, totals and every
//! party's counters in key order, published with lifecycle events so peers
//! and auditors can compare outcomes without diffing full round records.

use sealbid_types::AuctionRound;
use sha2::{Digest, Sha256};

/// Compute the allocation root of a cleared round.
#[must_use]
pub fn compute_allocation_root(round: &AuctionRound) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"sealbid:allocation_root:v1:");
    update_field(&mut hasher, round.auction_id.as_str());
    hasher.update(round.round.0.to_le_bytes());
    update_field(&mut hasher, &round.price.normalize().to_string());
    hasher.update(round.quantity.to_le_bytes());
    hasher.update(round.demand.to_le_bytes());
    hasher.update(round.sold.to_le_bytes());

    hasher.update((round.sellers.len() as u64).to_le_bytes());
    for (key, seller) in &round.sellers {
        hasher.update(key.0.as_bytes());
        hasher.update(seller.quantity.to_le_bytes());
        hasher.update(seller.sold.to_le_bytes());
        hasher.update(seller.unsold.to_le_bytes());
    }

    hasher.update((round.bidders.len() as u64).to_le_bytes());
    for (key, bidder) in &round.bidders {
        hasher.update(key.0.as_bytes());
        hasher.update(bidder.quantity.to_le_bytes());
        hasher.update(bidder.won.to_le_bytes());
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Length-prefixed so adjacent variable fields cannot run together.
fn update_field(hasher: &mut Sha256, field: &str) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}

/// Hex form of [`compute_allocation_root`], as carried in event payloads.
#[must_use]
pub fn allocation_root_hex(round: &AuctionRound) -> String {
    hex::encode(compute_allocation_root(round))
}

/// Recompute the root of `round` and compare with `expected_root`.
#[must_use]
pub fn verify_allocation_root(round: &AuctionRound, expected_root: &[u8; 32]) -> bool {
    compute_allocation_root(round) == *expected_root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocate;

    #[test]
    fn same_round_same_root() {
        let mut round = AuctionRound::dummy(10, 0, &[100], &[40, 40, 40]);
        allocate(&mut round);
        let replica = reopened_later(&round);
        assert_eq!(compute_allocation_root(&round), compute_allocation_root(&replica));
        assert!(verify_allocation_root(&replica, &compute_allocation_root(&round)));
    }

    #[test]
    fn different_fill_different_root() {
        let mut round = AuctionRound::dummy(10, 0, &[100], &[40, 40, 40]);
        allocate(&mut round);
        let root = compute_allocation_root(&round);
        round.bidders.values_mut().next().unwrap().won += 1;
        assert!(!verify_allocation_root(&round, &root));
    }

    #[test]
    fn price_scale_does_not_change_root() {
        let mut round = AuctionRound::dummy(10, 0, &[100], &[40, 40, 40]);
        allocate(&mut round);
        let mut rescaled = round.clone();
        rescaled.price = rust_decimal::Decimal::new(1000, 2);
        assert_eq!(compute_allocation_root(&round), compute_allocation_root(&rescaled));

        rescaled.price = rust_decimal::Decimal::new(1001, 2);
        assert_ne!(compute_allocation_root(&round), compute_allocation_root(&rescaled));
    }

    #[test]
    fn hex_root_is_64_chars() {
        let round = AuctionRound::dummy(10, 0, &[1], &[1]);
        assert_eq!(allocation_root_hex(&round).len(), 64);
    }

    /// Same round, different open timestamp.
    fn reopened_later(round: &AuctionRound) -> AuctionRound {
        let mut shifted = round.clone();
        shifted.opened_at = round.opened_at + chrono::Duration::seconds(60);
        shifted
    }
}
