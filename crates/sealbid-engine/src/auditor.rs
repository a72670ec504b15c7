//! Outstanding-order auditor.
//!
//! Before a round may clear, every published commitment for the round's item
//! that has not been folded into the round is inspected:
//!
//! - Commitments of the caller's own organization are opened. A bid priced
//!   strictly above the round price (or an ask strictly below it) means the
//!   round would clear while a better order is being withheld.
//! - Commitments of other organizations cannot be opened. The auditor only
//!   confirms their private payload still exists; a commitment whose payload
//!   vanished is treated as tampering.
//!
//! Endorsement by every organization is what makes the check complete: each
//! organization's peer opens its own outstanding orders.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use sealbid_ledger::Ledger;
use sealbid_types::{
    AuctionError, ItemId, OrderKey, OrderSide, Partition, PrivateOrder, PublicOrderHash, Result,
    SubmissionId,
};

/// Fail if an un-folded bid of the caller's organization beats `price`.
///
/// # Errors
/// - [`AuctionError::AuctionStillActive`] if such a bid exists.
/// - [`AuctionError::CommitmentMissing`] if a published bid lost its payload.
pub fn check_for_higher_bid<L: Ledger>(
    ledger: &mut L,
    price: Decimal,
    item: &ItemId,
    folded: &BTreeSet<SubmissionId>,
) -> Result<()> {
    audit_side(ledger, OrderSide::Bid, price, item, folded)
}

/// Fail if an un-folded ask of the caller's organization undercuts `price`.
///
/// # Errors
/// - [`AuctionError::AuctionStillActive`] if such an ask exists.
/// - [`AuctionError::CommitmentMissing`] if a published ask lost its payload.
pub fn check_for_lower_ask<L: Ledger>(
    ledger: &mut L,
    price: Decimal,
    item: &ItemId,
    folded: &BTreeSet<SubmissionId>,
) -> Result<()> {
    audit_side(ledger, OrderSide::Ask, price, item, folded)
}

fn audit_side<L: Ledger>(
    ledger: &mut L,
    side: OrderSide,
    price: Decimal,
    item: &ItemId,
    folded: &BTreeSet<SubmissionId>,
) -> Result<()> {
    let own_org = ledger.caller_identity().org.clone();
    let published = ledger.range_scan(&Partition::Public, &OrderKey::item_prefix(side, item)?)?;

    let mut inspected = 0usize;
    let mut better = Vec::new();
    for (composite, bytes) in published {
        let key = OrderKey::from_composite(&composite)?;
        if folded.contains(&key.submission) {
            continue;
        }
        inspected += 1;
        let public = PublicOrderHash::from_bytes(&bytes)?;

        if public.org == own_org {
            let payload = ledger
                .get(&Partition::OrgPrivate(own_org.clone()), &composite)?
                .ok_or_else(|| missing(&key))?;
            let order = PrivateOrder::from_bytes(&payload)?;
            if order.improves_on(price) {
                better.push(key);
            }
        } else if ledger
            .hash_of(&Partition::OrgPrivate(public.org.clone()), &composite)?
            .is_none()
        {
            return Err(missing(&key));
        }
    }

    if !better.is_empty() {
        warn!(
            %item,
            %side,
            %price,
            count = better.len(),
            "Outstanding orders beat the round price"
        );
        return Err(AuctionError::AuctionStillActive {
            reason: format!(
                "{} un-submitted {side} order(s) for {item} priced better than {price}, first {}",
                better.len(),
                better[0]
            ),
        });
    }

    debug!(%item, %side, %price, inspected, "No outstanding orders beat the round price");
    Ok(())
}

fn missing(key: &OrderKey) -> AuctionError {
    warn!(order = %key, "Published commitment has no private payload");
    AuctionError::CommitmentMissing {
        key: key.to_string(),
    }
}
