//! Guarded read operations.

use sealbid_ledger::Ledger;
use sealbid_types::{
    AuctionError, AuctionId, AuctionRound, Capability, ItemId, OrderKey, OrderSide, Partition,
    PrivateOrder, PublicOrderHash, Result, RoundNumber, SubmissionId,
};
use tracing::debug;

use crate::{access, commitment::load_own_org_order, store};

/// Plaintext of an order, for its owner or an auditor/admin of its
/// organization.
///
/// # Errors
/// [`AuctionError::PermissionDenied`] for anyone else,
/// [`AuctionError::NotFound`] if the order does not exist.
pub fn query_order<L: Ledger>(ledger: &mut L, key: &OrderKey) -> Result<PrivateOrder> {
    let order = load_own_org_order(ledger, key)?;
    let caller = ledger.caller_identity();
    let decision = access::order_visibility(caller, &order).into_result()?;
    debug!(order = %key, caller = %caller, access = %decision, "Order read");
    Ok(order)
}

/// Every order of `side` for `item` held in the caller's organization
/// partition. Auction admins use this to find orders to submit to a round.
///
/// # Errors
/// [`AuctionError::PermissionDenied`] unless the caller is an auction admin.
pub fn list_orders<L: Ledger>(
    ledger: &mut L,
    side: OrderSide,
    item: &ItemId,
) -> Result<Vec<(SubmissionId, PrivateOrder)>> {
    let caller = ledger.caller_identity().clone();
    access::require_capability(&caller, Capability::AuctionAdmin)?;

    ledger
        .range_scan(
            &Partition::OrgPrivate(caller.org.clone()),
            &OrderKey::item_prefix(side, item)?,
        )?
        .into_iter()
        .map(|(composite, bytes)| {
            let key = OrderKey::from_composite(&composite)?;
            Ok((key.submission, PrivateOrder::from_bytes(&bytes)?))
        })
        .collect()
}

/// One round of an auction.
pub fn query_round<L: Ledger>(
    ledger: &mut L,
    auction_id: &AuctionId,
    round: RoundNumber,
) -> Result<AuctionRound> {
    store::require_round(ledger, auction_id, round)
}

/// All stored rounds of an auction, in round order.
///
/// # Errors
/// [`AuctionError::NotFound`] if the auction has no rounds.
pub fn query_auction<L: Ledger>(
    ledger: &mut L,
    auction_id: &AuctionId,
) -> Result<Vec<AuctionRound>> {
    let rounds = store::load_rounds(ledger, auction_id)?;
    if rounds.is_empty() {
        return Err(AuctionError::not_found(format!("auction {auction_id}")));
    }
    Ok(rounds)
}

/// The published commitment of an order.
pub fn query_public<L: Ledger>(ledger: &mut L, key: &OrderKey) -> Result<PublicOrderHash> {
    let bytes = ledger
        .get(&Partition::Public, &key.composite()?)?
        .ok_or_else(|| AuctionError::not_found(format!("published commitment for {key}")))?;
    PublicOrderHash::from_bytes(&bytes)
}
