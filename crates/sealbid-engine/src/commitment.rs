//! Order commitment manager.
//!
//! An order enters the system in two transactions:
//!
//! 1. [`submit_order`] stores the plaintext in the caller's own confidential
//!    partition, keyed by `(side, item, submission id)`.
//! 2. [`publish_order`] copies the payload's SHA-256 into the public order
//!    book under the same key. From then on the order is committed: any
//!    later reveal must hash to this value.
//!
//! [`delete_order`] withdraws an order, but only its owner may do so and only
//! before it has been folded into a round.

use tracing::{debug, info};

use sealbid_ledger::Ledger;
use sealbid_types::{
    AuctionError, OrderBinding, OrderKey, Partition, PrivateOrder, PublicOrderHash, Result,
    SubmissionId,
};

use crate::access;

/// Store `order` in the caller's confidential partition.
///
/// # Errors
/// - [`AuctionError::PermissionDenied`] if the order names another
///   organization or another owner than the caller.
/// - [`AuctionError::InvalidOrder`] for zero quantity or non-positive price.
/// - [`AuctionError::InvalidKey`] if the item cannot form a key.
pub fn submit_order<L: Ledger>(ledger: &mut L, order: &PrivateOrder) -> Result<OrderKey> {
    let caller = ledger.caller_identity().clone();
    let partition = Partition::OrgPrivate(order.org.clone());
    access::require_partition_write(&caller, &partition)?;
    if order.owner != caller.subject {
        return Err(AuctionError::permission_denied(format!(
            "{caller} may not submit an order owned by {}",
            order.owner
        )));
    }
    order.validate()?;

    let key = OrderKey::new(
        order.side,
        order.item.clone(),
        SubmissionId::from_tx(ledger.tx_id()),
    );
    ledger.put(&partition, &key.composite()?, order.canonical_bytes()?)?;

    debug!(order = %key, owner = %caller, "Order stored");
    Ok(key)
}

/// Publish the commitment of a stored order to the public order book.
///
/// # Errors
/// - [`AuctionError::NotFound`] if the caller's organization holds no payload
///   under `key`.
/// - [`AuctionError::InvalidState`] if the commitment is already published.
pub fn publish_order<L: Ledger>(ledger: &mut L, key: &OrderKey) -> Result<PublicOrderHash> {
    let org = ledger.caller_identity().org.clone();
    let composite = key.composite()?;

    let hash = ledger
        .hash_of(&Partition::OrgPrivate(org.clone()), &composite)?
        .ok_or_else(|| AuctionError::not_found(format!("private order {key} in {org}")))?;
    if ledger.get(&Partition::Public, &composite)?.is_some() {
        return Err(AuctionError::invalid_state(format!(
            "commitment for {key} is already published"
        )));
    }

    let public = PublicOrderHash { org, hash };
    ledger.put(&Partition::Public, &composite, public.to_bytes()?)?;

    info!(order = %key, org = %public.org, commitment = %public.hash, "Commitment published");
    Ok(public)
}

/// Withdraw an order: remove both the private payload and its commitment.
///
/// # Errors
/// - [`AuctionError::PermissionDenied`] if the caller is not the owner.
/// - [`AuctionError::NotFound`] if no such order exists.
/// - [`AuctionError::InvalidState`] once the order has been folded into a
///   round.
pub fn delete_order<L: Ledger>(ledger: &mut L, key: &OrderKey) -> Result<()> {
    let caller = ledger.caller_identity().clone();
    let order = load_own_org_order(ledger, key)?;
    if !access::is_owner(&caller, &order) {
        return Err(AuctionError::permission_denied(format!(
            "only {} may delete order {key}",
            order.owner
        )));
    }

    if let Some(bytes) = ledger.get(&Partition::Public, &key.binding_key()?)? {
        let binding = OrderBinding::from_bytes(&bytes)?;
        return Err(AuctionError::invalid_state(format!(
            "order {key} is bound to auction {} round {}",
            binding.auction_id, binding.round
        )));
    }

    let composite = key.composite()?;
    ledger.delete(&Partition::OrgPrivate(caller.org.clone()), &composite)?;
    ledger.delete(&Partition::Public, &composite)?;

    info!(order = %key, owner = %caller, "Order withdrawn");
    Ok(())
}

/// Read the plaintext of `key` from the caller's organization partition.
///
/// An order that exists only in another organization's partition is
/// reported as [`AuctionError::PermissionDenied`] rather than not found.
pub(crate) fn load_own_org_order<L: Ledger>(
    ledger: &mut L,
    key: &OrderKey,
) -> Result<PrivateOrder> {
    let org = ledger.caller_identity().org.clone();
    let composite = key.composite()?;

    if let Some(bytes) = ledger.get(&Partition::OrgPrivate(org.clone()), &composite)? {
        return PrivateOrder::from_bytes(&bytes);
    }
    match ledger.get(&Partition::Public, &composite)? {
        Some(bytes) => {
            let public = PublicOrderHash::from_bytes(&bytes)?;
            if public.org == org {
                Err(AuctionError::not_found(format!("private order {key} in {org}")))
            } else {
                Err(AuctionError::permission_denied(format!(
                    "order {key} belongs to {}",
                    public.org
                )))
            }
        }
        None => Err(AuctionError::not_found(format!("order {key}"))),
    }
}
