//! Round lifecycle controller.
//!
//! ## State machine (per round)
//!
//! ```text
//! create_auction ──► OPEN ──close_round──► CLOSED ──end_auction──► FINAL
//!                     │
//!                     └──create_new_round──► SUPERSEDED   (round n+1 opens)
//! ```
//!
//! - `close_round` clears the round and keeps it only if demand is covered.
//! - `create_new_round` clears the round and, if demand still exceeds what
//!   was sold, retires it as superseded and opens the next round at a higher
//!   price with the same sellers.
//! - `end_auction` keeps the latest closed round as the final result and
//!   deletes every other round.
//!
//! Both clearing transitions first run the outstanding-order auditor for
//! bids and asks, so a round never clears while the caller's organization is
//! withholding a better order.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use sealbid_clearing::{allocate, verify_conservation};
use sealbid_ledger::Ledger;
use sealbid_types::{
    AuctionConfig, AuctionError, AuctionId, AuctionRound, Bidder, ItemId, OrderBinding, OrderKey,
    OrderSide, Partition, PrivateOrder, Result, RoundNumber, RoundStatus, Seller, SubmissionId,
    constants::{EVENT_CLOSE_ROUND, EVENT_CREATE_AUCTION, EVENT_CREATE_NEW_ROUND, EVENT_END_AUCTION},
};

use crate::{
    access, auditor,
    events::emit,
    reveal::{VerifiedOrder, verify_and_bind},
    store,
};

/// Drives auctions through their rounds.
#[derive(Debug, Clone, Default)]
pub struct RoundController {
    config: AuctionConfig,
}

impl RoundController {
    /// # Errors
    /// [`AuctionError::Configuration`] if `config` does not validate.
    pub fn new(config: AuctionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    /// Open round 0 of a new auction at `reserve_price`.
    ///
    /// # Errors
    /// - [`AuctionError::InvalidOrder`] for a non-positive reserve.
    /// - [`AuctionError::InvalidState`] if the auction already has rounds.
    /// - [`AuctionError::AuctionStillActive`] if the caller's organization holds
    ///   an un-submitted ask below the reserve.
    pub fn create_auction<L: Ledger>(
        &self,
        ledger: &mut L,
        auction_id: &AuctionId,
        item: &ItemId,
        reserve_price: Decimal,
    ) -> Result<AuctionRound> {
        if reserve_price <= Decimal::ZERO {
            return Err(AuctionError::InvalidOrder {
                reason: format!("reserve price must be positive, got {reserve_price}"),
            });
        }
        if !store::load_rounds(ledger, auction_id)?.is_empty() {
            return Err(AuctionError::invalid_state(format!(
                "auction {auction_id} already exists"
            )));
        }
        auditor::check_for_lower_ask(ledger, reserve_price, item, &BTreeSet::new())?;

        let round = AuctionRound::open(
            auction_id.clone(),
            item.clone(),
            reserve_price,
            ledger.tx_timestamp(),
        );
        store::save_round(ledger, &round)?;
        emit(ledger, EVENT_CREATE_AUCTION, &round, false)?;

        info!(auction = %auction_id, %item, price = %reserve_price, "Auction created");
        Ok(round)
    }

    /// Reveal a bid and fold it into an open round.
    ///
    /// # Errors
    /// - [`AuctionError::NotFound`] if the round does not exist.
    /// - [`AuctionError::InvalidState`] if the round is not open, the bid is
    ///   already in the round, or (round > 0) the bid did not take part in the
    ///   previous round.
    /// - [`AuctionError::PermissionDenied`] unless the caller owns the bid or is
    ///   an auction admin.
    /// - [`AuctionError::InvalidOrder`] if the plaintext is not a bid for the
    ///   round's item.
    /// - Any error of [`verify_and_bind`].
    pub fn submit_bid<L: Ledger>(
        &self,
        ledger: &mut L,
        auction_id: &AuctionId,
        round: RoundNumber,
        submission: SubmissionId,
        plaintext: &PrivateOrder,
    ) -> Result<AuctionRound> {
        self.fold_order(ledger, OrderSide::Bid, auction_id, round, submission, plaintext)
    }

    /// Reveal an ask and fold it into an open round.
    ///
    /// # Errors
    /// As [`RoundController::submit_bid`], without the previous-round rule.
    pub fn submit_ask<L: Ledger>(
        &self,
        ledger: &mut L,
        auction_id: &AuctionId,
        round: RoundNumber,
        submission: SubmissionId,
        plaintext: &PrivateOrder,
    ) -> Result<AuctionRound> {
        self.fold_order(ledger, OrderSide::Ask, auction_id, round, submission, plaintext)
    }

    /// Clear an open round and close it.
    ///
    /// # Errors
    /// - [`AuctionError::NotFound`] / [`AuctionError::InvalidState`] if the
    ///   round is missing or not open.
    /// - [`AuctionError::AuctionStillActive`] if an outstanding order beats the
    ///   round price, or demand still exceeds the quantity sold.
    /// - [`AuctionError::CommitmentMissing`] from the auditor.
    /// - [`AuctionError::SupplyInvariantViolation`] if clearing breaks
    ///   conservation.
    pub fn close_round<L: Ledger>(
        &self,
        ledger: &mut L,
        auction_id: &AuctionId,
        round: RoundNumber,
    ) -> Result<AuctionRound> {
        let mut current = store::require_round(ledger, auction_id, round)?;
        require_status(&current, RoundStatus::Open)?;

        self.clear(ledger, &mut current)?;
        if current.has_unmet_demand() {
            warn!(
                auction = %auction_id,
                round = round.0,
                demand = current.demand,
                sold = current.sold,
                "Close refused, demand exceeds supply sold"
            );
            return Err(AuctionError::AuctionStillActive {
                reason: format!(
                    "demand {} exceeds quantity sold {} in round {round}; open a new round instead",
                    current.demand, current.sold
                ),
            });
        }

        current.status = RoundStatus::Closed;
        store::save_round(ledger, &current)?;
        emit(ledger, EVENT_CLOSE_ROUND, &current, true)?;

        info!(
            auction = %auction_id,
            round = round.0,
            price = %current.price,
            sold = current.sold,
            "Round closed"
        );
        Ok(current)
    }

    /// Clear the current round and, since demand remains unmet, open
    /// `new_round` at a higher price.
    ///
    /// # Errors
    /// - [`AuctionError::InvalidState`] if `new_round` is 0 or already exists,
    ///   the previous round is not open, or clearing covered all demand.
    /// - [`AuctionError::NotFound`] if the previous round does not exist.
    /// - Auditor and conservation errors as for [`RoundController::close_round`].
    pub fn create_new_round<L: Ledger>(
        &self,
        ledger: &mut L,
        auction_id: &AuctionId,
        new_round: RoundNumber,
    ) -> Result<AuctionRound> {
        let previous = new_round.previous().ok_or_else(|| {
            AuctionError::invalid_state("round 0 is opened by create_auction")
        })?;
        if store::load_round(ledger, auction_id, new_round)?.is_some() {
            return Err(AuctionError::invalid_state(format!(
                "auction {auction_id} round {new_round} already exists"
            )));
        }
        let mut current = store::require_round(ledger, auction_id, previous)?;
        require_status(&current, RoundStatus::Open)?;

        self.clear(ledger, &mut current)?;
        if !current.has_unmet_demand() {
            return Err(AuctionError::invalid_state(format!(
                "demand {} is covered by {} sold in round {previous}; close the round instead",
                current.demand, current.sold
            )));
        }

        current.status = RoundStatus::Superseded;
        store::save_round(ledger, &current)?;

        let next = current.successor(self.config.price_increment, ledger.tx_timestamp());
        store::save_round(ledger, &next)?;
        emit(ledger, EVENT_CREATE_NEW_ROUND, &next, false)?;

        info!(
            auction = %auction_id,
            round = next.round.0,
            price = %next.price,
            carried_sold = next.sold,
            sellers = next.sellers.len(),
            "New round opened"
        );
        Ok(next)
    }

    /// Finalize an auction: its latest closed round becomes the result and
    /// every other round is deleted.
    ///
    /// # Errors
    /// - [`AuctionError::NotFound`] if the auction has no rounds.
    /// - [`AuctionError::InvalidState`] if no round is closed.
    pub fn end_auction<L: Ledger>(
        &self,
        ledger: &mut L,
        auction_id: &AuctionId,
    ) -> Result<AuctionRound> {
        let rounds = store::load_rounds(ledger, auction_id)?;
        if rounds.is_empty() {
            return Err(AuctionError::not_found(format!("auction {auction_id}")));
        }
        let mut last_closed = rounds
            .iter()
            .filter(|r| r.status == RoundStatus::Closed)
            .max_by_key(|r| r.round)
            .cloned()
            .ok_or_else(|| {
                AuctionError::invalid_state(format!("auction {auction_id} has no closed round"))
            })?;

        for round in &rounds {
            if round.round != last_closed.round {
                store::delete_round(ledger, auction_id, round.round)?;
            }
        }
        last_closed.status = RoundStatus::Final;
        store::save_round(ledger, &last_closed)?;
        emit(ledger, EVENT_END_AUCTION, &last_closed, true)?;

        info!(
            auction = %auction_id,
            round = last_closed.round.0,
            price = %last_closed.price,
            sold = last_closed.sold,
            discarded = rounds.len() - 1,
            "Auction ended"
        );
        Ok(last_closed)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn fold_order<L: Ledger>(
        &self,
        ledger: &mut L,
        side: OrderSide,
        auction_id: &AuctionId,
        round: RoundNumber,
        submission: SubmissionId,
        plaintext: &PrivateOrder,
    ) -> Result<AuctionRound> {
        let mut current = store::require_round(ledger, auction_id, round)?;
        if !current.status.accepts_orders() {
            return Err(AuctionError::wrong_status(RoundStatus::Open, current.status));
        }

        let caller = ledger.caller_identity().clone();
        let decision = access::fold_rights(&caller, plaintext).into_result()?;

        if plaintext.side != side {
            return Err(AuctionError::InvalidOrder {
                reason: format!("expected a {side} order, got {}", plaintext.side),
            });
        }
        if plaintext.item != current.item {
            return Err(AuctionError::InvalidOrder {
                reason: format!(
                    "order is for {}, auction {auction_id} sells {}",
                    plaintext.item, current.item
                ),
            });
        }

        let already_folded = match side {
            OrderSide::Bid => current.bidders.contains_key(&submission),
            OrderSide::Ask => current.sellers.contains_key(&submission),
        };
        if already_folded {
            return Err(AuctionError::invalid_state(format!(
                "{side} {submission} is already in auction {auction_id} round {round}"
            )));
        }

        if side == OrderSide::Bid {
            if let Some(previous) = round.previous() {
                let prior = store::require_round(ledger, auction_id, previous)?;
                if !prior.bidders.contains_key(&submission) {
                    return Err(AuctionError::invalid_state(format!(
                        "bid {submission} did not take part in round {previous}"
                    )));
                }
            }
        }

        let key = OrderKey::new(side, current.item.clone(), submission);
        let verified = verify_and_bind(ledger, &key, plaintext)?;
        fold_verified(&mut current, &verified)?;
        bind(ledger, &verified, auction_id, round)?;
        store::save_round(ledger, &current)?;

        debug!(
            auction = %auction_id,
            round = round.0,
            order = %key,
            access = %decision,
            quantity = plaintext.quantity,
            offered = current.quantity,
            demanded = current.demand,
            "Order folded into round"
        );
        Ok(current)
    }

    fn clear<L: Ledger>(&self, ledger: &mut L, round: &mut AuctionRound) -> Result<()> {
        let bids: BTreeSet<SubmissionId> = round.bidders.keys().copied().collect();
        let asks: BTreeSet<SubmissionId> = round.sellers.keys().copied().collect();
        auditor::check_for_higher_bid(ledger, round.price, &round.item, &bids)?;
        auditor::check_for_lower_ask(ledger, round.price, &round.item, &asks)?;

        let outcome = allocate(round);
        verify_conservation(round)?;
        debug!(
            auction = %round.auction_id,
            round = round.round.0,
            increment = %self.config.price_increment,
            regime = %outcome.regime,
            residue = outcome.residue,
            "Round cleared"
        );
        Ok(())
    }
}

fn require_status(round: &AuctionRound, expected: RoundStatus) -> Result<()> {
    if round.status == expected {
        Ok(())
    } else {
        Err(AuctionError::wrong_status(expected, round.status))
    }
}

fn fold_verified(round: &mut AuctionRound, verified: &VerifiedOrder) -> Result<()> {
    let order = verified.order();
    let (total, label) = match order.side {
        OrderSide::Bid => (round.demand, "demand"),
        OrderSide::Ask => (round.quantity, "supply"),
    };
    if total.checked_add(order.quantity).is_none() {
        return Err(AuctionError::InvalidOrder {
            reason: format!("order quantity {} overflows round {label}", order.quantity),
        });
    }

    let submission = verified.key().submission;
    match order.side {
        OrderSide::Bid => {
            round.bidders.insert(
                submission,
                Bidder::new(order.owner.clone(), order.org.clone(), order.quantity),
            );
        }
        OrderSide::Ask => {
            round.sellers.insert(
                submission,
                Seller::new(order.owner.clone(), order.org.clone(), order.quantity),
            );
        }
    }
    round.recompute_totals();
    Ok(())
}

/// Record the first round an order was folded into. Later rounds keep the
/// original marker.
fn bind<L: Ledger>(
    ledger: &mut L,
    verified: &VerifiedOrder,
    auction_id: &AuctionId,
    round: RoundNumber,
) -> Result<()> {
    let binding_key = verified.key().binding_key()?;
    if ledger.get(&Partition::Public, &binding_key)?.is_none() {
        let binding = OrderBinding {
            auction_id: auction_id.clone(),
            round,
        };
        ledger.put(&Partition::Public, &binding_key, binding.to_bytes()?)?;
    }
    Ok(())
}
