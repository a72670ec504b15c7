//! Conservation checks run after every allocation.
//!
//! ```text
//! Σ seller.sold ≤ Σ seller.quantity      sold + unsold = quantity per seller
//! Σ bidder.won  ≤ Σ bidder.quantity      won ≤ quantity per bidder
//! round.sold    = min(offered, demanded)
//! ```
//!
//! A breach means the allocation is wrong and the enclosing transaction must
//! abort.

use sealbid_types::{AuctionError, AuctionRound, Result};
use tracing::error;

/// Verify the allocation invariants of `round`.
///
/// # Errors
/// Returns [`AuctionError::SupplyInvariantViolation`] describing the first
/// breach found.
pub fn verify_conservation(round: &AuctionRound) -> Result<()> {
    let offered: u128 = round.sellers.values().map(|s| u128::from(s.quantity)).sum();
    let demanded: u128 = round.bidders.values().map(|b| u128::from(b.quantity)).sum();

    if offered != u128::from(round.quantity) || demanded != u128::from(round.demand) {
        return Err(violation(
            round,
            format!(
                "totals out of date: offered {} (recorded {}), demanded {} (recorded {})",
                offered, round.quantity, demanded, round.demand
            ),
        ));
    }

    let mut seller_sold: u128 = 0;
    for (key, seller) in &round.sellers {
        if seller.sold > seller.quantity
            || seller.sold.checked_add(seller.unsold) != Some(seller.quantity)
        {
            return Err(violation(
                round,
                format!(
                    "seller {key}: sold {} unsold {} of {}",
                    seller.sold, seller.unsold, seller.quantity
                ),
            ));
        }
        seller_sold += u128::from(seller.sold);
    }

    let mut won: u128 = 0;
    for (key, bidder) in &round.bidders {
        if bidder.won > bidder.quantity {
            return Err(violation(
                round,
                format!("bidder {key}: won {} of {}", bidder.won, bidder.quantity),
            ));
        }
        won += u128::from(bidder.won);
    }

    if seller_sold > offered {
        return Err(violation(
            round,
            format!("sellers sold {seller_sold} of {offered} offered"),
        ));
    }
    if won > demanded {
        return Err(violation(
            round,
            format!("bidders won {won} of {demanded} demanded"),
        ));
    }

    let expected = round.quantity.min(round.demand);
    if round.sold != expected {
        return Err(violation(
            round,
            format!("cumulative sold {} != min(offered, demanded) {expected}", round.sold),
        ));
    }
    Ok(())
}

fn violation(round: &AuctionRound, reason: String) -> AuctionError {
    error!(
        auction = %round.auction_id,
        round = round.round.0,
        %reason,
        "Conservation check failed"
    );
    AuctionError::SupplyInvariantViolation {
        reason: format!("auction {} round {}: {reason}", round.auction_id, round.round),
    }
}
