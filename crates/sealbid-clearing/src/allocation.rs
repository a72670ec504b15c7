//! Round allocation.
//!
//! Two regimes, chosen by comparing total offered against total demanded:
//!
//! - **Excess supply** (`offered > demanded`): every bidder is filled in full
//!   and cumulative sold becomes `demanded`. The increase over the previous
//!   cumulative sold is spread across sellers pro rata to their unsold
//!   quantity: `seller.sold += unsold * increment / total_unsold`.
//! - **Supply constrained** (`offered <= demanded`): every seller sells out
//!   and cumulative sold becomes `offered`. Bidders are filled pro rata:
//!   `won = requested * sold / demanded`.
//!
//! All divisions floor. Whatever the floors leave behind is reported as
//! residue and stays unallocated.

use std::fmt;

use sealbid_types::AuctionRound;
use tracing::debug;

/// Which side of the market limited the clearing quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearingRegime {
    ExcessSupply,
    SupplyConstrained,
}

impl fmt::Display for ClearingRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExcessSupply => write!(f, "EXCESS_SUPPLY"),
            Self::SupplyConstrained => write!(f, "SUPPLY_CONSTRAINED"),
        }
    }
}

/// Summary of one allocation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearingOutcome {
    pub regime: ClearingRegime,
    /// Cumulative sold before this pass.
    pub previous_sold: u64,
    /// Cumulative sold after this pass.
    pub sold: u64,
    /// Units the floor divisions left unassigned.
    pub residue: u64,
}

/// Allocate `round` in place and report what happened.
///
/// Only fill counters and cumulative `sold` change; offered and demanded
/// totals are taken as given.
pub fn allocate(round: &mut AuctionRound) -> ClearingOutcome {
    let previous_sold = round.sold;

    let outcome = if round.quantity > round.demand {
        for bidder in round.bidders.values_mut() {
            bidder.won = bidder.quantity;
        }
        let sold = round.demand;
        let increment = sold.saturating_sub(previous_sold);
        let total_unsold: u128 = round.sellers.values().map(|s| u128::from(s.unsold)).sum();

        let mut assigned = 0u64;
        if total_unsold > 0 && increment > 0 {
            for seller in round.sellers.values_mut() {
                let share = floor_share(seller.unsold, increment, total_unsold);
                seller.sold += share;
                seller.unsold = seller.quantity.saturating_sub(seller.sold);
                assigned += share;
            }
        }
        round.sold = sold;

        ClearingOutcome {
            regime: ClearingRegime::ExcessSupply,
            previous_sold,
            sold,
            residue: increment - assigned,
        }
    } else {
        for seller in round.sellers.values_mut() {
            seller.sold = seller.quantity;
            seller.unsold = 0;
        }
        let sold = round.quantity;
        round.sold = sold;

        let mut won_total = 0u64;
        if round.demand > 0 {
            let demand = u128::from(round.demand);
            for bidder in round.bidders.values_mut() {
                bidder.won = floor_share(bidder.quantity, sold, demand);
                won_total += bidder.won;
            }
        }

        ClearingOutcome {
            regime: ClearingRegime::SupplyConstrained,
            previous_sold,
            sold,
            residue: sold.saturating_sub(won_total),
        }
    };

    debug!(
        auction = %round.auction_id,
        round = round.round.0,
        regime = %outcome.regime,
        offered = round.quantity,
        demanded = round.demand,
        previous_sold,
        sold = outcome.sold,
        residue = outcome.residue,
        "Round allocated"
    );
    outcome
}

/// `floor(part * total / denominator)`. The caller guarantees
/// `part <= denominator`, so the result never exceeds `total`.
fn floor_share(part: u64, total: u64, denominator: u128) -> u64 {
    let share = u128::from(part) * u128::from(total) / denominator;
    u64::try_from(share).unwrap_or(total)
}

#[cfg(test)]
mod tests {
    use sealbid_types::{AuctionRound, OrgId, Seller, SubjectId, SubmissionId, TxId};

    use super::*;

    fn won(round: &AuctionRound) -> Vec<u64> {
        round.bidders.values().map(|b| b.won).collect()
    }

    #[test]
    fn supply_constrained_pro_rata_with_residue() {
        let mut round = AuctionRound::dummy(10, 0, &[100], &[40, 40, 40]);
        let outcome = allocate(&mut round);

        assert_eq!(outcome.regime, ClearingRegime::SupplyConstrained);
        assert_eq!(round.sold, 100);
        assert_eq!(won(&round), vec![33, 33, 33]);
        assert_eq!(outcome.residue, 1);
        let seller = round.sellers.values().next().unwrap();
        assert_eq!((seller.sold, seller.unsold), (100, 0));
    }

    #[test]
    fn excess_supply_fills_bidders_and_spreads_sales() {
        let mut round = AuctionRound::dummy(10, 0, &[60, 40], &[30, 20]);
        let outcome = allocate(&mut round);

        assert_eq!(outcome.regime, ClearingRegime::ExcessSupply);
        assert_eq!(round.sold, 50);
        assert_eq!(won(&round), vec![30, 20]);
        let sold: Vec<u64> = round.sellers.values().map(|s| s.sold).collect();
        assert_eq!(sold, vec![30, 20]);
        assert_eq!(outcome.residue, 0);
        for seller in round.sellers.values() {
            assert_eq!(seller.sold + seller.unsold, seller.quantity);
        }
    }

    #[test]
    fn excess_supply_only_allocates_the_increment() {
        // 40 already sold in an earlier round; demand now 70.
        let mut round = AuctionRound::dummy(15, 40, &[100], &[70]);
        {
            let seller = round.sellers.values_mut().next().unwrap();
            seller.sold = 40;
            seller.unsold = 60;
        }
        round.quantity = 101;
        round.sellers.insert(
            SubmissionId::from_tx(TxId::new()),
            Seller::new(SubjectId::new("late"), OrgId::new("Org3MSP"), 1),
        );
        let outcome = allocate(&mut round);

        assert_eq!(outcome.previous_sold, 40);
        assert_eq!(round.sold, 70);
        let total_seller_sold: u64 = round.sellers.values().map(|s| s.sold).sum();
        assert!(total_seller_sold <= 70);
        assert_eq!(total_seller_sold + outcome.residue, 70);
    }

    #[test]
    fn no_increment_means_no_seller_change() {
        let mut round = AuctionRound::dummy(10, 50, &[100], &[30]);
        let before = round.sellers.clone();
        let outcome = allocate(&mut round);
        assert_eq!(round.sellers, before);
        assert_eq!(round.sold, 30);
        assert_eq!(outcome.residue, 0);
    }

    #[test]
    fn empty_round_is_a_no_op() {
        let mut round = AuctionRound::dummy(10, 0, &[], &[]);
        let outcome = allocate(&mut round);
        assert_eq!(outcome.regime, ClearingRegime::SupplyConstrained);
        assert_eq!(round.sold, 0);
        assert_eq!(outcome.residue, 0);
    }

    #[test]
    fn equal_supply_and_demand_sells_out_exactly() {
        let mut round = AuctionRound::dummy(10, 0, &[50, 50], &[25, 75]);
        let outcome = allocate(&mut round);
        assert_eq!(outcome.regime, ClearingRegime::SupplyConstrained);
        assert_eq!(won(&round), vec![25, 75]);
        assert_eq!(outcome.residue, 0);
    }

    #[test]
    fn huge_quantities_do_not_overflow() {
        let mut round = AuctionRound::dummy(10, 0, &[u64::MAX / 2], &[u64::MAX / 2, u64::MAX / 2]);
        let outcome = allocate(&mut round);
        assert_eq!(outcome.regime, ClearingRegime::SupplyConstrained);
        let total: u128 = round.bidders.values().map(|b| u128::from(b.won)).sum();
        assert!(total <= u128::from(u64::MAX / 2));
    }
}
