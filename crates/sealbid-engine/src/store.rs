//! Round records in the public partition.

use sealbid_ledger::Ledger;
use sealbid_types::{
    AuctionError, AuctionId, AuctionRound, Partition, Result, RoundNumber, auction_prefix,
    round_key,
};

pub(crate) fn load_round<L: Ledger>(
    ledger: &mut L,
    auction_id: &AuctionId,
    round: RoundNumber,
) -> Result<Option<AuctionRound>> {
    ledger
        .get(&Partition::Public, &round_key(auction_id, round)?)?
        .map(|bytes| AuctionRound::from_bytes(&bytes))
        .transpose()
}

pub(crate) fn require_round<L: Ledger>(
    ledger: &mut L,
    auction_id: &AuctionId,
    round: RoundNumber,
) -> Result<AuctionRound> {
    load_round(ledger, auction_id, round)?
        .ok_or_else(|| AuctionError::not_found(format!("auction {auction_id} round {round}")))
}

pub(crate) fn save_round<L: Ledger>(ledger: &mut L, round: &AuctionRound) -> Result<()> {
    ledger.put(
        &Partition::Public,
        &round_key(&round.auction_id, round.round)?,
        round.to_bytes()?,
    )
}

pub(crate) fn delete_round<L: Ledger>(
    ledger: &mut L,
    auction_id: &AuctionId,
    round: RoundNumber,
) -> Result<()> {
    ledger.delete(&Partition::Public, &round_key(auction_id, round)?)
}

/// Every stored round of `auction_id`, ordered by round number.
pub(crate) fn load_rounds<L: Ledger>(
    ledger: &mut L,
    auction_id: &AuctionId,
) -> Result<Vec<AuctionRound>> {
    let mut rounds = ledger
        .range_scan(&Partition::Public, &auction_prefix(auction_id)?)?
        .into_iter()
        .map(|(_, bytes)| AuctionRound::from_bytes(&bytes))
        .collect::<Result<Vec<_>>>()?;
    // Keys sort lexically ("10" < "2"), so order by the parsed number.
    rounds.sort_by_key(|r| r.round);
    Ok(rounds)
}
