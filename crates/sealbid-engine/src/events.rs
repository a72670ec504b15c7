//! Lifecycle event payloads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sealbid_clearing::allocation_root_hex;
use sealbid_ledger::Ledger;
use sealbid_types::{AuctionId, AuctionRound, ItemId, Result, RoundNumber, RoundStatus};

/// Payload of every round lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEvent {
    pub auction_id: AuctionId,
    pub round: RoundNumber,
    pub item: ItemId,
    pub status: RoundStatus,
    pub price: Decimal,
    pub quantity: u64,
    pub demand: u64,
    pub sold: u64,
    /// Hex allocation root, present once the round has been cleared.
    pub allocation_root: Option<String>,
    pub emitted_at: DateTime<Utc>,
}

impl RoundEvent {
    #[must_use]
    pub fn of(round: &AuctionRound, cleared: bool, emitted_at: DateTime<Utc>) -> Self {
        Self {
            auction_id: round.auction_id.clone(),
            round: round.round,
            item: round.item.clone(),
            status: round.status,
            price: round.price,
            quantity: round.quantity,
            demand: round.demand,
            sold: round.sold,
            allocation_root: cleared.then(|| allocation_root_hex(round)),
            emitted_at,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

pub(crate) fn emit<L: Ledger>(
    ledger: &mut L,
    name: &str,
    round: &AuctionRound,
    cleared: bool,
) -> Result<()> {
    let event = RoundEvent::of(round, cleared, ledger.tx_timestamp());
    ledger.emit_event(name, serde_json::to_vec(&event)?)
}
