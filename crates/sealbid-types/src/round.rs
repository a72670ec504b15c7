//! Auction round records.
//!
//! One [`AuctionRound`] exists per (auction id, round number). Sellers and
//! bidders are keyed by the [`SubmissionId`] of the order that was folded in,
//! which is also the key of the order's public commitment.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AuctionId, ItemId, OrgId, Result, RoundNumber, SubjectId, SubmissionId};

/// Lifecycle of a single round.
///
/// ```text
/// OPEN ──► CLOSED ──► FINAL
///   │
///   └────► SUPERSEDED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    /// Accepting orders.
    Open,
    /// Cleared with demand covered; a candidate for finalization.
    Closed,
    /// Cleared with unmet demand; replaced by the next round at a higher price.
    Superseded,
    /// The surviving round of a finished auction.
    Final,
}

impl RoundStatus {
    /// Whether orders may still be folded into a round in this status.
    #[must_use]
    pub fn accepts_orders(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Superseded => write!(f, "SUPERSEDED"),
            Self::Final => write!(f, "FINAL"),
        }
    }
}

/// A seller participating in a round. Counters are cumulative across rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub seller: SubjectId,
    pub org: OrgId,
    pub quantity: u64,
    pub sold: u64,
    pub unsold: u64,
}

impl Seller {
    #[must_use]
    pub fn new(seller: SubjectId, org: OrgId, quantity: u64) -> Self {
        Self {
            seller,
            org,
            quantity,
            sold: 0,
            unsold: quantity,
        }
    }
}

/// A buyer participating in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bidder {
    pub buyer: SubjectId,
    pub org: OrgId,
    pub quantity: u64,
    pub won: u64,
}

impl Bidder {
    #[must_use]
    pub fn new(buyer: SubjectId, org: OrgId, quantity: u64) -> Self {
        Self {
            buyer,
            org,
            quantity,
            won: 0,
        }
    }
}

/// Public state of one auction round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionRound {
    pub auction_id: AuctionId,
    pub round: RoundNumber,
    pub status: RoundStatus,
    pub item: ItemId,
    /// Clearing price of this round.
    pub price: Decimal,
    /// Total quantity offered (sum of seller quantities).
    pub quantity: u64,
    /// Total quantity demanded (sum of bidder quantities).
    pub demand: u64,
    /// Cumulative quantity sold, carried across rounds.
    pub sold: u64,
    pub sellers: BTreeMap<SubmissionId, Seller>,
    pub bidders: BTreeMap<SubmissionId, Bidder>,
    pub opened_at: DateTime<Utc>,
}

impl AuctionRound {
    /// A fresh round 0 at the reserve price.
    #[must_use]
    pub fn open(
        auction_id: AuctionId,
        item: ItemId,
        price: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            auction_id,
            round: RoundNumber::FIRST,
            status: RoundStatus::Open,
            item,
            price,
            quantity: 0,
            demand: 0,
            sold: 0,
            sellers: BTreeMap::new(),
            bidders: BTreeMap::new(),
            opened_at,
        }
    }

    /// The round that follows this one: price raised by `increment`, sellers
    /// and cumulative sold carried forward, bidders cleared.
    #[must_use]
    pub fn successor(&self, increment: Decimal, opened_at: DateTime<Utc>) -> Self {
        Self {
            auction_id: self.auction_id.clone(),
            round: self.round.next(),
            status: RoundStatus::Open,
            item: self.item.clone(),
            price: self.price + increment,
            quantity: self.quantity,
            demand: 0,
            sold: self.sold,
            sellers: self.sellers.clone(),
            bidders: BTreeMap::new(),
            opened_at,
        }
    }

    /// Recompute `quantity` and `demand` from the seller and bidder maps.
    pub fn recompute_totals(&mut self) {
        self.quantity = self
            .sellers
            .values()
            .fold(0u64, |acc, s| acc.saturating_add(s.quantity));
        self.demand = self
            .bidders
            .values()
            .fold(0u64, |acc, b| acc.saturating_add(b.quantity));
    }

    /// Whether demand exceeds what has been sold so far.
    #[must_use]
    pub fn has_unmet_demand(&self) -> bool {
        self.demand > self.sold
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl AuctionRound {
    /// Round with the given sellers and bidders (quantities only), totals
    /// recomputed. Submission ids are fresh UUIDv7 values in argument order.
    pub fn dummy(price: i64, sold: u64, sellers: &[u64], bidders: &[u64]) -> Self {
        use crate::TxId;

        let mut round = Self::open(
            AuctionId::new("auction-test"),
            ItemId::new("apples"),
            Decimal::new(price, 0),
            Utc::now(),
        );
        round.sold = sold;
        for (i, qty) in sellers.iter().enumerate() {
            round.sellers.insert(
                SubmissionId::from_tx(TxId::new()),
                Seller::new(SubjectId::new(format!("seller{i}")), OrgId::new("Org1MSP"), *qty),
            );
        }
        for (i, qty) in bidders.iter().enumerate() {
            round.bidders.insert(
                SubmissionId::from_tx(TxId::new()),
                Bidder::new(SubjectId::new(format!("buyer{i}")), OrgId::new("Org2MSP"), *qty),
            );
        }
        round.recompute_totals();
        round
    }
}
