//! Identifiers used throughout SealBid.
//!
//! Transaction and submission ids are UUIDv7 so they sort by creation time.
//! Auction, item, organization and subject ids are opaque strings supplied by
//! the surrounding network; they become composite key components and are
//! validated when a key is built, not here.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AuctionError;

// ---------------------------------------------------------------------------
// String identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of one auction (shared by all of its rounds).
    AuctionId
);

string_id!(
    /// The item being traded. Orders and rounds are scoped to one item.
    ItemId
);

string_id!(
    /// Organization (membership provider) identifier, e.g. `Org1MSP`.
    OrgId
);

string_id!(
    /// Verified subject identity of a caller within its organization.
    SubjectId
);

// ---------------------------------------------------------------------------
// TxId
// ---------------------------------------------------------------------------

/// Identifier of the enclosing ledger transaction. Uses UUIDv7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(pub Uuid);

impl TxId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SubmissionId
// ---------------------------------------------------------------------------

/// Identifies one submitted order within its item. Taken from the id of the
/// transaction that stored the order, so concurrent submissions never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    #[must_use]
    pub fn from_tx(tx_id: TxId) -> Self {
        Self(tx_id.0)
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubmissionId {
    type Err = AuctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| AuctionError::InvalidKey {
                reason: format!("submission id {s:?} is not a UUID: {e}"),
            })
    }
}

// ---------------------------------------------------------------------------
// RoundNumber
// ---------------------------------------------------------------------------

/// Zero-based round index within an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundNumber(pub u32);

impl RoundNumber {
    pub const FIRST: Self = Self(0);

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The immediately preceding round, or `None` for round 0.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

impl fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoundNumber {
    type Err = AuctionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>()
            .map(Self)
            .map_err(|e| AuctionError::InvalidKey {
                reason: format!("round number {s:?} is not an integer: {e}"),
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_id_uniqueness_and_ordering() {
        let a = TxId::new();
        let b = TxId::new();
        assert_ne!(a, b);
        assert!(a < b);
    }

    #[test]
    fn submission_id_parses_its_display() {
        let id = SubmissionId::from_tx(TxId::new());
        let back: SubmissionId = id.to_string().parse().unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn submission_id_rejects_garbage() {
        let err = "not-a-uuid".parse::<SubmissionId>().unwrap_err();
        assert!(matches!(err, AuctionError::InvalidKey { .. }));
    }

    #[test]
    fn round_number_navigation() {
        assert_eq!(RoundNumber(4).next(), RoundNumber(5));
        assert_eq!(RoundNumber(4).previous(), Some(RoundNumber(3)));
        assert_eq!(RoundNumber::FIRST.previous(), None);
    }

    #[test]
    fn string_ids_serialize_transparently() {
        let org = OrgId::new("Org1MSP");
        assert_eq!(serde_json::to_string(&org).unwrap(), "\"Org1MSP\"");
        assert_eq!(org.to_string(), "Org1MSP");
    }

    #[test]
    fn submission_id_works_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        let id = SubmissionId::from_tx(TxId::new());
        map.insert(id, 7u64);
        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::BTreeMap<SubmissionId, u64> =
            serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(&id), Some(&7));
    }
}
