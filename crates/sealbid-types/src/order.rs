//! Order types for the SealBid auction engine.
//!
//! A [`PrivateOrder`] lives only in its owner's confidential partition. What
//! the rest of the network sees is its [`PublicOrderHash`]: the SHA-256 of the
//! order's canonical serialization plus the owning organization. Folding an
//! order into a round requires revealing a plaintext that hashes to that
//! commitment.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    AuctionError, AuctionId, ItemId, OrgId, Result, RoundNumber, SubjectId,
    constants::{ASK_KEY_TYPE, BID_KEY_TYPE},
};

/// Which side of the market this order is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Demand: a buyer's bid.
    Bid,
    /// Supply: a seller's ask.
    Ask,
}

impl OrderSide {
    /// Object type tag used in composite keys.
    #[must_use]
    pub fn key_type(self) -> &'static str {
        match self {
            Self::Bid => BID_KEY_TYPE,
            Self::Ask => ASK_KEY_TYPE,
        }
    }

    /// Inverse of [`OrderSide::key_type`].
    ///
    /// # Errors
    /// Returns [`AuctionError::InvalidKey`] for unknown tags.
    pub fn from_key_type(tag: &str) -> Result<Self> {
        match tag {
            BID_KEY_TYPE => Ok(Self::Bid),
            ASK_KEY_TYPE => Ok(Self::Ask),
            other => Err(AuctionError::InvalidKey {
                reason: format!("unknown order type tag {other:?}"),
            }),
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "BID"),
            Self::Ask => write!(f, "ASK"),
        }
    }
}

// ---------------------------------------------------------------------------
// CommitmentHash
// ---------------------------------------------------------------------------

/// SHA-256 digest of a stored value. Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CommitmentHash(pub [u8; 32]);

impl CommitmentHash {
    /// Hash arbitrary stored bytes.
    #[must_use]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitmentHash({})", self.to_hex())
    }
}

impl fmt::Display for CommitmentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<CommitmentHash> for String {
    fn from(hash: CommitmentHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for CommitmentHash {
    type Error = AuctionError;

    fn try_from(value: String) -> Result<Self> {
        let bytes = hex::decode(&value)
            .map_err(|e| AuctionError::Serialization(format!("bad commitment hex: {e}")))?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            AuctionError::Serialization("commitment hash must be 32 bytes".to_string())
        })?;
        Ok(Self(arr))
    }
}

// ---------------------------------------------------------------------------
// PrivateOrder
// ---------------------------------------------------------------------------

/// A confidential bid or ask, as stored in the owner's partition.
///
/// Field order is part of the commitment: the canonical encoding is the
/// `serde_json` serialization of this struct with the price normalized, so
/// `50` and `50.0` commit to the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateOrder {
    #[serde(rename = "objectType")]
    pub side: OrderSide,
    pub item: ItemId,
    pub quantity: u64,
    pub price: Decimal,
    pub owner: SubjectId,
    pub org: OrgId,
}

impl PrivateOrder {
    /// Canonical byte encoding hashed into the commitment.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let canonical = Self {
            price: self.price.normalize(),
            ..self.clone()
        };
        Ok(serde_json::to_vec(&canonical)?)
    }

    /// Commitment hash of this order.
    pub fn commitment(&self) -> Result<CommitmentHash> {
        Ok(CommitmentHash::of_bytes(&self.canonical_bytes()?))
    }

    /// Decode a stored payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Structural checks independent of who submits the order.
    ///
    /// # Errors
    /// Returns [`AuctionError::InvalidOrder`] for zero quantity or a
    /// non-positive price.
    pub fn validate(&self) -> Result<()> {
        if self.quantity == 0 {
            return Err(AuctionError::InvalidOrder {
                reason: "quantity must be positive".to_string(),
            });
        }
        if self.price <= Decimal::ZERO {
            return Err(AuctionError::InvalidOrder {
                reason: format!("price must be positive, got {}", self.price),
            });
        }
        Ok(())
    }

    /// Whether this order would trade on better terms than `round_price`:
    /// a bid above it or an ask below it.
    #[must_use]
    pub fn improves_on(&self, round_price: Decimal) -> bool {
        match self.side {
            OrderSide::Bid => self.price > round_price,
            OrderSide::Ask => self.price < round_price,
        }
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl PrivateOrder {
    pub fn dummy(
        side: OrderSide,
        item: &str,
        quantity: u64,
        price: i64,
        owner: &str,
        org: &str,
    ) -> Self {
        Self {
            side,
            item: ItemId::new(item),
            quantity,
            price: Decimal::new(price, 0),
            owner: SubjectId::new(owner),
            org: OrgId::new(org),
        }
    }
}

// ---------------------------------------------------------------------------
// Public records
// ---------------------------------------------------------------------------

/// Entry of the public order book: the binding commitment to a private order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicOrderHash {
    pub org: OrgId,
    pub hash: CommitmentHash,
}

impl PublicOrderHash {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Marker written the first time an order is folded into a round. While it
/// exists the order can no longer be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBinding {
    pub auction_id: AuctionId,
    pub round: RoundNumber,
}

impl OrderBinding {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid() -> PrivateOrder {
        PrivateOrder::dummy(OrderSide::Bid, "apples", 40, 50, "alice", "Org1MSP")
    }

    #[test]
    fn commitment_is_deterministic() {
        assert_eq!(bid().commitment().unwrap(), bid().commitment().unwrap());
    }

    #[test]
    fn any_field_change_changes_commitment() {
        let base = bid().commitment().unwrap();

        let mut o = bid();
        o.price = Decimal::new(40, 0);
        assert_ne!(o.commitment().unwrap(), base);

        let mut o = bid();
        o.quantity = 41;
        assert_ne!(o.commitment().unwrap(), base);

        let mut o = bid();
        o.owner = SubjectId::new("mallory");
        assert_ne!(o.commitment().unwrap(), base);

        let mut o = bid();
        o.side = OrderSide::Ask;
        assert_ne!(o.commitment().unwrap(), base);
    }

    #[test]
    fn canonical_encoding_shape() {
        let json = String::from_utf8(bid().canonical_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"objectType":"bid","item":"apples","quantity":40,"price":"50","owner":"alice","org":"Org1MSP"}"#
        );
    }

    #[test]
    fn equal_prices_of_different_scale_commit_identically() {
        let mut scaled = bid();
        scaled.price = Decimal::new(500, 1);
        assert_eq!(scaled, bid());
        assert_eq!(scaled.canonical_bytes().unwrap(), bid().canonical_bytes().unwrap());
        assert_eq!(scaled.commitment().unwrap(), bid().commitment().unwrap());

        scaled.price = Decimal::new(50_125, 3);
        let mut rounded = bid();
        rounded.price = Decimal::new(501_250, 4);
        assert_eq!(scaled.commitment().unwrap(), rounded.commitment().unwrap());
        assert_ne!(scaled.commitment().unwrap(), bid().commitment().unwrap());
    }

    #[test]
    fn validate_rejects_zero_quantity_and_price() {
        let mut o = bid();
        o.quantity = 0;
        assert!(matches!(o.validate(), Err(AuctionError::InvalidOrder { .. })));

        let mut o = bid();
        o.price = Decimal::ZERO;
        assert!(matches!(o.validate(), Err(AuctionError::InvalidOrder { .. })));

        assert!(bid().validate().is_ok());
    }

    #[test]
    fn improves_on_is_strict() {
        let b = bid();
        assert!(b.improves_on(Decimal::new(49, 0)));
        assert!(!b.improves_on(Decimal::new(50, 0)));

        let ask = PrivateOrder::dummy(OrderSide::Ask, "apples", 10, 8, "sam", "Org2MSP");
        assert!(ask.improves_on(Decimal::new(10, 0)));
        assert!(!ask.improves_on(Decimal::new(8, 0)));
    }

    #[test]
    fn commitment_hash_hex_serde() {
        let hash = CommitmentHash::of_bytes(b"hello");
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let back: CommitmentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert!(serde_json::from_str::<CommitmentHash>("\"abcd\"").is_err());
    }

    #[test]
    fn side_key_type_roundtrip() {
        for side in [OrderSide::Bid, OrderSide::Ask] {
            assert_eq!(OrderSide::from_key_type(side.key_type()).unwrap(), side);
        }
        assert!(OrderSide::from_key_type("auction").is_err());
    }
}
