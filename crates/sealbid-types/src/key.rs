//! Composite ledger keys and storage partitions.
//!
//! A composite key is encoded as
//! `\0objectType\0attr1\0attr2\0...` so that a partial key (object type plus
//! leading attributes) is a strict string prefix of every full key below it.
//! Components must be non-empty and may contain neither the separator nor the
//! upper range sentinel.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    AuctionError, AuctionId, ItemId, OrderSide, OrgId, Result, RoundNumber, SubmissionId,
    constants::{
        AUCTION_KEY_TYPE, BINDING_KEY_TYPE, COMPOSITE_KEY_SEPARATOR, MAX_KEY_SENTINEL,
        ROUND_KEY_COMPONENT,
    },
};

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Storage region a record lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Partition {
    /// Shared state readable by every organization.
    Public,
    /// Confidential partition readable and writable only by one organization.
    OrgPrivate(OrgId),
}

impl Partition {
    /// The owning organization, if this is a confidential partition.
    #[must_use]
    pub fn owner(&self) -> Option<&OrgId> {
        match self {
            Self::Public => None,
            Self::OrgPrivate(org) => Some(org),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::OrgPrivate(org) => write!(f, "_implicit_org_{org}"),
        }
    }
}

// ---------------------------------------------------------------------------
// CompositeKey
// ---------------------------------------------------------------------------

/// A validated composite key, or a partial key used as a scan prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct CompositeKey {
    object_type: String,
    attributes: Vec<String>,
}

impl CompositeKey {
    /// Build a key, validating every component.
    ///
    /// # Errors
    /// Returns [`AuctionError::InvalidKey`] for empty components or components
    /// containing U+0000 or U+10FFFF.
    pub fn new<I, S>(object_type: &str, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        validate_component(object_type)?;
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        for attr in &attributes {
            validate_component(attr)?;
        }
        Ok(Self {
            object_type: object_type.to_string(),
            attributes,
        })
    }

    #[must_use]
    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Encoded form used as the storage key.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(
            2 + self.object_type.len() + self.attributes.iter().map(|a| a.len() + 1).sum::<usize>(),
        );
        out.push(COMPOSITE_KEY_SEPARATOR);
        out.push_str(&self.object_type);
        out.push(COMPOSITE_KEY_SEPARATOR);
        for attr in &self.attributes {
            out.push_str(attr);
            out.push(COMPOSITE_KEY_SEPARATOR);
        }
        out
    }

    /// Parse an encoded key back into its components.
    ///
    /// # Errors
    /// Returns [`AuctionError::InvalidKey`] if `encoded` is not a composite key.
    pub fn parse(encoded: &str) -> Result<Self> {
        let body = encoded
            .strip_prefix(COMPOSITE_KEY_SEPARATOR)
            .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_SEPARATOR))
            .ok_or_else(|| AuctionError::InvalidKey {
                reason: format!("{encoded:?} is not a composite key"),
            })?;
        let mut parts = body.split(COMPOSITE_KEY_SEPARATOR);
        let object_type = parts.next().unwrap_or_default();
        Self::new(object_type, parts)
    }

    /// Exclusive upper bound of the range covered by this key as a prefix.
    #[must_use]
    pub fn range_end(&self) -> String {
        let mut end = self.encode();
        end.push(MAX_KEY_SENTINEL);
        end
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object_type)?;
        for attr in &self.attributes {
            write!(f, "/{attr}")?;
        }
        Ok(())
    }
}

fn validate_component(component: &str) -> Result<()> {
    if component.is_empty() {
        return Err(AuctionError::InvalidKey {
            reason: "key components must not be empty".to_string(),
        });
    }
    if component.contains(COMPOSITE_KEY_SEPARATOR) || component.contains(MAX_KEY_SENTINEL) {
        return Err(AuctionError::InvalidKey {
            reason: format!("key component {component:?} contains a reserved character"),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Typed keys
// ---------------------------------------------------------------------------

/// Address of one submitted order. The private payload (in the owner's
/// partition) and its public hash share this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct OrderKey {
    pub side: OrderSide,
    pub item: ItemId,
    pub submission: SubmissionId,
}

impl OrderKey {
    #[must_use]
    pub fn new(side: OrderSide, item: ItemId, submission: SubmissionId) -> Self {
        Self {
            side,
            item,
            submission,
        }
    }

    /// Storage key `(side tag, item, submission id)`.
    pub fn composite(&self) -> Result<CompositeKey> {
        CompositeKey::new(
            self.side.key_type(),
            [self.item.as_str().to_string(), self.submission.to_string()],
        )
    }

    /// Marker key recording that this order has been folded into a round.
    pub fn binding_key(&self) -> Result<CompositeKey> {
        CompositeKey::new(
            BINDING_KEY_TYPE,
            [
                self.side.key_type().to_string(),
                self.item.as_str().to_string(),
                self.submission.to_string(),
            ],
        )
    }

    /// Prefix covering every order of `side` for `item`.
    pub fn item_prefix(side: OrderSide, item: &ItemId) -> Result<CompositeKey> {
        CompositeKey::new(side.key_type(), [item.as_str()])
    }

    /// Recover an order key from a scanned composite key.
    ///
    /// # Errors
    /// Returns [`AuctionError::InvalidKey`] if the key is not an order key.
    pub fn from_composite(key: &CompositeKey) -> Result<Self> {
        let side = OrderSide::from_key_type(key.object_type())?;
        match key.attributes() {
            [item, submission] => Ok(Self {
                side,
                item: ItemId::new(item.clone()),
                submission: submission.parse()?,
            }),
            _ => Err(AuctionError::InvalidKey {
                reason: format!("{key} is not an order key"),
            }),
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.side.key_type(), self.item, self.submission)
    }
}

/// Storage key of one auction round: `(auction, auctionId, "Round", n)`.
pub fn round_key(auction_id: &AuctionId, round: RoundNumber) -> Result<CompositeKey> {
    CompositeKey::new(
        AUCTION_KEY_TYPE,
        [
            auction_id.as_str().to_string(),
            ROUND_KEY_COMPONENT.to_string(),
            round.to_string(),
        ],
    )
}

/// Prefix covering every round of one auction.
pub fn auction_prefix(auction_id: &AuctionId) -> Result<CompositeKey> {
    CompositeKey::new(AUCTION_KEY_TYPE, [auction_id.as_str()])
}
