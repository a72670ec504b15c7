//! Reveal verifier.
//!
//! A caller reveals an order by supplying its plaintext. The reveal is
//! accepted only if:
//!
//! 1. a commitment is published under the order's key,
//! 2. the plaintext hashes to that commitment,
//! 3. the still-private payload in the owning organization's partition
//!    hashes to the same value, and
//! 4. the plaintext agrees with its key (side, item) and with the
//!    organization recorded in the commitment.
//!
//! Only a [`VerifiedOrder`] can be folded into a round, and this module is
//! the only place one is built.

use tracing::{debug, warn};

use sealbid_ledger::Ledger;
use sealbid_types::{
    AuctionError, CommitmentHash, OrderKey, Partition, PrivateOrder, PublicOrderHash, Result,
};

/// A plaintext order proven to match its published commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedOrder {
    key: OrderKey,
    order: PrivateOrder,
    commitment: CommitmentHash,
}

impl VerifiedOrder {
    #[must_use]
    pub fn key(&self) -> &OrderKey {
        &self.key
    }

    #[must_use]
    pub fn order(&self) -> &PrivateOrder {
        &self.order
    }

    #[must_use]
    pub fn commitment(&self) -> CommitmentHash {
        self.commitment
    }
}

/// Verify `plaintext` against the commitment published under `key`.
///
/// # Errors
/// - [`AuctionError::NotFound`] if no commitment is published.
/// - [`AuctionError::HashMismatch`] on any disagreement between plaintext,
///   public commitment and private payload.
pub fn verify_and_bind<L: Ledger>(
    ledger: &mut L,
    key: &OrderKey,
    plaintext: &PrivateOrder,
) -> Result<VerifiedOrder> {
    let composite = key.composite()?;
    let public = ledger
        .get(&Partition::Public, &composite)?
        .ok_or_else(|| AuctionError::not_found(format!("published commitment for {key}")))
        .and_then(|bytes| PublicOrderHash::from_bytes(&bytes))?;

    let revealed = plaintext.commitment()?;
    if revealed != public.hash {
        return Err(mismatch(
            key,
            format!("revealed order hashes to {revealed}, commitment is {}", public.hash),
        ));
    }

    match ledger.hash_of(&Partition::OrgPrivate(public.org.clone()), &composite)? {
        Some(private) if private == public.hash => {}
        Some(private) => {
            return Err(mismatch(
                key,
                format!("private payload hashes to {private}, commitment is {}", public.hash),
            ));
        }
        None => {
            return Err(mismatch(
                key,
                format!("private payload missing from {}", Partition::OrgPrivate(public.org)),
            ));
        }
    }

    if plaintext.side != key.side || plaintext.item != key.item {
        return Err(mismatch(
            key,
            format!("revealed {} order for {} under this key", plaintext.side, plaintext.item),
        ));
    }
    if plaintext.org != public.org {
        return Err(mismatch(
            key,
            format!(
                "revealed order names {}, commitment was published by {}",
                plaintext.org, public.org
            ),
        ));
    }

    debug!(order = %key, commitment = %public.hash, "Reveal verified");
    Ok(VerifiedOrder {
        key: key.clone(),
        order: plaintext.clone(),
        commitment: public.hash,
    })
}

fn mismatch(key: &OrderKey, reason: String) -> AuctionError {
    warn!(order = %key, %reason, "Reveal rejected");
    AuctionError::HashMismatch {
        key: key.to_string(),
        reason,
    }
}
