//! Access guard.
//!
//! Every rule about who may see or act on a confidential order lives here:
//!
//! - **Visibility**: a plaintext order is readable by its owner, or by an
//!   auditor or auction admin of the owning organization.
//! - **Folding**: an order may be revealed into a round by its owner or by an
//!   auction admin.
//! - **Writes**: a confidential partition is writable only by members of the
//!   organization that owns it. The ledger enforces this again on every call.

use std::fmt;

use sealbid_types::{AuctionError, Capability, Identity, Partition, PrivateOrder, Result};

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The caller owns the order.
    Owner,
    /// The caller acts on someone else's order through a capability.
    Privileged(Capability),
    Denied { reason: String },
}

impl AccessDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }

    /// Turn a denial into [`AuctionError::PermissionDenied`].
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::Denied { reason } => Err(AuctionError::PermissionDenied { reason }),
            allowed => Ok(allowed),
        }
    }
}

impl fmt::Display for AccessDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "OWNER"),
            Self::Privileged(cap) => write!(f, "PRIVILEGED({cap})"),
            Self::Denied { reason } => write!(f, "DENIED({reason})"),
        }
    }
}

/// Whether `caller` is the owner recorded in `order`.
#[must_use]
pub fn is_owner(caller: &Identity, order: &PrivateOrder) -> bool {
    caller.subject == order.owner && caller.org == order.org
}

/// May `caller` read the plaintext of `order`?
#[must_use]
pub fn order_visibility(caller: &Identity, order: &PrivateOrder) -> AccessDecision {
    if is_owner(caller, order) {
        return AccessDecision::Owner;
    }
    if caller.org != order.org {
        return AccessDecision::Denied {
            reason: format!("{caller} is outside the owning organization {}", order.org),
        };
    }
    for capability in [Capability::Auditor, Capability::AuctionAdmin] {
        if caller.has(capability) {
            return AccessDecision::Privileged(capability);
        }
    }
    AccessDecision::Denied {
        reason: format!("{caller} is neither the owner nor an auditor or admin"),
    }
}

/// May `caller` reveal `order` into an auction round?
#[must_use]
pub fn fold_rights(caller: &Identity, order: &PrivateOrder) -> AccessDecision {
    if is_owner(caller, order) {
        AccessDecision::Owner
    } else if caller.has(Capability::AuctionAdmin) {
        AccessDecision::Privileged(Capability::AuctionAdmin)
    } else {
        AccessDecision::Denied {
            reason: format!(
                "{caller} may not submit an order owned by {}@{}",
                order.owner, order.org
            ),
        }
    }
}

/// Writes into `partition` require membership of its owning organization.
pub fn require_partition_write(caller: &Identity, partition: &Partition) -> Result<()> {
    match partition.owner() {
        Some(owner) if *owner != caller.org => Err(AuctionError::permission_denied(format!(
            "{caller} may not write to {partition}"
        ))),
        _ => Ok(()),
    }
}

/// Require `capability` of `caller`.
pub fn require_capability(caller: &Identity, capability: Capability) -> Result<()> {
    if caller.has(capability) {
        Ok(())
    } else {
        Err(AuctionError::permission_denied(format!(
            "{caller} lacks capability {capability}"
        )))
    }
}
