//! Verified caller identity and capabilities.
//!
//! An [`Identity`] is only ever produced by the membership service after the
//! caller's credential signature has been checked. Capabilities are derived
//! once from the credential's role attribute; the rest of the engine checks
//! the typed set and never inspects raw attributes.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{OrgId, SubjectId};

/// A privilege granted by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Capability {
    /// May fold other members' orders into rounds and list private orders.
    AuctionAdmin,
    /// May read any member's private orders of its own organization.
    Auditor,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuctionAdmin => write!(f, "AUCTION_ADMIN"),
            Self::Auditor => write!(f, "AUDITOR"),
        }
    }
}

/// Set of capabilities held by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities(BTreeSet<Capability>);

impl Capabilities {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, capability: Capability) -> Self {
        self.0.insert(capability);
        self
    }

    #[must_use]
    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The verified identity of the caller of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject: SubjectId,
    pub org: OrgId,
    pub capabilities: Capabilities,
}

impl Identity {
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.subject, self.org)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Identity {
    pub fn dummy(subject: &str, org: &str) -> Self {
        Self {
            subject: SubjectId::new(subject),
            org: OrgId::new(org),
            capabilities: Capabilities::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_set_membership() {
        let caps = Capabilities::none().with(Capability::Auditor);
        assert!(caps.contains(Capability::Auditor));
        assert!(!caps.contains(Capability::AuctionAdmin));
        assert_eq!(caps.iter().count(), 1);
    }

    #[test]
    fn identity_display() {
        let id = Identity::dummy("alice", "Org1MSP");
        assert_eq!(id.to_string(), "alice@Org1MSP");
        assert!(!id.has(Capability::AuctionAdmin));
    }
}
