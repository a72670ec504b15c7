//! Membership service: credential verification and capability derivation.
//!
//! Every organization registers an ed25519 verifying key. A [`Credential`]
//! binds a subject, its organization and a set of attributes under that
//! organization's signature. [`MembershipService::verify`] is the only way to
//! obtain an [`Identity`]; nothing downstream trusts client-supplied identity
//! fields.

use std::collections::BTreeMap;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use sealbid_types::{
    AuctionConfig, AuctionError, Capabilities, Capability, Identity, OrgId, Result, SubjectId,
    constants::CREDENTIAL_DOMAIN,
};

/// A signed statement by an organization about one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub subject: SubjectId,
    pub org: OrgId,
    pub attributes: BTreeMap<String, String>,
    /// ed25519 signature over [`Credential::signing_payload`].
    pub signature: Vec<u8>,
}

impl Credential {
    /// Canonical signing payload.
    ///
    /// Format: `"sealbid:credential:v1:" || lp(subject) || lp(org) || (lp(k) || lp(v))*`
    /// where `lp` is a little-endian u64 length prefix followed by the bytes.
    /// Attributes are visited in key order.
    #[must_use]
    pub fn signing_payload(
        subject: &SubjectId,
        org: &OrgId,
        attributes: &BTreeMap<String, String>,
    ) -> Vec<u8> {
        let mut payload = Vec::with_capacity(128);
        payload.extend_from_slice(CREDENTIAL_DOMAIN);
        push_field(&mut payload, subject.as_str());
        push_field(&mut payload, org.as_str());
        for (k, v) in attributes {
            push_field(&mut payload, k);
            push_field(&mut payload, v);
        }
        payload
    }
}

fn push_field(payload: &mut Vec<u8>, field: &str) {
    payload.extend_from_slice(&(field.len() as u64).to_le_bytes());
    payload.extend_from_slice(field.as_bytes());
}

/// Registry of organization keys plus the role mapping.
#[derive(Debug, Clone, Default)]
pub struct MembershipService {
    orgs: BTreeMap<OrgId, VerifyingKey>,
    config: AuctionConfig,
}

impl MembershipService {
    #[must_use]
    pub fn new(config: AuctionConfig) -> Self {
        Self {
            orgs: BTreeMap::new(),
            config,
        }
    }

    /// Register (or rotate) the verifying key of an organization.
    pub fn register_org(&mut self, org: OrgId, key: VerifyingKey) {
        debug!(org = %org, "Organization registered");
        self.orgs.insert(org, key);
    }

    #[must_use]
    pub fn is_member_org(&self, org: &OrgId) -> bool {
        self.orgs.contains_key(org)
    }

    /// Verify `credential` and produce the caller's identity.
    ///
    /// # Errors
    /// [`AuctionError::PermissionDenied`] for an unknown organization or a bad
    /// signature.
    pub fn verify(&self, credential: &Credential) -> Result<Identity> {
        let key = self.orgs.get(&credential.org).ok_or_else(|| {
            AuctionError::permission_denied(format!(
                "organization {} is not a member",
                credential.org
            ))
        })?;

        let sig_bytes: [u8; 64] = credential.signature.as_slice().try_into().map_err(|_| {
            AuctionError::permission_denied("credential signature must be 64 bytes")
        })?;
        let signature = Signature::from_bytes(&sig_bytes);
        let payload = Credential::signing_payload(
            &credential.subject,
            &credential.org,
            &credential.attributes,
        );

        if key.verify(&payload, &signature).is_err() {
            warn!(
                subject = %credential.subject,
                org = %credential.org,
                "Credential signature rejected"
            );
            return Err(AuctionError::permission_denied(format!(
                "credential for {}@{} is not signed by its organization",
                credential.subject, credential.org
            )));
        }

        Ok(Identity {
            subject: credential.subject.clone(),
            org: credential.org.clone(),
            capabilities: self.capabilities_of(credential),
        })
    }

    fn capabilities_of(&self, credential: &Credential) -> Capabilities {
        match credential.attributes.get(&self.config.role_attribute) {
            Some(role) if *role == self.config.admin_role => {
                Capabilities::none().with(Capability::AuctionAdmin)
            }
            Some(role) if *role == self.config.auditor_role => {
                Capabilities::none().with(Capability::Auditor)
            }
            _ => Capabilities::none(),
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// An organization's certificate authority, for issuing test credentials.
#[cfg(any(test, feature = "test-helpers"))]
pub struct OrgAuthority {
    org: OrgId,
    signing_key: ed25519_dalek::SigningKey,
}

#[cfg(any(test, feature = "test-helpers"))]
impl OrgAuthority {
    pub fn new(org: &str) -> Self {
        Self {
            org: OrgId::new(org),
            signing_key: ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    pub fn org(&self) -> &OrgId {
        &self.org
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Issue a credential carrying the given attributes.
    pub fn issue(&self, subject: &str, attributes: &[(&str, &str)]) -> Credential {
        use ed25519_dalek::Signer;

        let subject = SubjectId::new(subject);
        let attributes: BTreeMap<String, String> = attributes
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let payload = Credential::signing_payload(&subject, &self.org, &attributes);
        let signature = self.signing_key.sign(&payload);
        Credential {
            subject,
            org: self.org.clone(),
            attributes,
            signature: signature.to_bytes().to_vec(),
        }
    }

    /// Plain member credential without a role.
    pub fn member(&self, subject: &str) -> Credential {
        self.issue(subject, &[])
    }

    /// Credential carrying `role` under the default role attribute.
    pub fn with_role(&self, subject: &str, role: &str) -> Credential {
        self.issue(subject, &[(sealbid_types::constants::DEFAULT_ROLE_ATTRIBUTE, role)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(authorities: &[&OrgAuthority]) -> MembershipService {
        let mut svc = MembershipService::new(AuctionConfig::default());
        for a in authorities {
            svc.register_org(a.org().clone(), a.verifying_key());
        }
        svc
    }

    #[test]
    fn verifies_member_credential() {
        let org1 = OrgAuthority::new("Org1MSP");
        let svc = service(&[&org1]);
        let id = svc.verify(&org1.member("alice")).unwrap();
        assert_eq!(id.subject, SubjectId::new("alice"));
        assert_eq!(id.org, OrgId::new("Org1MSP"));
        assert!(id.capabilities.is_empty());
    }

    #[test]
    fn derives_capabilities_from_role() {
        let org1 = OrgAuthority::new("Org1MSP");
        let svc = service(&[&org1]);
        let admin = svc.verify(&org1.with_role("root", "auctionAdmin")).unwrap();
        assert!(admin.has(Capability::AuctionAdmin));
        let auditor = svc.verify(&org1.with_role("audit", "auditor")).unwrap();
        assert!(auditor.has(Capability::Auditor));
        assert!(!auditor.has(Capability::AuctionAdmin));
        let other = svc.verify(&org1.with_role("bob", "trader")).unwrap();
        assert!(other.capabilities.is_empty());
    }

    #[test]
    fn rejects_tampered_attributes() {
        let org1 = OrgAuthority::new("Org1MSP");
        let svc = service(&[&org1]);
        let mut cred = org1.member("alice");
        cred.attributes.insert("role".into(), "auctionAdmin".into());
        let err = svc.verify(&cred).unwrap_err();
        assert!(matches!(err, AuctionError::PermissionDenied { .. }));
    }

    #[test]
    fn rejects_credential_claiming_other_org() {
        let org1 = OrgAuthority::new("Org1MSP");
        let org2 = OrgAuthority::new("Org2MSP");
        let svc = service(&[&org1, &org2]);
        let mut cred = org1.member("alice");
        cred.org = OrgId::new("Org2MSP");
        assert!(svc.verify(&cred).is_err());
    }

    #[test]
    fn rejects_unknown_org_and_short_signature() {
        let org1 = OrgAuthority::new("Org1MSP");
        let svc = service(&[]);
        assert!(svc.verify(&org1.member("alice")).is_err());

        let svc = service(&[&org1]);
        let mut cred = org1.member("alice");
        cred.signature.truncate(10);
        assert!(svc.verify(&cred).is_err());
    }
}
