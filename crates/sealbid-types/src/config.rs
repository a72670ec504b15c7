//! Engine configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AuctionError, Result, constants};

/// Tunables shared by every auction run through one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
    /// Price increase between consecutive rounds.
    pub price_increment: Decimal,
    /// Credential attribute that carries the caller's role.
    pub role_attribute: String,
    /// Role value mapped to [`crate::Capability::AuctionAdmin`].
    pub admin_role: String,
    /// Role value mapped to [`crate::Capability::Auditor`].
    pub auditor_role: String,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            price_increment: Decimal::new(constants::DEFAULT_PRICE_INCREMENT, 0),
            role_attribute: constants::DEFAULT_ROLE_ATTRIBUTE.to_string(),
            admin_role: constants::DEFAULT_ADMIN_ROLE.to_string(),
            auditor_role: constants::DEFAULT_AUDITOR_ROLE.to_string(),
        }
    }
}

impl AuctionConfig {
    /// Parse and validate a JSON config document. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AuctionError::Configuration(format!("invalid config document: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`AuctionError::Configuration`] for a non-positive increment or
    /// empty role names.
    pub fn validate(&self) -> Result<()> {
        if self.price_increment <= Decimal::ZERO {
            return Err(AuctionError::Configuration(format!(
                "price_increment must be positive, got {}",
                self.price_increment
            )));
        }
        if self.role_attribute.is_empty()
            || self.admin_role.is_empty()
            || self.auditor_role.is_empty()
        {
            return Err(AuctionError::Configuration(
                "role attribute and role values must not be empty".to_string(),
            ));
        }
        if self.admin_role == self.auditor_role {
            return Err(AuctionError::Configuration(
                "admin and auditor roles must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AuctionConfig::default();
        assert_eq!(config.price_increment, Decimal::new(5, 0));
        assert_eq!(config.admin_role, "auctionAdmin");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_document_fills_defaults() {
        let config = AuctionConfig::from_json(r#"{"price_increment":"2.5"}"#).unwrap();
        assert_eq!(config.price_increment, Decimal::new(25, 1));
        assert_eq!(config.role_attribute, "role");
    }

    #[test]
    fn rejects_non_positive_increment() {
        let err = AuctionConfig::from_json(r#"{"price_increment":"0"}"#).unwrap_err();
        assert!(matches!(err, AuctionError::Configuration(_)));
    }

    #[test]
    fn rejects_malformed_document() {
        let err = AuctionConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, AuctionError::Configuration(_)));
    }
}
