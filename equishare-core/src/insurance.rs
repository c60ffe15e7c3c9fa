use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Insurance attached to a tokenized asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceInfo {
    /// Whether the asset is insured at all
    pub has_insurance: bool,

    /// Insured value in minor currency units; required when insured
    pub insured_value: Option<u64>,

    /// Name of the insurer
    pub insurer: Option<String>,

    /// Policy reference with the insurer
    pub policy_number: Option<String>,

    /// Textual guarantees offered to token holders
    #[serde(default)]
    pub guarantees: Guarantees,
}

impl InsuranceInfo {
    /// Check the "insured implies insured value" rule
    pub fn validate(&self) -> Result<(), String> {
        if !self.has_insurance {
            return Ok(());
        }
        match self.insured_value {
            Some(value) if value > 0 => Ok(()),
            Some(_) => Err("insured_value must be positive when has_insurance is set".to_string()),
            None => Err("insured_value is required when has_insurance is set".to_string()),
        }
    }
}

/// Versioned list of guarantee statements.
///
/// Serialized as `{"version": 1, "items": [..]}`. Decoding rejects any other
/// version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GuaranteesEnvelope", into = "GuaranteesEnvelope")]
pub struct Guarantees {
    items: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct GuaranteesEnvelope {
    version: u32,
    items: Vec<String>,
}

impl Guarantees {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn push(&mut self, item: impl Into<String>) {
        self.items.push(item.into());
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(value: &str) -> Result<Self, StorageError> {
        Ok(serde_json::from_str(value)?)
    }
}

impl TryFrom<GuaranteesEnvelope> for Guarantees {
    type Error = String;

    fn try_from(envelope: GuaranteesEnvelope) -> Result<Self, Self::Error> {
        if envelope.version != Self::CURRENT_VERSION {
            return Err(format!(
                "unsupported guarantees version {} (expected {})",
                envelope.version,
                Self::CURRENT_VERSION
            ));
        }
        Ok(Self {
            items: envelope.items,
        })
    }
}

impl From<Guarantees> for GuaranteesEnvelope {
    fn from(guarantees: Guarantees) -> Self {
        Self {
            version: Guarantees::CURRENT_VERSION,
            items: guarantees.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarantees_wire_format() {
        let mut guarantees = Guarantees::default();
        guarantees.push("veterinary certificate on file");
        guarantees.push("mortality cover");

        let json = guarantees.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"version":1,"items":["veterinary certificate on file","mortality cover"]}"#
        );
        assert_eq!(Guarantees::from_json(&json).unwrap(), guarantees);
    }

    #[test]
    fn test_guarantees_rejects_unknown_version() {
        let err = Guarantees::from_json(r#"{"version":2,"items":[]}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported guarantees version 2"));

        // Untyped payloads are not accepted
        assert!(Guarantees::from_json(r#"{"a":{"b":"c"}}"#).is_err());
    }

    #[test]
    fn test_insured_requires_value() {
        let mut info = InsuranceInfo {
            has_insurance: true,
            ..Default::default()
        };
        assert!(info.validate().is_err());

        info.insured_value = Some(0);
        assert!(info.validate().is_err());

        info.insured_value = Some(250_000_00);
        assert!(info.validate().is_ok());

        // Uninsured assets need nothing
        assert!(InsuranceInfo::default().validate().is_ok());
    }
}
