//! Validated identifiers for units and environments.
//!
//! Both identifiers share the runtime's naming rules: 1 to 63 bytes of
//! ASCII letters, digits, `-`, `_` or `.`, starting with a letter or digit.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};

/// Maximum length of a unit name or environment ID, in bytes.
pub const MAX_NAME_LEN: usize = 63;

fn validate(kind: &'static str, value: &str) -> Result<()> {
    let invalid = |reason| ValidationError::InvalidName {
        kind,
        value: value.to_string(),
        reason,
    };

    let Some(first) = value.chars().next() else {
        return Err(invalid("must not be empty"));
    };
    if value.len() > MAX_NAME_LEN {
        return Err(invalid("must be at most 63 bytes long"));
    }
    if !first.is_ascii_alphanumeric() {
        return Err(invalid("must start with an ASCII letter or digit"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid(
            "may only contain ASCII letters, digits, '-', '_' and '.'",
        ));
    }
    Ok(())
}

/// The name of a unit: the sole handle every lifecycle operation is keyed by.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitName(String);

impl UnitName {
    /// Validate and wrap a unit name.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidName` if the name breaks the naming rules.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate("unit name", &name)?;
        Ok(Self(name))
    }

    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitName({})", self.0)
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UnitName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for UnitName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for UnitName {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UnitName> for String {
    fn from(name: UnitName) -> Self {
        name.0
    }
}

impl AsRef<str> for UnitName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for UnitName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of an environment definition.
///
/// The runtime uses it to deduplicate environments shared between units.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EnvironmentId(String);

impl EnvironmentId {
    /// Validate and wrap an environment ID.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidName` if the ID breaks the naming rules.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate("environment id", &id)?;
        Ok(Self(id))
    }

    /// Return the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvironmentId({})", self.0)
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EnvironmentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for EnvironmentId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<EnvironmentId> for String {
    fn from(id: EnvironmentId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_name_accepts_runtime_charset() {
        for name in ["web", "web-1", "db_primary", "a.b.c", "0abc", "A"] {
            let parsed = UnitName::new(name).unwrap();
            assert_eq!(parsed.as_str(), name);
            assert_eq!(parsed.to_string(), name);
        }
    }

    #[test]
    fn unit_name_rejects_bad_names() {
        assert!(UnitName::new("").is_err());
        assert!(UnitName::new("!!!###!!!").is_err());
        assert!(UnitName::new("-leading-dash").is_err());
        assert!(UnitName::new("has space").is_err());
        assert!(UnitName::new("slash/name").is_err());
        assert!(UnitName::new("ünïcode").is_err());
        assert!(UnitName::new("x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(UnitName::new("x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn unit_name_error_kind() {
        match UnitName::new("!bad") {
            Err(ValidationError::InvalidName { kind, value, .. }) => {
                assert_eq!(kind, "unit name");
                assert_eq!(value, "!bad");
            }
            other => panic!("expected InvalidName, got {other:?}"),
        }
    }

    #[test]
    fn unit_name_serde_validates() {
        let name = UnitName::new("web-1").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"web-1\"");

        let back: UnitName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);

        let bad: std::result::Result<UnitName, _> = serde_json::from_str("\"no way\"");
        assert!(bad.is_err());
    }

    #[test]
    fn environment_id_uses_same_rules() {
        assert!(EnvironmentId::new("E1").is_ok());
        match EnvironmentId::new("E 1") {
            Err(ValidationError::InvalidName { kind, .. }) => assert_eq!(kind, "environment id"),
            other => panic!("expected InvalidName, got {other:?}"),
        }
    }
}
