//! Environment definitions injected into a unit's process.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, ValidationError};
use crate::names::EnvironmentId;

/// A named set of environment variables.
///
/// Keys are unique. Two environments are equal when both the ID and the
/// full variable set match. The client passes environments through to the
/// runtime unchanged and never interprets the ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawEnvironment")]
pub struct Environment {
    id: EnvironmentId,
    variables: BTreeMap<String, String>,
}

impl Environment {
    /// Build an environment from key/value pairs.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidVariable` for an empty key or one
    /// containing `=` or NUL, and `ValidationError::DuplicateVariable` when a
    /// key appears more than once.
    pub fn new<I, K, V>(id: EnvironmentId, variables: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in variables {
            let key = key.into();
            validate_key(&key)?;
            let value = value.into();
            if value.contains('\0') {
                return Err(ValidationError::InvalidVariable {
                    key,
                    reason: "value must not contain NUL",
                });
            }
            if map.contains_key(&key) {
                return Err(ValidationError::DuplicateVariable(key));
            }
            map.insert(key, value);
        }
        Ok(Self {
            id,
            variables: map,
        })
    }

    /// The environment's identifier.
    #[must_use]
    pub fn id(&self) -> &EnvironmentId {
        &self.id
    }

    /// Look up a single variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Iterate over the variables in key order.
    pub fn variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether the environment defines no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

#[derive(Deserialize)]
struct RawEnvironment {
    id: EnvironmentId,
    variables: BTreeMap<String, String>,
}

impl TryFrom<RawEnvironment> for Environment {
    type Error = ValidationError;

    fn try_from(raw: RawEnvironment) -> Result<Self> {
        Self::new(raw.id, raw.variables)
    }
}

fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        "must not be empty"
    } else if key.contains('=') {
        "must not contain '='"
    } else if key.contains('\0') {
        "must not contain NUL"
    } else {
        return Ok(());
    };
    Err(ValidationError::InvalidVariable {
        key: key.to_string(),
        reason,
    })
}
