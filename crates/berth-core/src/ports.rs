//! Port mappings and network links.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValidationError};

fn check_port(port: u16) -> Result<u16> {
    if port == 0 {
        return Err(ValidationError::InvalidPort {
            value: port.to_string(),
            reason: "port 0 cannot be mapped",
        });
    }
    Ok(port)
}

/// Parse a single port from user-supplied text.
///
/// # Errors
///
/// Returns `ValidationError::InvalidPort` for non-numeric, negative,
/// out-of-range, or zero values.
pub fn parse_port(value: &str) -> Result<u16> {
    let trimmed = value.trim();
    let invalid = |reason| ValidationError::InvalidPort {
        value: value.to_string(),
        reason,
    };

    if trimmed.starts_with('-') {
        return Err(invalid("ports cannot be negative"));
    }
    let parsed: u64 = trimmed.parse().map_err(|_| invalid("not a number"))?;
    let port = u16::try_from(parsed).map_err(|_| invalid("must be at most 65535"))?;
    check_port(port)
}

fn split_pair(value: &str) -> Result<(u16, u16)> {
    let (left, right) = value
        .split_once(':')
        .ok_or_else(|| ValidationError::InvalidMapping(value.to_string()))?;
    Ok((parse_port(left)?, parse_port(right)?))
}

/// Exposes a port inside the unit on a port of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPortMap")]
pub struct PortMap {
    internal_port: u16,
    external_port: u16,
}

impl PortMap {
    /// Create a port mapping.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPort` if either port is 0.
    pub fn new(internal_port: u16, external_port: u16) -> Result<Self> {
        Ok(Self {
            internal_port: check_port(internal_port)?,
            external_port: check_port(external_port)?,
        })
    }

    /// Parse `internal:external`, e.g. `8080:32768`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the text is not two valid ports
    /// separated by a colon.
    pub fn parse(value: &str) -> Result<Self> {
        let (internal_port, external_port) = split_pair(value)?;
        Self::new(internal_port, external_port)
    }

    /// Port the process inside the unit listens on.
    #[must_use]
    pub const fn internal_port(&self) -> u16 {
        self.internal_port
    }

    /// Port exposed on the host.
    #[must_use]
    pub const fn external_port(&self) -> u16 {
        self.external_port
    }
}

impl fmt::Display for PortMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.internal_port, self.external_port)
    }
}

impl FromStr for PortMap {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Connects a port inside the unit to a port on the host.
///
/// Traffic the unit sends to `local_port` is forwarded to `remote_port` on
/// the host the runtime is configured to link against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLink")]
pub struct Link {
    local_port: u16,
    remote_port: u16,
}

impl Link {
    /// Create a link.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPort` if either port is 0.
    pub fn new(local_port: u16, remote_port: u16) -> Result<Self> {
        Ok(Self {
            local_port: check_port(local_port)?,
            remote_port: check_port(remote_port)?,
        })
    }

    /// Parse `local:remote`, e.g. `5432:15432`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the text is not two valid ports
    /// separated by a colon.
    pub fn parse(value: &str) -> Result<Self> {
        let (local_port, remote_port) = split_pair(value)?;
        Self::new(local_port, remote_port)
    }

    /// Port inside the unit.
    #[must_use]
    pub const fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Port on the host.
    #[must_use]
    pub const fn remote_port(&self) -> u16 {
        self.remote_port
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.local_port, self.remote_port)
    }
}

impl FromStr for Link {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// Unvalidated wire shapes; deserialization goes through the constructors.
#[derive(Deserialize)]
struct RawPortMap {
    internal_port: u16,
    external_port: u16,
}

impl TryFrom<RawPortMap> for PortMap {
    type Error = ValidationError;

    fn try_from(raw: RawPortMap) -> Result<Self> {
        Self::new(raw.internal_port, raw.external_port)
    }
}

#[derive(Deserialize)]
struct RawLink {
    local_port: u16,
    remote_port: u16,
}

impl TryFrom<RawLink> for Link {
    type Error = ValidationError;

    fn try_from(raw: RawLink) -> Result<Self> {
        Self::new(raw.local_port, raw.remote_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_map_accessors() {
        let map = PortMap::new(8080, 32768).unwrap();
        assert_eq!(map.internal_port(), 8080);
        assert_eq!(map.external_port(), 32768);
        assert_eq!(map.to_string(), "8080:32768");
    }

    #[test]
    fn port_map_rejects_zero() {
        assert!(PortMap::new(0, 80).is_err());
        assert!(PortMap::new(80, 0).is_err());
        assert!(Link::new(0, 1).is_err());
    }

    #[test]
    fn parse_port_rejects_garbage() {
        assert_eq!(parse_port("80").unwrap(), 80);
        assert_eq!(parse_port(" 443 ").unwrap(), 443);

        for bad in ["", "http", "-1", "65536", "99999999999", "8.5"] {
            assert!(
                matches!(parse_port(bad), Err(ValidationError::InvalidPort { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_port_reports_negative() {
        match parse_port("-80") {
            Err(ValidationError::InvalidPort { reason, .. }) => {
                assert_eq!(reason, "ports cannot be negative");
            }
            other => panic!("expected InvalidPort, got {other:?}"),
        }
    }

    #[test]
    fn port_map_parse() {
        let map: PortMap = "8080:32768".parse().unwrap();
        assert_eq!(map, PortMap::new(8080, 32768).unwrap());

        assert!(matches!(
            PortMap::parse("8080"),
            Err(ValidationError::InvalidMapping(_))
        ));
        assert!(PortMap::parse("8080:abc").is_err());
        assert!(PortMap::parse("-1:80").is_err());
    }

    #[test]
    fn deserialize_validates() {
        let map: PortMap =
            serde_json::from_str(r#"{"internal_port":8080,"external_port":80}"#).unwrap();
        assert_eq!(map, PortMap::new(8080, 80).unwrap());

        let zero: std::result::Result<PortMap, _> =
            serde_json::from_str(r#"{"internal_port":0,"external_port":80}"#);
        assert!(zero.is_err());

        let negative: std::result::Result<Link, _> =
            serde_json::from_str(r#"{"local_port":-1,"remote_port":80}"#);
        assert!(negative.is_err());
    }

    #[test]
    fn link_parse() {
        let link = Link::parse("5432:15432").unwrap();
        assert_eq!(link.local_port(), 5432);
        assert_eq!(link.remote_port(), 15432);
        assert_eq!(link.to_string(), "5432:15432");
    }
}
