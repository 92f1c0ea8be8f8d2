//! Protocol version identifiers.
//!
//! A version is negotiated by the handshake layer before any message reaches
//! the state machine. The version selects a transition table; nothing else in
//! the crate branches on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A negotiated protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProtocolVersion {
    /// Major version component.
    pub major: u8,
    /// Minor version component.
    pub minor: u8,
}

impl ProtocolVersion {
    /// Version 1.0 — HELLO carries credentials and authenticates inline.
    pub const V1_0: ProtocolVersion = ProtocolVersion::new(1, 0);

    /// Version 1.1 — explicit LOGON/LOGOFF for mid-connection user switching.
    pub const V1_1: ProtocolVersion = ProtocolVersion::new(1, 1);

    /// Version 1.2 — adds TELEMETRY; RESET mid-transaction rolls back.
    pub const V1_2: ProtocolVersion = ProtocolVersion::new(1, 2);

    /// All versions this crate builds transition tables for.
    pub const SUPPORTED: [ProtocolVersion; 3] = [Self::V1_0, Self::V1_1, Self::V1_2];

    /// Create a version from its components.
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Whether a transition table exists for this version.
    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(self)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once('.')
            .ok_or_else(|| format!("Invalid protocol version: {s}"))?;
        let major = major
            .parse()
            .map_err(|_| format!("Invalid major version: {s}"))?;
        let minor = minor
            .parse()
            .map_err(|_| format!("Invalid minor version: {s}"))?;
        Ok(Self { major, minor })
    }
}
