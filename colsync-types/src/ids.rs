//! Identifier types used by synced collections.
//!
//! Items are identified on the wire by fixed-width 16-byte binary ids. The
//! canonical text form is the lowercase hyphenated UUID rendering, which is
//! what collection keys are built from.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Width in bytes of a binary item identifier.
pub const ITEM_ID_LEN: usize = 16;

/// Unique identifier for a synced item.
/// Uses UUID v7 when generated locally so ids sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Creates a new item ID with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates an item ID from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Creates an item ID from its raw 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let raw: [u8; ITEM_ID_LEN] = bytes
            .try_into()
            .map_err(|_| Error::InvalidLength(bytes.len()))?;
        Ok(Self(Uuid::from_bytes(raw)))
    }

    /// Returns the raw 16 bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; ITEM_ID_LEN] {
        *self.0.as_bytes()
    }

    /// Parses an item ID from any UUID text form (hyphenated, simple, braced).
    pub fn parse(s: &str) -> Result<Self, Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Returns the canonical text form: lowercase and hyphenated.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ItemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; ITEM_ID_LEN]> for ItemId {
    fn from(bytes: [u8; ITEM_ID_LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}
