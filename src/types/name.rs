//! Owned names as seen by the renewal engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Ownership state of a name in the wallet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NameState {
    /// Registered and held by this wallet
    Owned,
    /// A transfer to another address is pending
    Transferring,
    /// Revoked by the owner; can never be renewed
    Revoked,
    /// Anything the backend reports that we do not recognise
    Unknown,
}

impl NameState {
    /// Whether a name in this state may be renewed
    #[must_use]
    pub fn is_owned(self) -> bool {
        matches!(self, Self::Owned)
    }
}

impl fmt::Display for NameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Owned => "owned",
            Self::Transferring => "transferring",
            Self::Revoked => "revoked",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One owned name with its normalized expiry data.
///
/// At most one of `expiry_height` / `expiry_time` is set; the inventory picks
/// the authoritative one when it normalizes backend output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NameRecord {
    /// Name, unique within a wallet
    pub name: String,
    /// Block height at which the registration lapses
    pub expiry_height: Option<u64>,
    /// Absolute time at which the registration lapses
    pub expiry_time: Option<Timestamp>,
    /// Ownership state
    pub state: NameState,
}

impl NameRecord {
    /// Height-based record
    #[must_use]
    pub fn with_height(name: impl Into<String>, expiry_height: u64, state: NameState) -> Self {
        Self {
            name: name.into(),
            expiry_height: Some(expiry_height),
            expiry_time: None,
            state,
        }
    }

    /// Time-based record
    #[must_use]
    pub fn with_time(name: impl Into<String>, expiry_time: Timestamp, state: NameState) -> Self {
        Self {
            name: name.into(),
            expiry_height: None,
            expiry_time: Some(expiry_time),
            state,
        }
    }

    /// Record the backend gave no expiry for
    #[must_use]
    pub fn without_expiry(name: impl Into<String>, state: NameState) -> Self {
        Self {
            name: name.into(),
            expiry_height: None,
            expiry_time: None,
            state,
        }
    }

    /// True if neither expiry representation is known
    #[must_use]
    pub fn has_expiry(&self) -> bool {
        self.expiry_height.is_some() || self.expiry_time.is_some()
    }
}
