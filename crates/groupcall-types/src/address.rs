//! Endpoint identity.
//!
//! An [`Address`] names one endpoint on the channel. Addresses are opaque:
//! the core compares and maps them, the transport resolves them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of one endpoint on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(Uuid);

impl Address {
    /// Generate a fresh random address.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form: the first UUID group is enough to tell endpoints apart
        // in logs.
        let s = self.0.to_string();
        write!(f, "{}", &s[..8])
    }
}

impl From<Uuid> for Address {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
