//! Identifiers used throughout Peerlink.
//!
//! Devices and sessions are numbered by monotonically increasing `u64`
//! counters owned by the table that stores them. Principals are opaque
//! 32-byte identities (an ed25519 public key in practice). Receipts use
//! UUIDv7 for time-ordered sorting.

use std::fmt;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PeerlinkError, Result};

// ---------------------------------------------------------------------------
// DeviceId
// ---------------------------------------------------------------------------

/// Registry-assigned device identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl DeviceId {
    /// The identifier following this one.
    ///
    /// # Errors
    /// Returns `IdentifierExhausted` at `u64::MAX`.
    pub fn next(self) -> Result<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(PeerlinkError::IdentifierExhausted { kind: "device" })
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// Session identifier, assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// The identifier following this one.
    ///
    /// # Errors
    /// Returns `IdentifierExhausted` at `u64::MAX`.
    pub fn next(self) -> Result<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or(PeerlinkError::IdentifierExhausted { kind: "session" })
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// An opaque party identity: device owners, hosts, guests, counterparties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Principal(pub [u8; 32]);

impl Principal {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Identity derived from an ed25519 public key.
    #[must_use]
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "principal:{}", hex::encode(&self.0[..8]))
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl Principal {
    /// Random principal for tests. **Never use in production.**
    pub fn random() -> Self {
        Self(rand::random::<[u8; 32]>())
    }
}

// ---------------------------------------------------------------------------
// Caller
// ---------------------------------------------------------------------------

/// The authenticated principal attributed to an operation.
///
/// Only the execution environment constructs a `Caller`, after it has
/// authenticated the transaction sender. Principals that arrive as payload
/// data (e.g. a named counterparty) stay plain [`Principal`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Caller(Principal);

impl Caller {
    #[must_use]
    pub fn authenticated(principal: Principal) -> Self {
        Self(principal)
    }

    #[must_use]
    pub fn principal(&self) -> Principal {
        self.0
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// ReceiptId
// ---------------------------------------------------------------------------

/// Unique receipt identifier. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ReceiptId(pub Uuid);

impl ReceiptId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rcpt:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
