//! Receipt types for the Peerlink audit trail.
//!
//! Every successful transition (device registered, session opened, joined,
//! closed) produces a [`Receipt`] whose payload hash can be independently
//! recomputed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{DeviceId, Principal, ReceiptId, Result, SessionId, constants};

/// The type of action this receipt proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptType {
    /// A device was added to the registry.
    DeviceRegistered,
    /// A host escrowed its deposit and opened a session.
    SessionOpened,
    /// A guest escrowed its deposit and joined a session.
    SessionJoined,
    /// The session escrow was disbursed.
    SessionClosed,
}

impl std::fmt::Display for ReceiptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeviceRegistered => write!(f, "DEVICE_REGISTERED"),
            Self::SessionOpened => write!(f, "SESSION_OPENED"),
            Self::SessionJoined => write!(f, "SESSION_JOINED"),
            Self::SessionClosed => write!(f, "SESSION_CLOSED"),
        }
    }
}

/// An append-only record proving that an action occurred.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    /// What kind of action this receipt proves.
    pub receipt_type: ReceiptType,
    /// The session affected, if any.
    pub session_id: Option<SessionId>,
    /// The device affected, if any.
    pub device_id: Option<DeviceId>,
    /// The authenticated caller that performed the action.
    pub actor: Principal,
    /// JSON encoding of the record after the transition.
    pub payload: Vec<u8>,
    /// SHA-256 over the domain separator and `payload`.
    pub payload_hash: [u8; 32],
    pub issued_at: DateTime<Utc>,
}

impl Receipt {
    /// Serialize `record` and issue a receipt over it.
    ///
    /// # Errors
    /// Returns `Serialization` if `record` cannot be encoded.
    pub fn issue<T: Serialize>(
        receipt_type: ReceiptType,
        actor: Principal,
        session_id: Option<SessionId>,
        device_id: Option<DeviceId>,
        record: &T,
    ) -> Result<Self> {
        let payload = serde_json::to_vec(record)?;
        let payload_hash = Self::hash_payload(&payload);
        Ok(Self {
            id: ReceiptId::new(),
            receipt_type,
            session_id,
            device_id,
            actor,
            payload,
            payload_hash,
            issued_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn hash_payload(payload: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::RECEIPT_HASH_DOMAIN);
        hasher.update(payload);
        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }

    /// Recompute the payload hash and compare.
    #[must_use]
    pub fn verify_hash(&self) -> bool {
        Self::hash_payload(&self.payload) == self.payload_hash
    }

    #[must_use]
    pub fn payload_hash_hex(&self) -> String {
        hex::encode(self.payload_hash)
    }
}
