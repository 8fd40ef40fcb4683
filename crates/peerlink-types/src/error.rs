//! Error types for the Peerlink session escrow.
//!
//! All errors use the `PL_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Device errors
//! - 2xx: Session errors
//! - 3xx: Funds / escrow errors
//! - 4xx: Settlement errors
//! - 9xx: General / internal errors
//!
//! Every variant below 900 is a precondition failure: it is raised before
//! any state is touched, so a failed call never leaves partial updates.

use thiserror::Error;

use crate::{Amount, DeviceId, Principal, SessionId, SessionState};

/// Central error enum for all Peerlink operations.
#[derive(Debug, Error)]
pub enum PeerlinkError {
    // =================================================================
    // Device Errors (1xx)
    // =================================================================
    /// No device with this ID has been registered.
    #[error("PL_ERR_100: Device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// The caller does not own the referenced device.
    #[error("PL_ERR_101: Device {device} is not owned by {caller}")]
    UnauthorizedDevice { device: DeviceId, caller: Principal },

    /// The device label exceeds the configured maximum length.
    #[error("PL_ERR_102: Device label too long: {len} bytes, max {max}")]
    LabelTooLong { len: usize, max: usize },

    // =================================================================
    // Session Errors (2xx)
    // =================================================================
    /// No session with this ID exists.
    #[error("PL_ERR_200: Session not found: {0}")]
    SessionNotFound(SessionId),

    /// The operation is not allowed in the session's current lifecycle state.
    /// `actual` is `None` when the session has not been created yet.
    #[error(
        "PL_ERR_201: Invalid state for {session}: expected {expected}, got {}",
        state_label(.actual.as_ref())
    )]
    InvalidSessionState {
        session: SessionId,
        expected: SessionState,
        actual: Option<SessionState>,
    },

    /// The caller is not a participant of the session.
    #[error("PL_ERR_202: {caller} is not a participant of {session}")]
    Unauthorized {
        session: SessionId,
        caller: Principal,
    },

    /// The named counterparty is not the other participant of the session.
    #[error("PL_ERR_203: Counterparty mismatch for {session}: named {named}")]
    CounterpartyMismatch {
        session: SessionId,
        named: Principal,
    },

    /// The host attempted to join its own session.
    #[error("PL_ERR_204: Host cannot join its own session {0}")]
    SelfJoin(SessionId),

    // =================================================================
    // Funds / Escrow Errors (3xx)
    // =================================================================
    /// The deposit amount is zero or otherwise disallowed.
    #[error("PL_ERR_300: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// The caller's external balance cannot cover the deposit.
    #[error("PL_ERR_301: Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Amount, available: Amount },

    /// An escrow hold already exists for this (session, role).
    #[error("PL_ERR_302: Escrow already held for {0}")]
    EscrowAlreadyHeld(SessionId),

    /// No escrow is held for this session.
    #[error("PL_ERR_303: No escrow held for {0}")]
    EscrowNotHeld(SessionId),

    /// A credit would overflow the recipient's balance.
    #[error("PL_ERR_304: Balance overflow crediting {0}")]
    BalanceOverflow(Principal),

    // =================================================================
    // Settlement Errors (4xx)
    // =================================================================
    /// The session has already been settled (idempotency guard).
    #[error("PL_ERR_400: Session already settled: {0}")]
    SessionAlreadySettled(SessionId),

    /// Escrow conservation invariant violated. Critical safety alert.
    #[error("PL_ERR_401: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// An identifier counter reached the end of its range.
    #[error("PL_ERR_900: Identifier space exhausted for {kind}")]
    IdentifierExhausted { kind: &'static str },

    /// Unrecoverable internal error.
    #[error("PL_ERR_901: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("PL_ERR_902: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("PL_ERR_903: Configuration error: {0}")]
    Configuration(String),
}

impl PeerlinkError {
    /// The numeric `PL_ERR_` code of this error.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::DeviceNotFound(_) => 100,
            Self::UnauthorizedDevice { .. } => 101,
            Self::LabelTooLong { .. } => 102,
            Self::SessionNotFound(_) => 200,
            Self::InvalidSessionState { .. } => 201,
            Self::Unauthorized { .. } => 202,
            Self::CounterpartyMismatch { .. } => 203,
            Self::SelfJoin(_) => 204,
            Self::InvalidAmount { .. } => 300,
            Self::InsufficientFunds { .. } => 301,
            Self::EscrowAlreadyHeld(_) => 302,
            Self::EscrowNotHeld(_) => 303,
            Self::BalanceOverflow(_) => 304,
            Self::SessionAlreadySettled(_) => 400,
            Self::SupplyInvariantViolation { .. } => 401,
            Self::IdentifierExhausted { .. } => 900,
            Self::Internal(_) => 901,
            Self::Serialization(_) => 902,
            Self::Configuration(_) => 903,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PeerlinkError>;

fn state_label(state: Option<&SessionState>) -> String {
    state.map_or_else(|| "NONE".to_string(), ToString::to_string)
}

impl From<serde_json::Error> for PeerlinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
