//! # Session — the two-party escrow context
//!
//! ## State Machine
//!
//! ```text
//!   ┌──────┐  join_and_deposit  ┌────────┐  close_session  ┌────────┐
//!   │ OPEN ├───────────────────▶│ JOINED ├────────────────▶│ CLOSED │
//!   └──────┘                    └────────┘                 └────────┘
//! ```
//!
//! Each transition happens at most once. `CLOSED` is terminal.
//!
//! ## Record Invariants
//!
//! - `guest_device_id` / `guest_owner` are set iff the state is `JOINED` or `CLOSED`
//! - `host_deposit > 0` for every stored session
//! - after close both deposits read zero: the funds were disbursed

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Amount, DeviceId, Principal, SessionId};

/// The lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Host has escrowed its deposit; waiting for a guest.
    Open,
    /// Guest has escrowed its deposit; both parties are bound.
    Joined,
    /// Escrow disbursed. **Terminal.**
    Closed,
}

impl SessionState {
    /// Can a session move from this state to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Joined) | (Self::Joined, Self::Closed)
        )
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        *self == Self::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Joined => write!(f, "JOINED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Which side of a session a deposit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum EscrowRole {
    Host,
    Guest,
}

impl EscrowRole {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Host => Self::Guest,
            Self::Guest => Self::Host,
        }
    }
}

impl fmt::Display for EscrowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "HOST"),
            Self::Guest => write!(f, "GUEST"),
        }
    }
}

/// A session record. Owned exclusively by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub host_device_id: DeviceId,
    pub host_owner: Principal,
    /// Set on join.
    pub guest_device_id: Option<DeviceId>,
    /// Set on join.
    pub guest_owner: Option<Principal>,
    pub state: SessionState,
    pub host_deposit: Amount,
    pub guest_deposit: Amount,
}

impl Session {
    /// A freshly opened session holding only the host's deposit.
    #[must_use]
    pub fn open(
        session_id: SessionId,
        host_device_id: DeviceId,
        host_owner: Principal,
        host_deposit: Amount,
    ) -> Self {
        Self {
            session_id,
            host_device_id,
            host_owner,
            guest_device_id: None,
            guest_owner: None,
            state: SessionState::Open,
            host_deposit,
            guest_deposit: 0,
        }
    }

    /// Funds currently escrowed for this session.
    ///
    /// Deposits are bounded by real balances, so the sum saturating is
    /// unreachable in practice.
    #[must_use]
    pub fn total_escrow(&self) -> Amount {
        self.host_deposit.saturating_add(self.guest_deposit)
    }

    /// The role `principal` plays in this session, if any.
    #[must_use]
    pub fn participant_role(&self, principal: &Principal) -> Option<EscrowRole> {
        if self.host_owner == *principal {
            Some(EscrowRole::Host)
        } else if self.guest_owner.as_ref() == Some(principal) {
            Some(EscrowRole::Guest)
        } else {
            None
        }
    }

    /// The owner on the given side, if that side is populated.
    #[must_use]
    pub fn owner_of(&self, role: EscrowRole) -> Option<Principal> {
        match role {
            EscrowRole::Host => Some(self.host_owner),
            EscrowRole::Guest => self.guest_owner,
        }
    }

    /// The deposit recorded for the given side.
    #[must_use]
    pub fn deposit_of(&self, role: EscrowRole) -> Amount {
        match role {
            EscrowRole::Host => self.host_deposit,
            EscrowRole::Guest => self.guest_deposit,
        }
    }

    /// Whether `principal` is host or guest.
    #[must_use]
    pub fn involves(&self, principal: &Principal) -> bool {
        self.participant_role(principal).is_some()
    }
}

/// Final fund distribution applied when a session closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub session_id: SessionId,
    pub host_owner: Principal,
    pub host_amount: Amount,
    pub guest_owner: Principal,
    pub guest_amount: Amount,
}

impl Payout {
    /// Total credited to both parties.
    #[must_use]
    pub fn total(&self) -> Amount {
        self.host_amount.saturating_add(self.guest_amount)
    }
}
