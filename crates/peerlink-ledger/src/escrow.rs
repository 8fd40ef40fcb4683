//! Escrow ledger: holds session deposits between join and close.
//!
//! [`EscrowLedger::hold`] atomically debits the depositor and records the
//! amount against `(session, role)`. [`EscrowLedger::release`] hands the
//! held amounts to settlement and clears the entry; it succeeds once per
//! session because the entry is gone afterwards.
//!
//! The ledger never holds funds outside a session: an entry is created by
//! the host hold and removed by release.

use std::collections::HashMap;

use peerlink_types::{Amount, EscrowRole, PeerlinkError, Principal, Result, SessionId};

use crate::accounts::AccountStore;

/// Amounts held for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscrowHold {
    pub host: Amount,
    pub guest: Amount,
}

impl EscrowHold {
    #[must_use]
    pub fn get(&self, role: EscrowRole) -> Amount {
        match role {
            EscrowRole::Host => self.host,
            EscrowRole::Guest => self.guest,
        }
    }

    #[must_use]
    pub fn total(&self) -> u128 {
        u128::from(self.host) + u128::from(self.guest)
    }
}

/// Per-session escrow balances.
#[derive(Debug, Default)]
pub struct EscrowLedger {
    holds: HashMap<SessionId, EscrowHold>,
    /// Running sum of every entry in `holds`.
    total_held: u128,
}

impl EscrowLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that [`hold`](Self::hold) would succeed, without touching state.
    ///
    /// # Errors
    /// - `InvalidAmount` if `amount` is zero
    /// - `EscrowAlreadyHeld` if the role already has a deposit
    /// - `EscrowNotHeld` if a guest deposit arrives before the host's
    /// - `InsufficientFunds` if the depositor cannot cover `amount`
    pub fn check_hold<A: AccountStore + ?Sized>(
        &self,
        accounts: &A,
        session_id: SessionId,
        role: EscrowRole,
        depositor: &Principal,
        amount: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Err(PeerlinkError::InvalidAmount {
                reason: "deposit must be greater than zero".into(),
            });
        }

        let existing = self.holds.get(&session_id);
        if existing.is_some_and(|h| h.get(role) > 0) {
            return Err(PeerlinkError::EscrowAlreadyHeld(session_id));
        }
        if role == EscrowRole::Guest && existing.is_none() {
            return Err(PeerlinkError::EscrowNotHeld(session_id));
        }

        if !accounts.can_debit(depositor, amount) {
            return Err(PeerlinkError::InsufficientFunds {
                needed: amount,
                available: accounts.available(depositor),
            });
        }
        Ok(())
    }

    /// Debit `depositor` and record `amount` against `(session_id, role)`.
    ///
    /// If any check fails nothing is debited and nothing is recorded.
    ///
    /// # Errors
    /// Same as [`check_hold`](Self::check_hold).
    pub fn hold<A: AccountStore + ?Sized>(
        &mut self,
        accounts: &mut A,
        session_id: SessionId,
        role: EscrowRole,
        depositor: &Principal,
        amount: Amount,
    ) -> Result<()> {
        self.check_hold(accounts, session_id, role, depositor, amount)?;

        // Debit first: if the store refuses, the ledger is untouched.
        accounts.debit(depositor, amount)?;

        let entry = self.holds.entry(session_id).or_default();
        match role {
            EscrowRole::Host => entry.host = amount,
            EscrowRole::Guest => entry.guest = amount,
        }
        self.total_held += u128::from(amount);

        tracing::debug!(
            session = %session_id,
            role = %role,
            depositor = %depositor,
            amount,
            "Escrow held"
        );
        Ok(())
    }

    /// Remove and return the amounts held for `session_id`.
    ///
    /// # Errors
    /// Returns `EscrowNotHeld` if nothing is held (never held, or already
    /// released).
    pub fn release(&mut self, session_id: SessionId) -> Result<EscrowHold> {
        let hold = self
            .holds
            .remove(&session_id)
            .ok_or(PeerlinkError::EscrowNotHeld(session_id))?;
        self.total_held -= hold.total();

        tracing::debug!(
            session = %session_id,
            host = hold.host,
            guest = hold.guest,
            "Escrow released"
        );
        Ok(hold)
    }

    /// Amounts currently held for `session_id` (zero if none).
    #[must_use]
    pub fn held(&self, session_id: SessionId) -> EscrowHold {
        self.holds.get(&session_id).copied().unwrap_or_default()
    }

    /// Sum of everything currently held, across all sessions.
    #[must_use]
    pub fn total_held(&self) -> u128 {
        self.total_held
    }

    /// Number of sessions with funds in escrow.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.holds.len()
    }
}
