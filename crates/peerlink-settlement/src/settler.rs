//! Session settlement.
//!
//! Policy is fixed: full symmetric return. Each party is credited exactly
//! the deposit it escrowed; there is no fee and no penalty.
//!
//! Steps:
//! 1. Check idempotency (no double-settlement)
//! 2. Cross-check the ledger hold against the session record
//! 3. Compute the payout from the hold
//! 4. Check both credits can be applied
//! 5. Release the hold, credit host and guest, record the disbursement

use std::num::NonZeroUsize;

use peerlink_ledger::{AccountStore, EscrowHold, EscrowLedger};
use peerlink_types::{Amount, PeerlinkError, Payout, Result, Session, SessionState};

use crate::idempotency::IdempotencyGuard;
use crate::supply_conservation::SupplyConservation;

/// Computes and applies the final fund distribution of a session.
#[derive(Debug)]
pub struct SettlementEngine {
    idempotency: IdempotencyGuard,
    supply: SupplyConservation,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(settled_cache_size: NonZeroUsize) -> Self {
        Self {
            idempotency: IdempotencyGuard::new(settled_cache_size),
            supply: SupplyConservation::new(),
        }
    }

    /// Account for a deposit that just entered escrow.
    pub fn record_escrowed(&mut self, amount: Amount) {
        self.supply.record_escrowed(amount);
    }

    /// The payout a `JOINED` session would receive, without moving funds.
    ///
    /// # Errors
    /// - `SessionAlreadySettled` if the session was settled before
    /// - `InvalidSessionState` if the session is not `JOINED`
    /// - `SupplyInvariantViolation` if the hold disagrees with the record
    /// - `BalanceOverflow` if a credit could not be applied
    pub fn plan<A: AccountStore + ?Sized>(
        &self,
        accounts: &A,
        ledger: &EscrowLedger,
        session: &Session,
    ) -> Result<Payout> {
        let session_id = session.session_id;
        self.idempotency.check(session_id)?;

        if session.state != SessionState::Joined {
            return Err(PeerlinkError::InvalidSessionState {
                session: session_id,
                expected: SessionState::Joined,
                actual: Some(session.state),
            });
        }
        let guest_owner = session.guest_owner.ok_or_else(|| {
            PeerlinkError::Internal(format!("{session_id} is JOINED without a guest"))
        })?;

        let hold = ledger.held(session_id);
        let recorded = EscrowHold {
            host: session.host_deposit,
            guest: session.guest_deposit,
        };
        if hold != recorded {
            return Err(PeerlinkError::SupplyInvariantViolation {
                reason: format!(
                    "{session_id}: ledger holds {}/{} but record says {}/{}",
                    hold.host, hold.guest, recorded.host, recorded.guest
                ),
            });
        }

        let payout = Payout {
            session_id,
            host_owner: session.host_owner,
            host_amount: hold.host,
            guest_owner,
            guest_amount: hold.guest,
        };
        for (who, amount) in [
            (&payout.host_owner, payout.host_amount),
            (&payout.guest_owner, payout.guest_amount),
        ] {
            if !accounts.can_credit(who, amount) {
                return Err(PeerlinkError::BalanceOverflow(*who));
            }
        }
        Ok(payout)
    }

    /// Settle a `JOINED` session: release its hold and credit both parties.
    ///
    /// Nothing moves unless every check in [`plan`](Self::plan) passes.
    ///
    /// # Errors
    /// Same as [`plan`](Self::plan).
    pub fn settle<A: AccountStore + ?Sized>(
        &mut self,
        accounts: &mut A,
        ledger: &mut EscrowLedger,
        session: &Session,
    ) -> Result<Payout> {
        let payout = self.plan(accounts, ledger, session)?;

        self.idempotency.mark_settled(payout.session_id)?;
        ledger.release(payout.session_id)?;
        accounts.credit(&payout.host_owner, payout.host_amount)?;
        accounts.credit(&payout.guest_owner, payout.guest_amount)?;
        self.supply.record_disbursed(payout.host_amount);
        self.supply.record_disbursed(payout.guest_amount);

        tracing::debug!(
            session = %payout.session_id,
            host = %payout.host_owner,
            host_amount = payout.host_amount,
            guest = %payout.guest_owner,
            guest_amount = payout.guest_amount,
            "Escrow disbursed"
        );
        Ok(payout)
    }

    /// Verify escrow conservation against the ledger.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` if funds were created or lost.
    pub fn verify_conservation(&self, ledger: &EscrowLedger) -> Result<()> {
        self.supply.verify(ledger.total_held())
    }

    #[must_use]
    pub fn idempotency(&self) -> &IdempotencyGuard {
        &self.idempotency
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }
}
