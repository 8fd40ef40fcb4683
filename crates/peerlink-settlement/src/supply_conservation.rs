//! Escrow conservation invariant checker.
//!
//! Invariant enforced after every close:
//! ```text
//! Σ held(escrow ledger) == Σ escrowed − Σ disbursed
//! ```
//!
//! `escrowed` counts every successful deposit (host or guest) and
//! `disbursed` every amount credited back on close. If the invariant breaks,
//! funds were created or destroyed somewhere and the caller must halt.

use peerlink_types::{Amount, PeerlinkError, Result};

/// Running totals of funds entering and leaving escrow.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    escrowed: u128,
    disbursed: u128,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a deposit entering escrow.
    pub fn record_escrowed(&mut self, amount: Amount) {
        self.escrowed += u128::from(amount);
    }

    /// Record an amount credited out of escrow.
    pub fn record_disbursed(&mut self, amount: Amount) {
        self.disbursed += u128::from(amount);
    }

    /// What the escrow ledger should currently hold.
    ///
    /// Saturates at zero; a negative expectation is itself reported by
    /// [`verify`](Self::verify).
    #[must_use]
    pub fn expected_held(&self) -> u128 {
        self.escrowed.saturating_sub(self.disbursed)
    }

    /// Verify that the ledger's actual total matches the expectation.
    ///
    /// # Errors
    /// Returns [`PeerlinkError::SupplyInvariantViolation`] if they differ or
    /// more was disbursed than ever escrowed.
    pub fn verify(&self, actual_held: u128) -> Result<()> {
        if self.disbursed > self.escrowed || actual_held != self.expected_held() {
            return Err(PeerlinkError::SupplyInvariantViolation {
                reason: format!(
                    "actual held {actual_held} != expected {} \
                     (escrowed={}, disbursed={})",
                    self.expected_held(),
                    self.escrowed,
                    self.disbursed,
                ),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn total_escrowed(&self) -> u128 {
        self.escrowed
    }

    #[must_use]
    pub fn total_disbursed(&self) -> u128 {
        self.disbursed
    }
}
