//! External account balances.
//!
//! The execution environment owns the principals' spendable balances. The
//! escrow only needs three primitives from it, captured by [`AccountStore`].
//! All mutations are atomic: either the full operation succeeds or the
//! balance is unchanged.

use std::collections::HashMap;

use peerlink_types::{Amount, PeerlinkError, Principal, Result};

/// Balance primitives the escrow consumes from its environment.
pub trait AccountStore {
    /// Spendable balance of `principal` (zero if unknown).
    fn available(&self, principal: &Principal) -> Amount;

    /// Remove `amount` from `principal`'s balance.
    ///
    /// # Errors
    /// Returns `InsufficientFunds` if the balance is below `amount`.
    fn debit(&mut self, principal: &Principal, amount: Amount) -> Result<()>;

    /// Add `amount` to `principal`'s balance.
    ///
    /// # Errors
    /// Returns `BalanceOverflow` if the balance would exceed `Amount::MAX`.
    fn credit(&mut self, principal: &Principal, amount: Amount) -> Result<()>;

    /// Whether a debit of `amount` would succeed.
    fn can_debit(&self, principal: &Principal, amount: Amount) -> bool {
        self.available(principal) >= amount
    }

    /// Whether a credit of `amount` would succeed.
    fn can_credit(&self, principal: &Principal, amount: Amount) -> bool {
        self.available(principal).checked_add(amount).is_some()
    }
}

/// In-memory [`AccountStore`] keyed by principal.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccounts {
    balances: HashMap<Principal, Amount>,
}

impl InMemoryAccounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fund a principal from outside the system (faucet, bridge, genesis).
    ///
    /// # Errors
    /// Returns `BalanceOverflow` if the balance would exceed `Amount::MAX`.
    pub fn fund(&mut self, principal: Principal, amount: Amount) -> Result<()> {
        self.credit(&principal, amount)
    }

    /// Total funds held across all principals.
    #[must_use]
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|&b| u128::from(b)).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl AccountStore for InMemoryAccounts {
    fn available(&self, principal: &Principal) -> Amount {
        self.balances.get(principal).copied().unwrap_or(0)
    }

    fn debit(&mut self, principal: &Principal, amount: Amount) -> Result<()> {
        let available = self.available(principal);
        let remaining = available
            .checked_sub(amount)
            .ok_or(PeerlinkError::InsufficientFunds {
                needed: amount,
                available,
            })?;
        self.balances.insert(*principal, remaining);
        Ok(())
    }

    fn credit(&mut self, principal: &Principal, amount: Amount) -> Result<()> {
        let entry = self.balances.entry(*principal).or_default();
        *entry = entry
            .checked_add(amount)
            .ok_or(PeerlinkError::BalanceOverflow(*principal))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fund_increases_available() {
        let mut accounts = InMemoryAccounts::new();
        let alice = Principal::random();
        accounts.fund(alice, 1_000).unwrap();
        assert_eq!(accounts.available(&alice), 1_000);
    }

    #[test]
    fn debit_reduces_available() {
        let mut accounts = InMemoryAccounts::new();
        let alice = Principal::random();
        accounts.fund(alice, 1_000).unwrap();
        accounts.debit(&alice, 400).unwrap();
        assert_eq!(accounts.available(&alice), 600);
    }

    #[test]
    fn debit_insufficient_fails_and_leaves_balance() {
        let mut accounts = InMemoryAccounts::new();
        let alice = Principal::random();
        accounts.fund(alice, 100).unwrap();
        let err = accounts.debit(&alice, 200).unwrap_err();
        assert!(matches!(
            err,
            PeerlinkError::InsufficientFunds {
                needed: 200,
                available: 100
            }
        ));
        assert_eq!(accounts.available(&alice), 100);
    }

    #[test]
    fn debit_unknown_principal_fails() {
        let mut accounts = InMemoryAccounts::new();
        let err = accounts.debit(&Principal::random(), 1).unwrap_err();
        assert!(matches!(err, PeerlinkError::InsufficientFunds { .. }));
        assert!(accounts.is_empty());
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let mut accounts = InMemoryAccounts::new();
        let alice = Principal::random();
        accounts.fund(alice, Amount::MAX).unwrap();
        assert!(!accounts.can_credit(&alice, 1));
        let err = accounts.credit(&alice, 1).unwrap_err();
        assert!(matches!(err, PeerlinkError::BalanceOverflow(p) if p == alice));
        assert_eq!(accounts.available(&alice), Amount::MAX);
    }

    #[test]
    fn can_debit_matches_debit() {
        let mut accounts = InMemoryAccounts::new();
        let alice = Principal::random();
        accounts.fund(alice, 50).unwrap();
        assert!(accounts.can_debit(&alice, 50));
        assert!(!accounts.can_debit(&alice, 51));
    }

    #[test]
    fn total_supply_sums_all_principals() {
        let mut accounts = InMemoryAccounts::new();
        accounts.fund(Principal::random(), Amount::MAX).unwrap();
        accounts.fund(Principal::random(), 5).unwrap();
        assert_eq!(accounts.total_supply(), u128::from(Amount::MAX) + 5);
        assert_eq!(accounts.len(), 2);
    }
}
