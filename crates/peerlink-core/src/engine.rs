//! The Peerlink engine: the complete escrow state and its public surface.
//!
//! [`PeerlinkEngine`] owns the device registry, the session manager (with
//! its escrow ledger and settlement), the account store, and the receipt
//! log. It is the deterministic state-transition function the execution
//! environment drives: one `&mut self` call per transaction, in the order
//! the environment chose.

use std::num::NonZeroUsize;

use peerlink_ledger::{AccountStore, EscrowHold, InMemoryAccounts};
use peerlink_types::{
    Amount, Caller, Device, DeviceId, EngineConfig, Payout, PeerlinkError, Principal, Receipt,
    ReceiptType, Result, Session, SessionId,
};
use serde::Serialize;

use crate::registry::DeviceRegistry;
use crate::session_manager::SessionManager;

/// Device registry, session state machine, escrow and balances in one place.
pub struct PeerlinkEngine<A: AccountStore = InMemoryAccounts> {
    config: EngineConfig,
    registry: DeviceRegistry,
    sessions: SessionManager,
    accounts: A,
    receipts: Vec<Receipt>,
}

impl<A: AccountStore> PeerlinkEngine<A> {
    /// # Errors
    /// Returns `Configuration` if `config` fails validation.
    pub fn new(config: EngineConfig, accounts: A) -> Result<Self> {
        config.validate()?;
        let settled_cache = NonZeroUsize::new(config.settled_cache_size).ok_or_else(|| {
            PeerlinkError::Configuration("settled_cache_size must be > 0".to_string())
        })?;
        tracing::info!(
            max_label_len = config.max_label_len,
            matching_deposits = config.require_matching_deposits,
            "Peerlink engine initialised"
        );
        Ok(Self::assemble(config, accounts, settled_cache))
    }

    fn assemble(config: EngineConfig, accounts: A, settled_cache: NonZeroUsize) -> Self {
        Self {
            registry: DeviceRegistry::new(config.max_label_len),
            sessions: SessionManager::new(config.require_matching_deposits, settled_cache),
            config,
            accounts,
            receipts: Vec::new(),
        }
    }

    // =================================================================
    // Transitions
    // =================================================================

    /// Register a device owned by the caller.
    pub fn register_device(
        &mut self,
        caller: &Caller,
        label: impl Into<Vec<u8>>,
    ) -> Result<DeviceId> {
        let device_id = self
            .registry
            .register(caller.principal(), label)
            .inspect_err(|err| reject("register_device", caller, err))?;

        tracing::info!(device = %device_id, owner = %caller, "Device registered");
        if let Ok(device) = self.registry.lookup(device_id) {
            let device = device.clone();
            self.record(
                ReceiptType::DeviceRegistered,
                caller,
                None,
                Some(device_id),
                &device,
            );
        }
        Ok(device_id)
    }

    /// Open a session on the caller's device, escrowing `deposit`.
    pub fn create_session(
        &mut self,
        caller: &Caller,
        host_device_id: DeviceId,
        deposit: Amount,
    ) -> Result<SessionId> {
        let session_id = self
            .sessions
            .create_session(
                &self.registry,
                &mut self.accounts,
                caller,
                host_device_id,
                deposit,
            )
            .inspect_err(|err| reject("create_session", caller, err))?;

        tracing::info!(
            session = %session_id,
            host = %caller,
            device = %host_device_id,
            deposit,
            "Session opened"
        );
        self.record_session(
            ReceiptType::SessionOpened,
            caller,
            session_id,
            Some(host_device_id),
        );
        Ok(session_id)
    }

    /// Join an open session with the caller's device, escrowing `deposit`.
    pub fn join_and_deposit(
        &mut self,
        caller: &Caller,
        session_id: SessionId,
        guest_device_id: DeviceId,
        deposit: Amount,
    ) -> Result<()> {
        self.sessions
            .join_and_deposit(
                &self.registry,
                &mut self.accounts,
                caller,
                session_id,
                guest_device_id,
                deposit,
            )
            .inspect_err(|err| reject("join_and_deposit", caller, err))?;

        tracing::info!(
            session = %session_id,
            guest = %caller,
            device = %guest_device_id,
            deposit,
            "Session joined"
        );
        self.record_session(
            ReceiptType::SessionJoined,
            caller,
            session_id,
            Some(guest_device_id),
        );
        Ok(())
    }

    /// Close a joined session, returning each party's deposit.
    pub fn close_session(
        &mut self,
        caller: &Caller,
        session_id: SessionId,
        counterparty: &Principal,
    ) -> Result<Payout> {
        let payout = self
            .sessions
            .close_session(&mut self.accounts, caller, session_id, counterparty)
            .inspect_err(|err| reject("close_session", caller, err))?;

        tracing::info!(
            session = %session_id,
            closed_by = %caller,
            host_amount = payout.host_amount,
            guest_amount = payout.guest_amount,
            "Session closed"
        );
        if self.config.verify_conservation_on_close {
            if let Err(err) = self.sessions.verify_conservation() {
                tracing::error!(code = err.code(), %err, "Escrow conservation violated");
            }
        }
        self.record_session(ReceiptType::SessionClosed, caller, session_id, None);
        Ok(payout)
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Look up a registered device.
    pub fn device(&self, device_id: DeviceId) -> Result<&Device> {
        self.registry.lookup(device_id)
    }

    #[must_use]
    pub fn owns(&self, device_id: DeviceId, owner: &Principal) -> bool {
        self.registry.owns(device_id, owner)
    }

    #[must_use]
    pub fn devices_of(&self, owner: &Principal) -> Vec<DeviceId> {
        self.registry.devices_of(owner)
    }

    pub fn session(&self, session_id: SessionId) -> Result<&Session> {
        self.sessions.session(session_id)
    }

    #[must_use]
    pub fn sessions_of(&self, principal: &Principal) -> Vec<&Session> {
        self.sessions.sessions_of(principal).collect()
    }

    #[must_use]
    pub fn escrow_held(&self, session_id: SessionId) -> EscrowHold {
        self.sessions.escrow_held(session_id)
    }

    #[must_use]
    pub fn total_escrow_held(&self) -> u128 {
        self.sessions.total_escrow_held()
    }

    /// Check that escrow holds exactly what was deposited minus what was
    /// disbursed.
    pub fn verify_conservation(&self) -> Result<()> {
        self.sessions.verify_conservation()
    }

    /// Receipts not yet drained, oldest first.
    #[must_use]
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Hand the pending receipts to the environment for persistence.
    ///
    /// The engine keeps every receipt until drained; environments that
    /// persist the audit trail should call this after each commit.
    pub fn drain_receipts(&mut self) -> Vec<Receipt> {
        std::mem::take(&mut self.receipts)
    }

    #[must_use]
    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    /// Mutable access for the environment's own funding and withdrawals.
    pub fn accounts_mut(&mut self) -> &mut A {
        &mut self.accounts
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =================================================================
    // Receipts
    // =================================================================

    fn record_session(
        &mut self,
        receipt_type: ReceiptType,
        caller: &Caller,
        session_id: SessionId,
        device_id: Option<DeviceId>,
    ) {
        if let Ok(session) = self.sessions.session(session_id) {
            let session = session.clone();
            self.record(receipt_type, caller, Some(session_id), device_id, &session);
        }
    }

    /// Append a receipt. The transition has already committed, so a failure
    /// to encode is logged rather than returned.
    fn record<T: Serialize>(
        &mut self,
        receipt_type: ReceiptType,
        caller: &Caller,
        session_id: Option<SessionId>,
        device_id: Option<DeviceId>,
        record: &T,
    ) {
        match Receipt::issue(
            receipt_type,
            caller.principal(),
            session_id,
            device_id,
            record,
        ) {
            Ok(receipt) => self.receipts.push(receipt),
            Err(err) => {
                tracing::error!(%receipt_type, code = err.code(), %err, "Receipt not issued");
            }
        }
    }
}

impl Default for PeerlinkEngine<InMemoryAccounts> {
    fn default() -> Self {
        let config = EngineConfig::default();
        let settled_cache =
            NonZeroUsize::new(config.settled_cache_size).unwrap_or(NonZeroUsize::MIN);
        Self::assemble(config, InMemoryAccounts::new(), settled_cache)
    }
}

fn reject(operation: &'static str, caller: &Caller, err: &PeerlinkError) {
    tracing::warn!(operation, caller = %caller, code = err.code(), %err, "Transition rejected");
}
