//! Session manager — the `OPEN → JOINED → CLOSED` state machine.
//!
//! The manager is the only mutator of session records and the only caller
//! of the escrow ledger and settlement engine. Every transition follows the
//! same shape:
//!
//! 1. evaluate every precondition against immutable state
//! 2. apply the ledger movement, then the record update
//!
//! Step 2 only runs after step 1 passed, so a rejected call leaves
//! sessions, escrow and balances untouched.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use peerlink_ledger::{AccountStore, EscrowHold, EscrowLedger};
use peerlink_settlement::SettlementEngine;
use peerlink_types::{
    Amount, Caller, DeviceId, EscrowRole, PeerlinkError, Payout, Principal, Result, Session,
    SessionId, SessionState, constants,
};

use crate::registry::DeviceRegistry;

/// Owns all session records, their escrow, and their settlement.
#[derive(Debug)]
pub struct SessionManager {
    sessions: BTreeMap<SessionId, Session>,
    /// The ID the next session receives.
    next_id: SessionId,
    ledger: EscrowLedger,
    settlement: SettlementEngine,
    require_matching_deposits: bool,
}

impl SessionManager {
    #[must_use]
    pub fn new(require_matching_deposits: bool, settled_cache_size: NonZeroUsize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: SessionId(constants::FIRST_ID),
            ledger: EscrowLedger::new(),
            settlement: SettlementEngine::new(settled_cache_size),
            require_matching_deposits,
        }
    }

    /// Open a session on `host_device_id`, escrowing `deposit` from the caller.
    ///
    /// # Errors
    /// - `DeviceNotFound` / `UnauthorizedDevice` if the caller doesn't own the device
    /// - `InvalidAmount` if `deposit` is zero
    /// - `InsufficientFunds` if the caller cannot cover `deposit`
    /// - `IdentifierExhausted` if the session ID space is used up
    pub fn create_session<A: AccountStore + ?Sized>(
        &mut self,
        registry: &DeviceRegistry,
        accounts: &mut A,
        caller: &Caller,
        host_device_id: DeviceId,
        deposit: Amount,
    ) -> Result<SessionId> {
        let host = caller.principal();
        registry.authorize(host_device_id, &host)?;

        let session_id = self.next_id;
        self.ledger
            .check_hold(accounts, session_id, EscrowRole::Host, &host, deposit)?;
        let following = session_id.next()?;

        self.ledger
            .hold(accounts, session_id, EscrowRole::Host, &host, deposit)?;
        self.settlement.record_escrowed(deposit);
        self.sessions.insert(
            session_id,
            Session::open(session_id, host_device_id, host, deposit),
        );
        self.next_id = following;
        Ok(session_id)
    }

    /// Join an `OPEN` session with `guest_device_id`, escrowing `deposit`.
    ///
    /// # Errors
    /// - `InvalidSessionState` if the session is not `OPEN`, including IDs
    ///   no `create_session` has handed out yet
    /// - `SessionNotFound` for any other unknown ID
    /// - `DeviceNotFound` / `UnauthorizedDevice` if the caller doesn't own the device
    /// - `SelfJoin` if the caller hosts the session
    /// - `InvalidAmount` if `deposit` is zero, or differs from the host's
    ///   deposit while matching deposits are required
    /// - `InsufficientFunds` if the caller cannot cover `deposit`
    pub fn join_and_deposit<A: AccountStore + ?Sized>(
        &mut self,
        registry: &DeviceRegistry,
        accounts: &mut A,
        caller: &Caller,
        session_id: SessionId,
        guest_device_id: DeviceId,
        deposit: Amount,
    ) -> Result<()> {
        let guest = caller.principal();
        if session_id >= self.next_id {
            return Err(PeerlinkError::InvalidSessionState {
                session: session_id,
                expected: SessionState::Open,
                actual: None,
            });
        }
        let session = self.session(session_id)?;
        Self::expect_state(session, SessionState::Open)?;
        registry.authorize(guest_device_id, &guest)?;

        if session.host_owner == guest {
            return Err(PeerlinkError::SelfJoin(session_id));
        }
        if self.require_matching_deposits && deposit != session.host_deposit {
            return Err(PeerlinkError::InvalidAmount {
                reason: format!(
                    "guest deposit {deposit} must match host deposit {}",
                    session.host_deposit
                ),
            });
        }
        self.ledger
            .check_hold(accounts, session_id, EscrowRole::Guest, &guest, deposit)?;

        self.ledger
            .hold(accounts, session_id, EscrowRole::Guest, &guest, deposit)?;
        self.settlement.record_escrowed(deposit);
        let session = self.session_mut(session_id)?;
        session.guest_device_id = Some(guest_device_id);
        session.guest_owner = Some(guest);
        session.guest_deposit = deposit;
        session.state = SessionState::Joined;
        Ok(())
    }

    /// Close a `JOINED` session and return both deposits to their owners.
    ///
    /// `counterparty` must name the other participant.
    ///
    /// # Errors
    /// - `SessionNotFound` if the session doesn't exist
    /// - `InvalidSessionState` if it is not `JOINED`
    /// - `Unauthorized` if the caller is neither host nor guest
    /// - `CounterpartyMismatch` if `counterparty` is not the other participant
    pub fn close_session<A: AccountStore + ?Sized>(
        &mut self,
        accounts: &mut A,
        caller: &Caller,
        session_id: SessionId,
        counterparty: &Principal,
    ) -> Result<Payout> {
        let principal = caller.principal();
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(PeerlinkError::SessionNotFound(session_id))?;
        Self::expect_state(session, SessionState::Joined)?;

        let role = session
            .participant_role(&principal)
            .ok_or(PeerlinkError::Unauthorized {
                session: session_id,
                caller: principal,
            })?;
        if session.owner_of(role.opposite()).as_ref() != Some(counterparty) {
            return Err(PeerlinkError::CounterpartyMismatch {
                session: session_id,
                named: *counterparty,
            });
        }

        let payout = self
            .settlement
            .settle(accounts, &mut self.ledger, session)?;

        let session = self.session_mut(session_id)?;
        session.state = SessionState::Closed;
        session.host_deposit = 0;
        session.guest_deposit = 0;
        Ok(payout)
    }

    fn expect_state(session: &Session, expected: SessionState) -> Result<()> {
        if session.state != expected {
            return Err(PeerlinkError::InvalidSessionState {
                session: session.session_id,
                expected,
                actual: Some(session.state),
            });
        }
        Ok(())
    }

    fn session_mut(&mut self, session_id: SessionId) -> Result<&mut Session> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(PeerlinkError::SessionNotFound(session_id))
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// # Errors
    /// Returns `SessionNotFound` if no session has this ID.
    pub fn session(&self, session_id: SessionId) -> Result<&Session> {
        self.sessions
            .get(&session_id)
            .ok_or(PeerlinkError::SessionNotFound(session_id))
    }

    /// Sessions where `principal` is host or guest, in ID order.
    pub fn sessions_of<'a>(
        &'a self,
        principal: &Principal,
    ) -> impl Iterator<Item = &'a Session> + use<'a> {
        let principal = *principal;
        self.sessions
            .values()
            .filter(move |s| s.involves(&principal))
    }

    /// Escrow currently held for `session_id` (zero once closed).
    #[must_use]
    pub fn escrow_held(&self, session_id: SessionId) -> EscrowHold {
        self.ledger.held(session_id)
    }

    #[must_use]
    pub fn total_escrow_held(&self) -> u128 {
        self.ledger.total_held()
    }

    /// # Errors
    /// Returns `SupplyInvariantViolation` if escrow was created or lost.
    pub fn verify_conservation(&self) -> Result<()> {
        self.settlement.verify_conservation(&self.ledger)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerlink_ledger::InMemoryAccounts;

    const DEPOSIT: Amount = 1_000_000;
    const CACHE: NonZeroUsize = NonZeroUsize::new(1_000).unwrap();

    struct Fixture {
        registry: DeviceRegistry,
        accounts: InMemoryAccounts,
        manager: SessionManager,
        host: Caller,
        guest: Caller,
        host_device: DeviceId,
        guest_device: DeviceId,
    }

    fn setup() -> Fixture {
        let mut registry = DeviceRegistry::new(64);
        let mut accounts = InMemoryAccounts::new();
        let host = Principal::random();
        let guest = Principal::random();
        let host_device = registry.register(host, b"host".to_vec()).unwrap();
        let guest_device = registry.register(guest, b"guest".to_vec()).unwrap();
        accounts.fund(host, 10 * DEPOSIT).unwrap();
        accounts.fund(guest, 10 * DEPOSIT).unwrap();
        Fixture {
            registry,
            accounts,
            manager: SessionManager::new(true, CACHE),
            host: Caller::authenticated(host),
            guest: Caller::authenticated(guest),
            host_device,
            guest_device,
        }
    }

    fn open(f: &mut Fixture) -> SessionId {
        f.manager
            .create_session(
                &f.registry,
                &mut f.accounts,
                &f.host,
                f.host_device,
                DEPOSIT,
            )
            .unwrap()
    }

    fn join(f: &mut Fixture, session_id: SessionId) -> Result<()> {
        f.manager.join_and_deposit(
            &f.registry,
            &mut f.accounts,
            &f.guest,
            session_id,
            f.guest_device,
            DEPOSIT,
        )
    }

    #[test]
    fn create_opens_and_escrows() {
        let mut f = setup();
        let id = open(&mut f);
        assert_eq!(id, SessionId(1));

        let session = f.manager.session(id).unwrap();
        assert_eq!(session.state, SessionState::Open);
        assert_eq!(session.host_deposit, DEPOSIT);
        assert_eq!(f.accounts.available(&f.host.principal()), 9 * DEPOSIT);
        assert_eq!(f.manager.escrow_held(id).host, DEPOSIT);
    }

    #[test]
    fn create_with_foreign_device_rejected() {
        let mut f = setup();
        let err = f
            .manager
            .create_session(
                &f.registry,
                &mut f.accounts,
                &f.host,
                f.guest_device,
                DEPOSIT,
            )
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::UnauthorizedDevice { .. }));
        assert!(f.manager.is_empty());
    }

    #[test]
    fn create_with_zero_deposit_rejected() {
        let mut f = setup();
        let err = f
            .manager
            .create_session(&f.registry, &mut f.accounts, &f.host, f.host_device, 0)
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::InvalidAmount { .. }));
    }

    #[test]
    fn create_without_funds_rejected_and_no_id_consumed() {
        let mut f = setup();
        let err = f
            .manager
            .create_session(
                &f.registry,
                &mut f.accounts,
                &f.host,
                f.host_device,
                11 * DEPOSIT,
            )
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::InsufficientFunds { .. }));
        assert_eq!(open(&mut f), SessionId(1));
    }

    #[test]
    fn join_moves_to_joined() {
        let mut f = setup();
        let id = open(&mut f);
        join(&mut f, id).unwrap();

        let session = f.manager.session(id).unwrap();
        assert_eq!(session.state, SessionState::Joined);
        assert_eq!(session.guest_device_id, Some(f.guest_device));
        assert_eq!(session.guest_owner, Some(f.guest.principal()));
        assert_eq!(f.manager.escrow_held(id).total(), 2 * u128::from(DEPOSIT));
    }

    #[test]
    fn second_join_rejected() {
        let mut f = setup();
        let id = open(&mut f);
        join(&mut f, id).unwrap();
        let err = join(&mut f, id).unwrap_err();
        assert!(matches!(
            err,
            PeerlinkError::InvalidSessionState {
                expected: SessionState::Open,
                actual: Some(SessionState::Joined),
                ..
            }
        ));
    }

    #[test]
    fn host_cannot_join_own_session() {
        let mut f = setup();
        let id = open(&mut f);
        let err = f
            .manager
            .join_and_deposit(
                &f.registry,
                &mut f.accounts,
                &f.host,
                id,
                f.host_device,
                DEPOSIT,
            )
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::SelfJoin(_)));
    }

    #[test]
    fn mismatched_guest_deposit_rejected() {
        let mut f = setup();
        let id = open(&mut f);
        let err = f
            .manager
            .join_and_deposit(
                &f.registry,
                &mut f.accounts,
                &f.guest,
                id,
                f.guest_device,
                DEPOSIT - 1,
            )
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::InvalidAmount { .. }));
        assert_eq!(f.accounts.available(&f.guest.principal()), 10 * DEPOSIT);
    }

    #[test]
    fn unmatched_deposits_allowed_when_configured() {
        let mut f = setup();
        f.manager = SessionManager::new(false, CACHE);
        let id = open(&mut f);
        f.manager
            .join_and_deposit(
                &f.registry,
                &mut f.accounts,
                &f.guest,
                id,
                f.guest_device,
                DEPOSIT / 2,
            )
            .unwrap();
        assert_eq!(f.manager.session(id).unwrap().guest_deposit, DEPOSIT / 2);
    }

    #[test]
    fn close_settles_and_zeroes() {
        let mut f = setup();
        let id = open(&mut f);
        join(&mut f, id).unwrap();
        let guest = f.guest.principal();
        let payout = f
            .manager
            .close_session(&mut f.accounts, &f.host, id, &guest)
            .unwrap();

        assert_eq!(payout.total(), 2 * DEPOSIT);
        let session = f.manager.session(id).unwrap();
        assert_eq!(session.state, SessionState::Closed);
        assert_eq!(session.total_escrow(), 0);
        assert_eq!(f.manager.total_escrow_held(), 0);
        assert_eq!(f.accounts.available(&guest), 10 * DEPOSIT);
        f.manager.verify_conservation().unwrap();
    }

    #[test]
    fn guest_may_close() {
        let mut f = setup();
        let id = open(&mut f);
        join(&mut f, id).unwrap();
        let host = f.host.principal();
        f.manager
            .close_session(&mut f.accounts, &f.guest, id, &host)
            .unwrap();
        assert_eq!(f.manager.session(id).unwrap().state, SessionState::Closed);
    }

    #[test]
    fn close_with_wrong_counterparty_rejected() {
        let mut f = setup();
        let id = open(&mut f);
        join(&mut f, id).unwrap();
        let stranger = Principal::random();
        let err = f
            .manager
            .close_session(&mut f.accounts, &f.host, id, &stranger)
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::CounterpartyMismatch { .. }));

        // Naming yourself is also a mismatch.
        let host = f.host.principal();
        let err = f
            .manager
            .close_session(&mut f.accounts, &f.host, id, &host)
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::CounterpartyMismatch { .. }));
        assert_eq!(f.manager.session(id).unwrap().state, SessionState::Joined);
    }

    #[test]
    fn close_twice_rejected() {
        let mut f = setup();
        let id = open(&mut f);
        join(&mut f, id).unwrap();
        let guest = f.guest.principal();
        f.manager
            .close_session(&mut f.accounts, &f.host, id, &guest)
            .unwrap();
        let err = f
            .manager
            .close_session(&mut f.accounts, &f.host, id, &guest)
            .unwrap_err();
        assert!(matches!(
            err,
            PeerlinkError::InvalidSessionState {
                actual: Some(SessionState::Closed),
                ..
            }
        ));
        assert_eq!(f.accounts.available(&guest), 10 * DEPOSIT);
    }

    #[test]
    fn join_before_create_is_invalid_state() {
        let mut f = setup();
        let err = join(&mut f, SessionId(1)).unwrap_err();
        assert!(matches!(
            err,
            PeerlinkError::InvalidSessionState {
                session: SessionId(1),
                expected: SessionState::Open,
                actual: None,
            }
        ));

        // Still true for IDs beyond the last one handed out.
        open(&mut f);
        let err = join(&mut f, SessionId(42)).unwrap_err();
        assert!(matches!(
            err,
            PeerlinkError::InvalidSessionState { actual: None, .. }
        ));
        assert_eq!(f.accounts.available(&f.guest.principal()), 10 * DEPOSIT);
    }

    #[test]
    fn unknown_session_not_found() {
        let mut f = setup();
        let err = join(&mut f, SessionId(0)).unwrap_err();
        assert!(matches!(err, PeerlinkError::SessionNotFound(SessionId(0))));

        let host = f.host.principal();
        let err = f
            .manager
            .close_session(&mut f.accounts, &f.guest, SessionId(42), &host)
            .unwrap_err();
        assert!(matches!(err, PeerlinkError::SessionNotFound(SessionId(42))));
    }

    #[test]
    fn smallest_settled_cache_is_accepted() {
        let mut f = setup();
        f.manager = SessionManager::new(true, NonZeroUsize::MIN);
        let first = open(&mut f);
        join(&mut f, first).unwrap();
        let guest = f.guest.principal();
        f.manager
            .close_session(&mut f.accounts, &f.host, first, &guest)
            .unwrap();
        let second = open(&mut f);
        join(&mut f, second).unwrap();
        f.manager
            .close_session(&mut f.accounts, &f.host, second, &guest)
            .unwrap();
        f.manager.verify_conservation().unwrap();
    }

    #[test]
    fn sessions_of_lists_both_sides() {
        let mut f = setup();
        let a = open(&mut f);
        let b = open(&mut f);
        join(&mut f, b).unwrap();
        let guest = f.guest.principal();
        let host = f.host.principal();

        let hosted: Vec<_> = f.manager.sessions_of(&host).map(|s| s.session_id).collect();
        assert_eq!(hosted, vec![a, b]);
        let joined: Vec<_> = f.manager.sessions_of(&guest).map(|s| s.session_id).collect();
        assert_eq!(joined, vec![b]);
    }
}
