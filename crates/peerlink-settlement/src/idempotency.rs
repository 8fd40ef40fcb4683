//! Settlement idempotency guard. Prevents double-settlement.
//!
//! Each session can be settled once. Attempting to settle the same
//! `SessionId` a second time returns [`PeerlinkError::SessionAlreadySettled`].
//! This backs up the terminal `CLOSED` state of the session record.
//!
//! The guard keeps a bounded FIFO of settled IDs so memory stays
//! predictable in long-running nodes.

use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;

use peerlink_types::{PeerlinkError, Result, SessionId};

/// Remembers recently settled sessions.
///
/// When the set reaches `max_size`, the oldest entry is evicted to make room.
#[derive(Debug)]
pub struct IdempotencyGuard {
    settled: HashSet<SessionId>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<SessionId>,
    max_size: usize,
}

impl IdempotencyGuard {
    /// Create a new guard remembering at most `max_size` sessions.
    #[must_use]
    pub fn new(max_size: NonZeroUsize) -> Self {
        let max_size = max_size.get();
        Self {
            settled: HashSet::with_capacity(max_size.min(1024)),
            order: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// # Errors
    /// Returns [`PeerlinkError::SessionAlreadySettled`] if `session_id` is
    /// still remembered as settled.
    pub fn check(&self, session_id: SessionId) -> Result<()> {
        if self.settled.contains(&session_id) {
            return Err(PeerlinkError::SessionAlreadySettled(session_id));
        }
        Ok(())
    }

    /// Mark a session as settled.
    ///
    /// # Errors
    /// Returns [`PeerlinkError::SessionAlreadySettled`] if `session_id` has
    /// already been marked.
    pub fn mark_settled(&mut self, session_id: SessionId) -> Result<()> {
        self.check(session_id)?;

        if self.settled.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.settled.remove(&oldest);
            }
        }

        self.settled.insert(session_id);
        self.order.push_back(session_id);
        Ok(())
    }

    pub fn is_settled(&self, session_id: &SessionId) -> bool {
        self.settled.contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.settled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn first_settle_ok() {
        let mut guard = IdempotencyGuard::new(cap(100));
        assert!(guard.mark_settled(SessionId(1)).is_ok());
        assert!(guard.is_settled(&SessionId(1)));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn double_settle_blocked() {
        let mut guard = IdempotencyGuard::new(cap(100));
        guard.mark_settled(SessionId(1)).unwrap();

        let err = guard.mark_settled(SessionId(1)).unwrap_err();
        assert!(
            matches!(err, PeerlinkError::SessionAlreadySettled(SessionId(1))),
            "Expected SessionAlreadySettled, got: {err:?}"
        );
        assert!(guard.check(SessionId(1)).is_err());
        assert!(guard.check(SessionId(2)).is_ok());
    }

    #[test]
    fn evicts_oldest() {
        let mut guard = IdempotencyGuard::new(cap(3));
        for id in 1..=4 {
            guard.mark_settled(SessionId(id)).unwrap();
        }
        assert_eq!(guard.len(), 3);
        assert!(
            !guard.is_settled(&SessionId(1)),
            "1 should have been evicted"
        );
        assert!(guard.is_settled(&SessionId(2)));
        assert!(guard.is_settled(&SessionId(4)));
    }

    #[test]
    fn empty_guard() {
        let guard = IdempotencyGuard::new(cap(10));
        assert!(guard.is_empty());
        assert!(!guard.is_settled(&SessionId(1)));
    }

    #[test]
    fn single_slot_guard_keeps_latest() {
        let mut guard = IdempotencyGuard::new(NonZeroUsize::MIN);
        guard.mark_settled(SessionId(1)).unwrap();
        guard.mark_settled(SessionId(2)).unwrap();
        assert_eq!(guard.len(), 1);
        assert!(guard.is_settled(&SessionId(2)));
        assert!(guard.check(SessionId(1)).is_ok());
    }
}
