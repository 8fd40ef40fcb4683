//! # peerlink-settlement
//!
//! **Settlement**: disbursement of a session's escrow on close.
//!
//! ## Architecture
//!
//! When a session closes, the [`SettlementEngine`]:
//! 1. Validates idempotency (no double-settlement of a session)
//! 2. Cross-checks the ledger hold against the session record
//! 3. Computes the payout (full symmetric return)
//! 4. Releases the hold and credits both parties
//! 5. Records the disbursement for the conservation check
//!
//! All checks in steps 1–3 run before any balance moves.

pub mod idempotency;
pub mod settler;
pub mod supply_conservation;

pub use idempotency::IdempotencyGuard;
pub use settler::SettlementEngine;
pub use supply_conservation::SupplyConservation;
