//! # peerlink-ledger
//!
//! Funds plumbing for Peerlink sessions.
//!
//! ## Architecture
//!
//! 1. **AccountStore**: the external balance store supplied by the execution
//!    environment (`available`, `debit`, `credit`). [`InMemoryAccounts`] is
//!    the reference implementation used by tests and embedders.
//! 2. **EscrowLedger**: per-(session, role) held amounts. Funds enter it only
//!    through [`EscrowLedger::hold`], which debits the depositor in the same
//!    step, and leave it only through [`EscrowLedger::release`].
//!
//! ## Funds Flow
//!
//! ```text
//! AccountStore.debit() → EscrowLedger.hold()      (create / join)
//! EscrowLedger.release() → AccountStore.credit()  (close, via settlement)
//! ```

pub mod accounts;
pub mod escrow;

pub use accounts::{AccountStore, InMemoryAccounts};
pub use escrow::{EscrowHold, EscrowLedger};
