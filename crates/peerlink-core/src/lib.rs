//! # peerlink-core
//!
//! Session escrow for paid peer-to-peer networking.
//!
//! A device owner registers a device, opens a session by escrowing funds,
//! a second device joins by escrowing matching funds, and either party
//! closes the session, which returns each deposit to its owner.
//!
//! ## Architecture
//!
//! ```text
//! DeviceRegistry ──▶ SessionManager ──▶ EscrowLedger ──▶ SettlementEngine
//!   (ownership)       (OPEN→JOINED→CLOSED)  (holds)        (close only)
//! ```
//!
//! [`PeerlinkEngine`] owns all of it and is the only entry point an
//! execution environment needs. Every operation takes an authenticated
//! [`Caller`](peerlink_types::Caller), validates all preconditions, and
//! only then mutates state.

pub mod engine;
pub mod registry;
pub mod session_manager;

pub use engine::PeerlinkEngine;
pub use registry::DeviceRegistry;
pub use session_manager::SessionManager;
