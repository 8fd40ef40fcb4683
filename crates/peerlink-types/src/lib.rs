//! # peerlink-types
//!
//! Shared types, errors, and configuration for the **Peerlink** session escrow.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`DeviceId`], [`SessionId`], [`Principal`], [`Caller`], [`ReceiptId`]
//! - **Device model**: [`Device`], [`DeviceLabel`]
//! - **Session model**: [`Session`], [`SessionState`], [`EscrowRole`], [`Payout`]
//! - **Receipt model**: [`Receipt`], [`ReceiptType`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`PeerlinkError`] with `PL_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod ids;
pub mod receipt;
pub mod session;

// Re-export all primary types at crate root for ergonomic imports:
//   use peerlink_types::{Device, Session, SessionState, ...};

pub use config::*;
pub use device::*;
pub use error::*;
pub use ids::*;
pub use receipt::*;
pub use session::*;

// Constants are accessed via `peerlink_types::constants::FOO`
// (not re-exported to avoid name collisions).

/// Amount of funds in the smallest indivisible unit of the settlement asset.
pub type Amount = u64;
