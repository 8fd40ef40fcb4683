//! System-wide constants for the Peerlink session escrow.

/// Maximum length of a device label in bytes.
pub const MAX_LABEL_LEN: usize = 64;

/// First identifier handed out by the device registry and the session table.
pub const FIRST_ID: u64 = 1;

/// Number of settled session IDs the settlement guard remembers.
pub const SETTLED_CACHE_SIZE: usize = 100_000;

/// Whether a guest must escrow exactly the host's deposit by default.
pub const DEFAULT_REQUIRE_MATCHING_DEPOSITS: bool = true;

/// Whether escrow conservation is re-verified after every close by default.
pub const DEFAULT_VERIFY_CONSERVATION_ON_CLOSE: bool = true;

/// Domain separator mixed into every receipt payload hash.
pub const RECEIPT_HASH_DOMAIN: &[u8] = b"peerlink:receipt:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Peerlink";
