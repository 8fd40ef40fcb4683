//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::{PeerlinkError, Result, constants};

/// Tunables for a Peerlink engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum device label length in bytes.
    pub max_label_len: usize,
    /// Reject a guest deposit that differs from the host deposit.
    pub require_matching_deposits: bool,
    /// Number of settled session IDs remembered by the settlement guard.
    pub settled_cache_size: usize,
    /// Re-check escrow conservation after every close.
    pub verify_conservation_on_close: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_label_len: constants::MAX_LABEL_LEN,
            require_matching_deposits: constants::DEFAULT_REQUIRE_MATCHING_DEPOSITS,
            settled_cache_size: constants::SETTLED_CACHE_SIZE,
            verify_conservation_on_close: constants::DEFAULT_VERIFY_CONSERVATION_ON_CLOSE,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` for bad values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `Configuration` if a bound is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_label_len == 0 {
            return Err(PeerlinkError::Configuration(
                "max_label_len must be > 0".into(),
            ));
        }
        if self.settled_cache_size == 0 {
            return Err(PeerlinkError::Configuration(
                "settled_cache_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}
