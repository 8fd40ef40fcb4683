//! Registered devices.
//!
//! A device is created once on registration and is immutable afterwards.
//! Devices are never deleted, so sessions can reference them by ID without
//! dangling references.

use serde::{Deserialize, Serialize};

use crate::{DeviceId, PeerlinkError, Principal, Result};

/// Opaque display name for a device.
///
/// The content is never parsed or validated; only its length is bounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceLabel(Vec<u8>);

impl DeviceLabel {
    /// Wrap `bytes` as a label, rejecting anything longer than `max_len`.
    ///
    /// # Errors
    /// Returns `LabelTooLong` if `bytes.len() > max_len`.
    pub fn new(bytes: impl Into<Vec<u8>>, max_len: usize) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.len() > max_len {
            return Err(PeerlinkError::LabelTooLong {
                len: bytes.len(),
                max: max_len,
            });
        }
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossy UTF-8 rendering for logs and UIs.
    #[must_use]
    pub fn display_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

/// A registered network-capable device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Registry-assigned identifier.
    pub device_id: DeviceId,
    /// The principal that registered the device.
    pub owner: Principal,
    /// Display name.
    pub label: DeviceLabel,
}

impl Device {
    /// Whether `principal` owns this device.
    #[must_use]
    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        self.owner == *principal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_within_bound() {
        let label = DeviceLabel::new(b"Alice laptop".to_vec(), 64).unwrap();
        assert_eq!(label.len(), 12);
        assert_eq!(label.display_lossy(), "Alice laptop");
    }

    #[test]
    fn label_at_bound_is_accepted() {
        let label = DeviceLabel::new(vec![0xffu8; 8], 8).unwrap();
        assert_eq!(label.as_bytes(), &[0xff; 8]);
    }

    #[test]
    fn label_over_bound_is_rejected() {
        let err = DeviceLabel::new(vec![0u8; 9], 8).unwrap_err();
        assert!(matches!(err, PeerlinkError::LabelTooLong { len: 9, max: 8 }));
    }

    #[test]
    fn empty_label_is_accepted() {
        assert!(DeviceLabel::new(Vec::<u8>::new(), 8).unwrap().is_empty());
    }

    #[test]
    fn ownership_check() {
        let owner = Principal::random();
        let device = Device {
            device_id: DeviceId(1),
            owner,
            label: DeviceLabel::new(b"Bob phone".to_vec(), 64).unwrap(),
        };
        assert!(device.is_owned_by(&owner));
        assert!(!device.is_owned_by(&Principal::random()));
    }
}
