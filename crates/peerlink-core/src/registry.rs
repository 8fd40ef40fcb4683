//! Device registry.
//!
//! Maps owners to their registered devices and hands out device IDs from a
//! counter stored alongside the records, so an ID and the record it names
//! are always created in the same step. IDs start at 1, strictly increase,
//! and are never reused.

use std::collections::{BTreeMap, HashMap};

use peerlink_types::{
    Device, DeviceId, DeviceLabel, PeerlinkError, Principal, Result, constants,
};

/// Registered devices, indexed by ID and by owner.
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, Device>,
    by_owner: HashMap<Principal, Vec<DeviceId>>,
    /// The ID the next registration receives.
    next_id: DeviceId,
    max_label_len: usize,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new(max_label_len: usize) -> Self {
        Self {
            devices: BTreeMap::new(),
            by_owner: HashMap::new(),
            next_id: DeviceId(constants::FIRST_ID),
            max_label_len,
        }
    }

    /// Register a device for `owner` and return its new ID.
    ///
    /// # Errors
    /// - `LabelTooLong` if the label exceeds the configured bound
    /// - `IdentifierExhausted` if the ID space is used up
    ///
    /// On error no ID is consumed.
    pub fn register(&mut self, owner: Principal, label: impl Into<Vec<u8>>) -> Result<DeviceId> {
        let label = DeviceLabel::new(label, self.max_label_len)?;
        let device_id = self.next_id;
        let following = device_id.next()?;

        self.devices.insert(
            device_id,
            Device {
                device_id,
                owner,
                label,
            },
        );
        self.by_owner.entry(owner).or_default().push(device_id);
        self.next_id = following;
        Ok(device_id)
    }

    /// # Errors
    /// Returns `DeviceNotFound` if no device has this ID.
    pub fn lookup(&self, device_id: DeviceId) -> Result<&Device> {
        self.devices
            .get(&device_id)
            .ok_or(PeerlinkError::DeviceNotFound(device_id))
    }

    /// Whether `device_id` is registered to `owner`.
    #[must_use]
    pub fn owns(&self, device_id: DeviceId, owner: &Principal) -> bool {
        self.devices
            .get(&device_id)
            .is_some_and(|d| d.is_owned_by(owner))
    }

    /// Look up a device and require that `owner` owns it.
    ///
    /// # Errors
    /// - `DeviceNotFound` if the device is not registered
    /// - `UnauthorizedDevice` if it belongs to someone else
    pub fn authorize(&self, device_id: DeviceId, owner: &Principal) -> Result<&Device> {
        let device = self.lookup(device_id)?;
        if !device.is_owned_by(owner) {
            return Err(PeerlinkError::UnauthorizedDevice {
                device: device_id,
                caller: *owner,
            });
        }
        Ok(device)
    }

    /// Devices registered by `owner`, in ascending ID order.
    #[must_use]
    pub fn devices_of(&self, owner: &Principal) -> Vec<DeviceId> {
        self.by_owner.get(owner).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
