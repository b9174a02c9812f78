use std::collections::HashMap;
use std::sync::Arc;

use super::device::Device;

/// The set of units a server answers for. Built once from configuration
/// (`unit_ids`) and shared read-only across every connection task — each
/// `Device` inside still serializes its own writes. Cloning copies the
/// map of `Arc<Device>` handles, not the devices themselves.
#[derive(Default, Clone)]
pub struct Devices {
    by_unit_id: HashMap<u8, Arc<Device>>,
}

impl Devices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_unit_ids(unit_ids: impl IntoIterator<Item = u8>) -> Self {
        let mut devices = Self::new();
        for unit_id in unit_ids {
            devices.insert(Arc::new(Device::new(unit_id)));
        }
        devices
    }

    pub fn insert(&mut self, device: Arc<Device>) {
        self.by_unit_id.insert(device.unit_id(), device);
    }

    pub fn get(&self, unit_id: u8) -> Option<&Arc<Device>> {
        self.by_unit_id.get(&unit_id)
    }

    pub fn contains(&self, unit_id: u8) -> bool {
        self.by_unit_id.contains_key(&unit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_configured_unit_ids() {
        let devices = Devices::from_unit_ids([1, 2, 5]);
        assert!(devices.contains(1));
        assert!(devices.contains(5));
        assert!(!devices.contains(3));
    }
}
