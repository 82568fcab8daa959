//! Device registry
//!
//! Tracks the keyboards the service reports, keyed by serial, along with the
//! currently selected device. Each serial maps to exactly one [`Device`]
//! handle for the life of the registry; fresh information from the service
//! replaces the handle's contents in place so every clone sees it.
//!
//! Listeners are called after the registry lock is released, so a listener
//! may query the registry or add and remove listeners.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{IpcError, IpcResult};
use crate::protocol::DeviceInfo;

/// Shared handle to one known keyboard
#[derive(Clone)]
pub struct Device {
    serial: Arc<str>,
    info: Arc<RwLock<DeviceInfo>>,
}

impl Device {
    fn new(info: DeviceInfo) -> Self {
        Self {
            serial: Arc::from(info.serial()),
            info: Arc::new(RwLock::new(info)),
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Snapshot of the latest reported information
    pub fn info(&self) -> DeviceInfo {
        self.info.read().clone()
    }

    /// Product name as reported by the device
    pub fn product_name(&self) -> String {
        self.info.read().product.product.clone()
    }

    /// Whether both handles refer to the same registry entry
    pub fn same_handle(&self, other: &Device) -> bool {
        Arc::ptr_eq(&self.info, &other.info)
    }

    fn replace_info(&self, info: DeviceInfo) {
        *self.info.write() = info;
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.serial == other.serial
    }
}

impl Eq for Device {}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("serial", &self.serial)
            .field("info", &*self.info.read())
            .finish()
    }
}

/// What changed, as passed to listeners
#[derive(Debug, Clone)]
pub enum DeviceUpdate {
    /// One device connected or was refreshed
    Single(Device),
    /// The full device list after a fetch or a disconnect
    List(Vec<Device>),
}

/// Handle returned by [`DeviceRegistry::add_device_update_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&DeviceUpdate) + Send + Sync>;

#[derive(Default)]
struct RegistryState {
    devices: Vec<Device>,
    selected: Option<Device>,
}

impl RegistryState {
    fn find(&self, serial: &str) -> Option<&Device> {
        self.devices.iter().find(|device| device.serial() == serial)
    }

    /// Find-or-create by serial, replacing the info of an existing entry
    fn upsert(&mut self, info: DeviceInfo) -> Device {
        if let Some(existing) = self.find(info.serial()) {
            let existing = existing.clone();
            existing.replace_info(info);
            return existing;
        }
        let device = Device::new(info);
        self.devices.push(device.clone());
        device
    }
}

/// Known devices, the current selection and update listeners
pub struct DeviceRegistry {
    state: Mutex<RegistryState>,
    listeners: Mutex<BTreeMap<ListenerId, Listener>>,
    next_listener_id: AtomicU64,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            listeners: Mutex::new(BTreeMap::new()),
            next_listener_id: AtomicU64::new(0),
        }
    }

    /// Merge a device list returned by the service.
    ///
    /// Existing serials keep their handle and position; new serials are
    /// appended in list order. Devices missing from the list are kept. If
    /// nothing is selected the first device becomes selected. Listeners get
    /// the full list.
    pub fn merge_device_list(&self, infos: Vec<DeviceInfo>) -> Vec<Device> {
        let devices = {
            let mut state = self.state.lock();
            for info in infos {
                state.upsert(info);
            }
            if state.selected.is_none() {
                state.selected = state.devices.first().cloned();
            }
            if state.devices.is_empty() {
                state.selected = None;
            }
            state.devices.clone()
        };

        info!(count = devices.len(), "Device list updated");
        self.notify(&DeviceUpdate::List(devices.clone()));
        devices
    }

    /// Handle a device-connected event
    pub fn apply_connected(&self, info: DeviceInfo) -> Device {
        let device = {
            let mut state = self.state.lock();
            let device = state.upsert(info);
            if state.selected.is_none() {
                state.selected = Some(device.clone());
            }
            device
        };

        info!(serial = %device.serial(), "Device connected");
        self.notify(&DeviceUpdate::Single(device.clone()));
        device
    }

    /// Handle a device-disconnected event.
    ///
    /// Unknown serials still notify listeners with the current list.
    pub fn apply_disconnected(&self, serial: &str) -> Vec<Device> {
        let devices = {
            let mut state = self.state.lock();
            let before = state.devices.len();
            state.devices.retain(|device| device.serial() != serial);
            if state.devices.len() == before {
                debug!(serial = %serial, "Disconnect for unknown device");
            }

            let selection_gone = state
                .selected
                .as_ref()
                .is_some_and(|selected| selected.serial() == serial);
            if selection_gone || state.devices.is_empty() {
                state.selected = state.devices.first().cloned();
            }
            state.devices.clone()
        };

        info!(serial = %serial, remaining = devices.len(), "Device disconnected");
        self.notify(&DeviceUpdate::List(devices.clone()));
        devices
    }

    pub fn find_device(&self, serial: &str) -> Option<Device> {
        self.state.lock().find(serial).cloned()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.state.lock().devices.clone()
    }

    pub fn selected_device(&self) -> Option<Device> {
        self.state.lock().selected.clone()
    }

    /// Select the device with `serial`
    pub fn select_device(&self, serial: &str) -> IpcResult<Device> {
        let mut state = self.state.lock();
        let device = state
            .find(serial)
            .cloned()
            .ok_or_else(|| IpcError::device_not_found(serial))?;
        state.selected = Some(device.clone());
        debug!(serial = %serial, "Device selected");
        Ok(device)
    }

    /// Forget every device and the selection; listeners are kept
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.devices.clear();
        state.selected = None;
    }

    pub fn add_device_update_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&DeviceUpdate) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().insert(id, Arc::new(listener));
        id
    }

    /// Remove a listener; unknown ids are ignored
    pub fn remove_device_update_listener(&self, id: ListenerId) {
        self.listeners.lock().remove(&id);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn notify(&self, update: &DeviceUpdate) {
        let listeners: Vec<Listener> = self.listeners.lock().values().cloned().collect();
        for listener in listeners {
            listener(update);
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
