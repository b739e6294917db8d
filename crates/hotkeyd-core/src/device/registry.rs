// Hotkeyd Device Registry
// Fixed-capacity slot table owning every open device descriptor

use std::os::fd::RawFd;

use super::handle::{DeviceHandle, Role};

/// Maximum number of simultaneously open devices
pub const EVDEV_MAX: usize = 32;

/// Index of an occupied slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

/// Errors from registry operations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Every slot is taken. The rejected handle is handed back; dropping it
    /// closes the descriptor.
    #[error("device table full, cannot add {}", .0.name())]
    Full(DeviceHandle),
}

/// Bounded set of open device handles.
///
/// A slot either owns one handle or is free. Removing a handle drops it, so
/// the descriptor is closed at the same moment its slot is cleared.
#[derive(Debug)]
pub struct DeviceRegistry<const N: usize = EVDEV_MAX> {
    slots: [Option<DeviceHandle>; N],
}

impl<const N: usize> DeviceRegistry<N> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Take ownership of `handle` and store it in the first free slot.
    ///
    /// Handles own their descriptors, so one descriptor can never be stored
    /// twice.
    pub fn add(&mut self, handle: DeviceHandle) -> Result<SlotId, RegistryError> {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(handle);
                Ok(SlotId(index))
            }
            None => Err(RegistryError::Full(handle)),
        }
    }

    /// Remove and close the handle holding `fd`. Unknown descriptors are a
    /// no-op.
    pub fn remove(&mut self, fd: RawFd) -> bool {
        match self.take(fd) {
            Some(handle) => {
                log::debug!("Closing {} device {} (fd {})", handle.role(), handle.name(), fd);
                drop(handle);
                true
            }
            None => false,
        }
    }

    /// Remove the handle holding `fd` without closing it
    pub fn take(&mut self, fd: RawFd) -> Option<DeviceHandle> {
        self.slot_of(fd).and_then(|SlotId(index)| self.slots[index].take())
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        self.slot_of(fd).is_some()
    }

    pub fn get(&self, fd: RawFd) -> Option<&DeviceHandle> {
        self.iter().find(|h| h.fd() == fd)
    }

    pub fn role_of(&self, fd: RawFd) -> Option<Role> {
        self.get(fd).map(DeviceHandle::role)
    }

    pub fn slot_of(&self, fd: RawFd) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|h| h.fd() == fd))
            .map(SlotId)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceHandle> {
        self.slots.iter().flatten()
    }

    /// Close every registered descriptor
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.take();
        }
    }
}

impl<const N: usize> Default for DeviceRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
