// Hotkeyd Device Layer
// Device handles and the registry that owns them

mod handle;
mod registry;

pub use handle::{Descriptor, DeviceHandle, ProbeError, ProbedDevice, Role};
pub use registry::{DeviceRegistry, RegistryError, SlotId, EVDEV_MAX};
