// Hotkeyd Device Layer - Device Handles
// Exclusively owned descriptors and the role they were classified into

use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::Path;

use strum_macros::{Display, EnumIter};

use crate::input::{CapabilitySet, DeviceIdentity};

/// Logical role a registered descriptor plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Role {
    Keyboard,
    LidSwitch,
    Tone,
    IrReceiver,
    VirtualKeyboard,
    Unclassified,
}

/// An open descriptor. Dropping it closes the descriptor.
pub enum Descriptor {
    /// Kernel event device opened through evdev
    Input(evdev::Device),
    /// Any other pollable descriptor (inotify, tone generator, pipes in tests)
    Raw(OwnedFd),
}

impl AsRawFd for Descriptor {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            Descriptor::Input(device) => device.as_raw_fd(),
            Descriptor::Raw(fd) => fd.as_raw_fd(),
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Input(_) => write!(f, "Input(fd {})", self.as_raw_fd()),
            Descriptor::Raw(_) => write!(f, "Raw(fd {})", self.as_raw_fd()),
        }
    }
}

impl From<OwnedFd> for Descriptor {
    fn from(fd: OwnedFd) -> Self {
        Descriptor::Raw(fd)
    }
}

/// Errors while opening or probing an event device node
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("node vanished before it could be opened")]
    Vanished,

    #[error("could not open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },
}

/// An evdev node that was opened but not yet classified
pub struct ProbedDevice {
    pub device: evdev::Device,
    pub identity: DeviceIdentity,
    pub capabilities: CapabilitySet,
    pub name: String,
}

impl ProbedDevice {
    /// Open `path` and read its identity, name and capability mask
    pub fn open(path: &Path) -> Result<Self, ProbeError> {
        let device = evdev::Device::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProbeError::Vanished
            } else {
                ProbeError::Open {
                    path: path.display().to_string(),
                    source: e,
                }
            }
        })?;

        let identity = DeviceIdentity::from_input_id(&device.input_id());
        let capabilities = CapabilitySet::from_device(&device);
        let name = device.name().unwrap_or("").to_string();

        Ok(Self {
            device,
            identity,
            capabilities,
            name,
        })
    }

    pub fn into_handle(self, role: Role) -> DeviceHandle {
        DeviceHandle::new(Descriptor::Input(self.device), role, self.name)
    }
}

/// A registered device: the descriptor, its role and a diagnostic name
#[derive(Debug)]
pub struct DeviceHandle {
    descriptor: Descriptor,
    role: Role,
    name: String,
}

impl DeviceHandle {
    pub fn new(descriptor: impl Into<Descriptor>, role: Role, name: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            role,
            name: name.into(),
        }
    }

    pub fn fd(&self) -> RawFd {
        self.descriptor.as_raw_fd()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AsRawFd for DeviceHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.fd()
    }
}
