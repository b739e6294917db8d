// Hotkeyd Input Layer - Device Identity
// Bus/vendor/product identity and typed capability sets

use strum_macros::{Display, EnumIter};

/// Bus type codes from linux/input.h
pub mod bus {
    pub const USB: u16 = 0x03;
    /// Added to linux/input.h after Linux 2.6.18
    pub const VIRTUAL: u16 = 0x06;
    pub const ADB: u16 = 0x17;
    pub const HOST: u16 = 0x19;
}

/// Apple USB vendor id
pub const USB_VENDOR_ID_APPLE: u16 = 0x05ac;

/// Identity reported by EVIOCGID. Read once when a node is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceIdentity {
    pub bus: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

impl DeviceIdentity {
    pub fn new(bus: u16, vendor: u16, product: u16, version: u16) -> Self {
        Self {
            bus,
            vendor,
            product,
            version,
        }
    }

    /// Build an identity from the id block of an opened evdev device
    pub fn from_input_id(id: &evdev::InputId) -> Self {
        Self::new(id.bus_type().0, id.vendor(), id.product(), id.version())
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bus 0x{:04x}, vid 0x{:04x}, pid 0x{:04x}, ver 0x{:04x}",
            self.bus, self.vendor, self.product, self.version
        )
    }
}

/// Event categories a device can report.
///
/// Discriminants are the EV_* type codes from input-event-codes.h, so a
/// category doubles as its bit index in the EVIOCGBIT(0) mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[repr(u16)]
pub enum EventCategory {
    #[strum(serialize = "EV_SYN")]
    Sync = 0x00,
    #[strum(serialize = "EV_KEY")]
    Key = 0x01,
    #[strum(serialize = "EV_REL")]
    Relative = 0x02,
    #[strum(serialize = "EV_ABS")]
    Absolute = 0x03,
    #[strum(serialize = "EV_MSC")]
    Misc = 0x04,
    #[strum(serialize = "EV_SW")]
    Switch = 0x05,
    #[strum(serialize = "EV_LED")]
    Led = 0x11,
    #[strum(serialize = "EV_SND")]
    Sound = 0x12,
    #[strum(serialize = "EV_REP")]
    Repeat = 0x14,
    #[strum(serialize = "EV_FF")]
    ForceFeedback = 0x15,
}

impl EventCategory {
    /// Raw EV_* type code
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up a category from its EV_* type code
    pub fn from_code(code: u16) -> Option<Self> {
        use strum::IntoEnumIterator;
        Self::iter().find(|c| c.code() == code)
    }
}

/// Set of event categories reported by a device.
///
/// Same bit layout as the first word of the kernel's EVIOCGBIT(0) answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet(u32);

impl CapabilitySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build from a raw EV_* bitmask
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn with(mut self, category: EventCategory) -> Self {
        self.insert(category);
        self
    }

    pub fn insert(&mut self, category: EventCategory) {
        self.0 |= 1 << category.code();
    }

    pub fn supports(self, category: EventCategory) -> bool {
        self.0 & (1 << category.code()) != 0
    }

    /// Capabilities of an opened evdev device
    pub fn from_device(device: &evdev::Device) -> Self {
        use strum::IntoEnumIterator;

        let supported = device.supported_events();
        EventCategory::iter()
            .filter(|c| supported.contains(evdev::EventType(c.code())))
            .fold(Self::empty(), Self::with)
    }
}

impl FromIterator<EventCategory> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = EventCategory>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}
