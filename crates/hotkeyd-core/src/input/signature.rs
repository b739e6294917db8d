// Hotkeyd Input Layer - Hardware Signatures
// Declarative bus/vendor/product tables for each supported hardware generation

use super::identity::{bus, DeviceIdentity, USB_VENDOR_ID_APPLE};
use crate::device::Role;

/// One row of a hardware signature table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Family name, for diagnostics
    pub name: &'static str,
    pub bus: u16,
    pub vendor: u16,
    pub products: &'static [u16],
    /// Some families are only told apart by their version id
    pub version: Option<u16>,
    pub role: Role,
    /// Matching this family switches the keyboard's fn-key interpretation
    pub sets_fn_mode: bool,
}

impl Signature {
    pub fn matches(&self, id: &DeviceIdentity) -> bool {
        id.bus == self.bus
            && id.vendor == self.vendor
            && self.version.map_or(true, |v| id.version == v)
            && self.products.contains(&id.product)
    }
}

/// First row in `table` matching `id`
pub fn find_match<'a>(table: &'a [Signature], id: &DeviceIdentity) -> Option<&'a Signature> {
    table.iter().find(|sig| sig.matches(id))
}

const fn apple_usb_keyboard(
    name: &'static str,
    products: &'static [u16],
    sets_fn_mode: bool,
) -> Signature {
    Signature {
        name,
        bus: bus::USB,
        vendor: USB_VENDOR_ID_APPLE,
        products,
        version: None,
        role: Role::Keyboard,
        sets_fn_mode,
    }
}

// ANSI, ISO, JIS product ids per keyboard family
pub const FOUNTAIN_PRODUCTS: &[u16] = &[0x020e, 0x020f, 0x0210];
pub const GEYSER_PRODUCTS: &[u16] = &[0x0214, 0x0215, 0x0216];
pub const GEYSER3_PRODUCTS: &[u16] = &[0x0217, 0x0218, 0x0219];
pub const GEYSER4_PRODUCTS: &[u16] = &[0x021a, 0x021b, 0x021c];
pub const GEYSER4HF_PRODUCTS: &[u16] = &[0x0229, 0x022a, 0x022b];

pub const APPLEIR_PRODUCTS: &[u16] = &[0x8240, 0x8242];

pub const ADB_PRODUCT_ID_KEYBOARD: u16 = 0x0022;
pub const ADB_PRODUCT_ID_PBBUTTONS: u16 = 0x771f;

/// Core Duo and Core2 Duo MacBook / MacBook Pro keyboards
pub const X86_KEYBOARDS: &[Signature] = &[
    apple_usb_keyboard("Geyser III USB keyboard", GEYSER3_PRODUCTS, true),
    apple_usb_keyboard("Geyser IV USB keyboard", GEYSER4_PRODUCTS, true),
    apple_usb_keyboard("Geyser IV-HF USB keyboard", GEYSER4HF_PRODUCTS, true),
];

/// PowerBook G4 keyboards, ADB and USB
pub const POWERPC_KEYBOARDS: &[Signature] = &[
    Signature {
        name: "ADB keyboard",
        bus: bus::ADB,
        vendor: 0x0001,
        products: &[ADB_PRODUCT_ID_KEYBOARD],
        version: None,
        role: Role::Keyboard,
        sets_fn_mode: false,
    },
    Signature {
        name: "ADB PowerBook buttons",
        bus: bus::ADB,
        vendor: 0x0001,
        products: &[ADB_PRODUCT_ID_PBBUTTONS],
        version: None,
        role: Role::Keyboard,
        sets_fn_mode: false,
    },
    apple_usb_keyboard("Fountain USB keyboard", FOUNTAIN_PRODUCTS, false),
    apple_usb_keyboard("Geyser USB keyboard", GEYSER_PRODUCTS, true),
];

pub const APPLE_IR: Signature = Signature {
    name: "Apple IR receiver",
    bus: bus::USB,
    vendor: USB_VENDOR_ID_APPLE,
    products: APPLEIR_PRODUCTS,
    version: None,
    role: Role::IrReceiver,
    sets_fn_mode: false,
};

pub const ACPI_LID_SWITCH: Signature = Signature {
    name: "ACPI LID switch",
    bus: bus::HOST,
    vendor: 0x0000,
    products: &[0x0005],
    version: None,
    role: Role::LidSwitch,
    sets_fn_mode: false,
};

pub const PMU_LID_SWITCH: Signature = Signature {
    name: "PMU LID switch",
    bus: bus::HOST,
    vendor: 0x0001,
    products: &[0x0001],
    version: Some(0x0100),
    role: Role::LidSwitch,
    sets_fn_mode: false,
};

pub const MOUSEEMU: Signature = Signature {
    name: "Mouseemu virtual keyboard",
    bus: bus::VIRTUAL,
    vendor: 0x001f,
    products: &[0x001f],
    version: None,
    role: Role::VirtualKeyboard,
    sets_fn_mode: false,
};

/// Signatures for the non-keyboard devices of one target platform.
#[derive(Debug, Clone, Copy)]
pub struct PlatformTable {
    pub name: &'static str,
    pub keyboards: &'static [Signature],
    /// None where the platform has no IR receiver support
    pub ir_receiver: Option<Signature>,
    pub lid_switch: Signature,
    pub virtual_keyboard: Signature,
}

impl PlatformTable {
    pub const X86: PlatformTable = PlatformTable {
        name: "x86",
        keyboards: X86_KEYBOARDS,
        ir_receiver: Some(APPLE_IR),
        lid_switch: ACPI_LID_SWITCH,
        virtual_keyboard: MOUSEEMU,
    };

    pub const POWERPC: PlatformTable = PlatformTable {
        name: "powerpc",
        keyboards: POWERPC_KEYBOARDS,
        ir_receiver: None,
        lid_switch: PMU_LID_SWITCH,
        virtual_keyboard: MOUSEEMU,
    };

    /// Table for the architecture this binary was built for
    pub fn for_target() -> &'static PlatformTable {
        if cfg!(any(target_arch = "powerpc", target_arch = "powerpc64")) {
            &Self::POWERPC
        } else {
            &Self::X86
        }
    }
}
