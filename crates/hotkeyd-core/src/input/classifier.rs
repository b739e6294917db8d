// Hotkeyd Input Layer - Device Classification
// Decides whether an event device belongs to us and which role it plays

use std::path::PathBuf;

use super::identity::{CapabilitySet, DeviceIdentity, EventCategory};
use super::signature::{find_match, PlatformTable, Signature};
use crate::device::Role;

/// Per-machine hooks consumed by the classifier.
pub trait Platform {
    /// Whether `identity` is this machine's built-in keyboard
    fn is_native_keyboard_device(&self, identity: &DeviceIdentity) -> bool;

    /// Called once for every device matched as the native keyboard
    fn on_keyboard_matched(&mut self, _identity: &DeviceIdentity) {}
}

/// Function-key mode to apply when a family that needs it is matched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FnMode {
    /// sysfs module parameter to write
    pub path: PathBuf,
    pub value: u8,
}

impl FnMode {
    pub const DEFAULT_PATH: &'static str = "/sys/module/hid_apple/parameters/fnmode";
}

/// Platform backed by a keyboard signature table.
#[derive(Debug, Clone)]
pub struct SignaturePlatform {
    keyboards: &'static [Signature],
    fn_mode: Option<FnMode>,
}

impl SignaturePlatform {
    pub fn new(keyboards: &'static [Signature]) -> Self {
        Self {
            keyboards,
            fn_mode: None,
        }
    }

    pub fn with_fn_mode(mut self, fn_mode: Option<FnMode>) -> Self {
        self.fn_mode = fn_mode;
        self
    }
}

impl Platform for SignaturePlatform {
    fn is_native_keyboard_device(&self, identity: &DeviceIdentity) -> bool {
        match find_match(self.keyboards, identity) {
            Some(sig) => {
                log::debug!(" -> {}", sig.name);
                true
            }
            None => false,
        }
    }

    fn on_keyboard_matched(&mut self, identity: &DeviceIdentity) {
        let needs_fn_mode = find_match(self.keyboards, identity).is_some_and(|sig| sig.sets_fn_mode);
        if !needs_fn_mode {
            return;
        }
        let Some(fn_mode) = &self.fn_mode else {
            return;
        };

        if let Err(e) = std::fs::write(&fn_mode.path, format!("{}\n", fn_mode.value)) {
            log::warn!(
                "Could not set fnmode to {} via {}: {}",
                fn_mode.value,
                fn_mode.path.display(),
                e
            );
        }
    }
}

/// Configuration surface the classifier depends on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub ir_enabled: bool,
    pub has_kbd_backlight: bool,
}

/// Prioritized identity matching followed by a capability veto.
pub struct DeviceClassifier<P> {
    platform: P,
    table: &'static PlatformTable,
    config: ClassifierConfig,
}

impl<P: Platform> DeviceClassifier<P> {
    pub fn new(platform: P, table: &'static PlatformTable, config: ClassifierConfig) -> Self {
        Self {
            platform,
            table,
            config,
        }
    }

    pub fn config(&self) -> ClassifierConfig {
        self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Classify a device by identity and reported event categories.
    ///
    /// Order: native keyboard, IR receiver (if enabled), lid switch (only
    /// with keyboard backlight support), virtual keyboard. A device that
    /// reports neither key nor switch events, or key events together with
    /// absolute axes, is refused whatever its identity.
    ///
    /// A native keyboard identity fires `Platform::on_keyboard_matched`
    /// before the capability check.
    pub fn classify(&mut self, identity: &DeviceIdentity, caps: CapabilitySet) -> Option<Role> {
        let role = self.match_identity(identity);
        if role == Some(Role::Keyboard) {
            self.platform.on_keyboard_matched(identity);
        }
        role.filter(|_| accepts_capabilities(caps))
    }

    /// Same decision as `classify` with no platform side effects
    pub fn identify(&self, identity: &DeviceIdentity, caps: CapabilitySet) -> Option<Role> {
        self.match_identity(identity).filter(|_| accepts_capabilities(caps))
    }

    fn match_identity(&self, identity: &DeviceIdentity) -> Option<Role> {
        if self.platform.is_native_keyboard_device(identity) {
            return Some(Role::Keyboard);
        }

        let optional = [
            self.table.ir_receiver.filter(|_| self.config.ir_enabled),
            Some(self.table.lid_switch).filter(|_| self.config.has_kbd_backlight),
            Some(self.table.virtual_keyboard),
        ];

        let role = optional.into_iter().flatten().find(|sig| sig.matches(identity)).map(|sig| {
            log::debug!(" -> {}", sig.name);
            sig.role
        });
        if role.is_none() {
            log::debug!("Discarding evdev: {}", identity);
        }
        role
    }
}

fn accepts_capabilities(caps: CapabilitySet) -> bool {
    if !caps.supports(EventCategory::Key) {
        log::debug!("evdev: no EV_KEY event type (not a keyboard)");
        if !caps.supports(EventCategory::Switch) {
            log::debug!("Discarding evdev: no EV_SW event type (not a switch)");
            return false;
        }
    } else if caps.supports(EventCategory::Absolute) {
        log::debug!("Discarding evdev with EV_ABS event type (mouse/trackpad)");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::identity::{bus, USB_VENDOR_ID_APPLE};

    /// Platform that counts fn-mode hook invocations
    struct CountingPlatform {
        inner: SignaturePlatform,
        matched: usize,
    }

    impl Platform for CountingPlatform {
        fn is_native_keyboard_device(&self, identity: &DeviceIdentity) -> bool {
            self.inner.is_native_keyboard_device(identity)
        }

        fn on_keyboard_matched(&mut self, _identity: &DeviceIdentity) {
            self.matched += 1;
        }
    }

    fn classifier(config: ClassifierConfig) -> DeviceClassifier<CountingPlatform> {
        let platform = CountingPlatform {
            inner: SignaturePlatform::new(PlatformTable::X86.keyboards),
            matched: 0,
        };
        DeviceClassifier::new(platform, &PlatformTable::X86, config)
    }

    fn all_enabled() -> ClassifierConfig {
        ClassifierConfig {
            ir_enabled: true,
            has_kbd_backlight: true,
        }
    }

    fn keys() -> CapabilitySet {
        CapabilitySet::empty()
            .with(EventCategory::Sync)
            .with(EventCategory::Key)
    }

    const GEYSER4: DeviceIdentity = DeviceIdentity {
        bus: bus::USB,
        vendor: USB_VENDOR_ID_APPLE,
        product: 0x021b,
        version: 0x0110,
    };

    const APPLE_IR: DeviceIdentity = DeviceIdentity {
        bus: bus::USB,
        vendor: USB_VENDOR_ID_APPLE,
        product: 0x8240,
        version: 0,
    };

    const ACPI_LID: DeviceIdentity = DeviceIdentity {
        bus: bus::HOST,
        vendor: 0,
        product: 0x0005,
        version: 0,
    };

    #[test]
    fn test_native_keyboard() {
        let mut c = classifier(all_enabled());
        assert_eq!(c.classify(&GEYSER4, keys()), Some(Role::Keyboard));
        assert_eq!(c.platform().matched, 1);
    }

    #[test]
    fn test_unknown_identity_is_refused() {
        let mut c = classifier(all_enabled());
        let caps = keys().with(EventCategory::Switch);
        for id in [
            DeviceIdentity::new(bus::USB, 0x046d, 0xc52b, 0x0111),
            DeviceIdentity::new(bus::USB, USB_VENDOR_ID_APPLE, 0x0001, 0),
            DeviceIdentity::new(bus::HOST, 0, 0x0001, 0),
            DeviceIdentity::default(),
        ] {
            assert_eq!(c.classify(&id, caps), None);
        }
        assert_eq!(c.platform().matched, 0);
    }

    #[test]
    fn test_keyboard_without_key_or_switch_is_refused() {
        let mut c = classifier(all_enabled());
        let caps = CapabilitySet::empty()
            .with(EventCategory::Sync)
            .with(EventCategory::Relative);
        assert_eq!(c.classify(&GEYSER4, caps), None);
    }

    #[test]
    fn test_keyboard_with_absolute_axes_is_refused() {
        // Trackpads share the keyboard's USB vendor/product ids
        let mut c = classifier(all_enabled());
        let caps = keys().with(EventCategory::Absolute);
        assert_eq!(c.classify(&GEYSER4, caps), None);
    }

    #[test]
    fn test_fn_mode_hook_runs_even_when_vetoed() {
        let mut c = classifier(all_enabled());
        let caps = keys().with(EventCategory::Absolute);
        assert_eq!(c.classify(&GEYSER4, caps), None);
        assert_eq!(c.platform().matched, 1);
    }

    #[test]
    fn test_switch_only_device_is_accepted() {
        let mut c = classifier(all_enabled());
        let caps = CapabilitySet::empty().with(EventCategory::Switch);
        assert_eq!(c.classify(&ACPI_LID, caps), Some(Role::LidSwitch));
    }

    #[test]
    fn test_lid_switch_requires_backlight_support() {
        let mut c = classifier(ClassifierConfig {
            ir_enabled: true,
            has_kbd_backlight: false,
        });
        let caps = CapabilitySet::empty().with(EventCategory::Switch);
        assert_eq!(c.classify(&ACPI_LID, caps), None);
    }

    #[test]
    fn test_ir_receiver_requires_feature() {
        let mut enabled = classifier(all_enabled());
        assert_eq!(enabled.classify(&APPLE_IR, keys()), Some(Role::IrReceiver));

        let mut disabled = classifier(ClassifierConfig {
            ir_enabled: false,
            has_kbd_backlight: true,
        });
        assert_eq!(disabled.classify(&APPLE_IR, keys()), None);
    }

    #[test]
    fn test_virtual_keyboard() {
        let mut c = classifier(ClassifierConfig::default());
        let id = DeviceIdentity::new(bus::VIRTUAL, 0x001f, 0x001f, 0);
        assert_eq!(c.classify(&id, keys()), Some(Role::VirtualKeyboard));
    }

    #[test]
    fn test_powerpc_table_has_no_ir_receiver() {
        let platform = SignaturePlatform::new(PlatformTable::POWERPC.keyboards);
        let mut c = DeviceClassifier::new(platform, &PlatformTable::POWERPC, all_enabled());
        assert_eq!(c.classify(&APPLE_IR, keys()), None);

        let adb = DeviceIdentity::new(bus::ADB, 0x0001, 0x771f, 0);
        assert_eq!(c.classify(&adb, keys()), Some(Role::Keyboard));
    }

    #[test]
    fn test_signature_platform_writes_fn_mode() {
        let path = std::env::temp_dir().join(format!("hotkeyd-fnmode-{}", std::process::id()));
        let mut platform = SignaturePlatform::new(PlatformTable::X86.keyboards).with_fn_mode(Some(
            FnMode {
                path: path.clone(),
                value: 2,
            },
        ));

        platform.on_keyboard_matched(&GEYSER4);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "2\n");
        std::fs::remove_file(&path).unwrap();

        // Families that do not need it leave the parameter alone
        platform.on_keyboard_matched(&APPLE_IR);
        assert!(!path.exists());
    }

    #[test]
    fn test_identify_leaves_fn_mode_untouched() {
        let path = std::env::temp_dir().join(format!("hotkeyd-identify-{}", std::process::id()));
        let platform = SignaturePlatform::new(PlatformTable::X86.keyboards).with_fn_mode(Some(
            FnMode {
                path: path.clone(),
                value: 2,
            },
        ));
        let mut c = DeviceClassifier::new(platform, &PlatformTable::X86, all_enabled());

        assert_eq!(c.identify(&GEYSER4, keys()), Some(Role::Keyboard));
        assert!(!path.exists());

        assert_eq!(c.classify(&GEYSER4, keys()), Some(Role::Keyboard));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "2\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_identify_matches_classify() {
        let mut c = classifier(all_enabled());
        let trackpad = keys().with(EventCategory::Absolute);
        let switch = CapabilitySet::empty().with(EventCategory::Switch);

        let cases = [
            (GEYSER4, keys()),
            (GEYSER4, trackpad),
            (APPLE_IR, keys()),
            (ACPI_LID, switch),
        ];
        for (id, caps) in cases {
            let identified = c.identify(&id, caps);
            assert_eq!(identified, c.classify(&id, caps));
        }
        assert_eq!(c.platform().matched, 2);
    }
}
