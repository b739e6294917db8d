// Hotkeyd Event Loop Integration Tests
//
// These tests drive EvdevCore end to end with real descriptors: socket
// pairs stand in for event devices, temporary directories for /dev/input.
//
// Run with: cargo test --test event_loop_test

mod tests {
    use std::io::Write;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hotkeyd_core::event::{CoreConfig, DispatchConfig, EvdevCore, ReadyEvent};
    use hotkeyd_core::input::event::{keys, SND_TONE, SW_LID};
    use hotkeyd_core::input::{ClassifierConfig, InputRecord, PlatformTable, SignaturePlatform};
    use hotkeyd_core::{Action, Actuators, DeviceHandle, Direction, InhibitReason, InhibitState, Role};

    // =========================================================================
    // Test Helpers
    // =========================================================================

    #[derive(Debug, Default)]
    struct Recorder {
        actions: Vec<Action>,
    }

    impl Actuators for Recorder {
        fn step_display_brightness(&mut self, direction: Direction) {
            self.actions.push(Action::StepDisplayBrightness(direction));
        }
        fn step_keyboard_brightness(&mut self, direction: Direction, _inhibit: &InhibitState) {
            self.actions.push(Action::StepKeyboardBrightness(direction));
        }
        fn toggle_keyboard_backlight(&mut self, _inhibit: &InhibitState) {
            self.actions.push(Action::ToggleKeyboardBacklight);
        }
        fn toggle_audio_mute(&mut self) {
            self.actions.push(Action::ToggleMute);
        }
        fn step_volume(&mut self, direction: Direction) {
            self.actions.push(Action::StepVolume(direction));
        }
        fn eject_media(&mut self) {
            self.actions.push(Action::EjectMedia);
        }
        fn emit_tone(&mut self) {
            self.actions.push(Action::EmitTone);
        }
    }

    type Core = EvdevCore<SignaturePlatform, Recorder>;

    /// Fresh empty directory under the system temp dir
    fn temp_dir(tag: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let dir = std::env::temp_dir().join(format!(
            "hotkeyd-{}-{}-{}",
            tag,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn core_in(dir: PathBuf) -> Core {
        let config = CoreConfig {
            evdev_dir: dir,
            timeout_ms: 50,
            classifier: ClassifierConfig {
                ir_enabled: true,
                has_kbd_backlight: true,
            },
            dispatch: DispatchConfig {
                has_kbd_backlight: true,
                auto_on: false,
            },
        };
        let platform = SignaturePlatform::new(PlatformTable::X86.keyboards);
        EvdevCore::new(platform, Recorder::default(), config).unwrap()
    }

    /// Register one end of a socket pair as a device; the peer plays the kernel
    fn fake_device(core: &mut Core, role: Role) -> (i32, UnixStream) {
        let (ours, peer) = UnixStream::pair().unwrap();
        let handle = DeviceHandle::new(OwnedFd::from(ours), role, "fake device");
        let fd = handle.fd();
        assert!(core.add_device(handle));
        (fd, peer)
    }

    fn actions(core: &Core) -> &[Action] {
        &core.dispatcher().actuators().actions
    }

    // =========================================================================
    // Dispatch through the loop
    // =========================================================================

    #[test]
    fn test_key_press_reaches_actuator() {
        let mut core = core_in(temp_dir("press"));
        let (_fd, mut kernel) = fake_device(&mut core, Role::Keyboard);
        core.dispatcher_mut().inhibit_mut().set(InhibitReason::IdleTimeout);

        kernel.write_all(&InputRecord::key(keys::KEY_VOLUMEUP, 1).to_bytes()).unwrap();
        assert_eq!(core.wait_and_dispatch(500).unwrap(), 1);
        assert_eq!(actions(&core), &[Action::StepVolume(Direction::Up)]);
        assert!(!core.inhibit().is_set(InhibitReason::IdleTimeout));

        kernel.write_all(&InputRecord::key(keys::KEY_VOLUMEUP, 0).to_bytes()).unwrap();
        core.wait_and_dispatch(500).unwrap();
        assert_eq!(actions(&core).len(), 1);
    }

    #[test]
    fn test_one_record_per_readiness() {
        let mut core = core_in(temp_dir("records"));
        let (_fd, mut kernel) = fake_device(&mut core, Role::Keyboard);

        let mut burst = InputRecord::key(keys::KEY_MUTE, 1).to_bytes().to_vec();
        burst.extend_from_slice(&InputRecord::key(keys::KEY_EJECTCD, 1).to_bytes());
        kernel.write_all(&burst).unwrap();

        core.wait_and_dispatch(500).unwrap();
        assert_eq!(actions(&core), &[Action::ToggleMute]);
        // Level-triggered: the remaining record is reported again
        core.wait_and_dispatch(500).unwrap();
        assert_eq!(actions(&core), &[Action::ToggleMute, Action::EjectMedia]);
    }

    #[test]
    fn test_partial_record_is_dropped() {
        let mut core = core_in(temp_dir("partial"));
        let (_fd, mut kernel) = fake_device(&mut core, Role::Keyboard);
        core.dispatcher_mut().inhibit_mut().set(InhibitReason::IdleTimeout);

        let bytes = InputRecord::key(keys::KEY_MUTE, 1).to_bytes();
        kernel.write_all(&bytes[..bytes.len() / 2]).unwrap();
        core.wait_and_dispatch(500).unwrap();

        assert!(actions(&core).is_empty());
        assert!(core.inhibit().is_set(InhibitReason::IdleTimeout));
        assert_eq!(core.device_count(), 1);
    }

    #[test]
    fn test_lid_and_tone_events() {
        let mut core = core_in(temp_dir("lid"));
        let (_lid, mut lid_kernel) = fake_device(&mut core, Role::LidSwitch);
        let (ours, mut beeper) = UnixStream::pair().unwrap();
        assert!(core.add_tone_device(DeviceHandle::new(OwnedFd::from(ours), Role::Tone, "beeper")));

        lid_kernel.write_all(&InputRecord::switch(SW_LID, 1).to_bytes()).unwrap();
        core.wait_and_dispatch(500).unwrap();
        assert!(core.inhibit().is_inhibited());

        beeper.write_all(&InputRecord::sound(SND_TONE, 880).to_bytes()).unwrap();
        core.wait_and_dispatch(500).unwrap();
        assert_eq!(actions(&core), &[Action::EmitTone]);

        lid_kernel.write_all(&InputRecord::switch(SW_LID, 0).to_bytes()).unwrap();
        core.wait_and_dispatch(500).unwrap();
        assert!(!core.inhibit().is_inhibited());
    }

    #[test]
    fn test_timeout_returns_zero() {
        let mut core = core_in(temp_dir("timeout"));
        let (_fd, _kernel) = fake_device(&mut core, Role::Keyboard);
        assert_eq!(core.step().unwrap(), 0);
    }

    // =========================================================================
    // Device lifecycle
    // =========================================================================

    #[test]
    fn test_hangup_removes_device() {
        let mut core = core_in(temp_dir("hangup"));
        let (fd, kernel) = fake_device(&mut core, Role::Keyboard);
        let (other_fd, _other) = fake_device(&mut core, Role::LidSwitch);

        drop(kernel);
        assert_eq!(core.wait_and_dispatch(500).unwrap(), 1);
        assert!(!core.registry().contains(fd));
        assert!(core.registry().contains(other_fd));

        // The removed descriptor is no longer polled
        assert_eq!(core.wait_and_dispatch(50).unwrap(), 0);
    }

    #[test]
    fn test_tone_device_loss() {
        let mut core = core_in(temp_dir("tone"));
        let (ours, beeper) = UnixStream::pair().unwrap();
        let handle = DeviceHandle::new(OwnedFd::from(ours), Role::Tone, "beeper");
        let fd = handle.fd();
        assert!(core.add_tone_device(handle));
        assert_eq!(core.tone_fd(), Some(fd));

        drop(beeper);
        core.wait_and_dispatch(500).unwrap();
        assert_eq!(core.tone_fd(), None);
        assert!(core.registry().is_empty());
    }

    #[test]
    fn test_tone_device_known_by_role() {
        let mut core = core_in(temp_dir("tone-role"));
        let (keyboard_fd, _keyboard) = fake_device(&mut core, Role::Keyboard);
        assert_eq!(core.tone_fd(), None);

        // Any registration path carrying the tone role counts
        let (tone_fd, mut beeper) = fake_device(&mut core, Role::Tone);
        assert_eq!(core.tone_fd(), Some(tone_fd));

        beeper
            .write_all(&InputRecord::sound(SND_TONE, 1000).to_bytes())
            .unwrap();
        core.wait_and_dispatch(500).unwrap();
        assert_eq!(actions(&core), &[Action::EmitTone]);

        core.remove_device(tone_fd);
        assert_eq!(core.tone_fd(), None);
        assert!(core.registry().contains(keyboard_fd));
    }

    #[test]
    fn test_add_tone_device_requires_tone_role() {
        let mut core = core_in(temp_dir("tone-refused"));
        let (ours, mut peer) = UnixStream::pair().unwrap();
        let handle = DeviceHandle::new(OwnedFd::from(ours), Role::Keyboard, "not-a-beeper");

        assert!(!core.add_tone_device(handle));
        assert_eq!(core.tone_fd(), None);
        assert!(core.registry().is_empty());

        // The refused handle was closed
        let mut buf = [0u8; 1];
        assert!(matches!(std::io::Read::read(&mut peer, &mut buf), Ok(0)));
    }

    #[test]
    fn test_registry_full_closes_extra_device() {
        let mut core = core_in(temp_dir("full"));
        let mut kernels = Vec::new();
        for _ in 0..core.registry().capacity() {
            kernels.push(fake_device(&mut core, Role::Keyboard));
        }

        let (ours, mut peer) = UnixStream::pair().unwrap();
        assert!(!core.add_device(DeviceHandle::new(OwnedFd::from(ours), Role::Keyboard, "extra")));
        assert_eq!(core.device_count(), core.registry().capacity());

        // The rejected descriptor was closed
        let mut buf = [0u8; 1];
        assert_eq!(std::io::Read::read(&mut peer, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_remove_twice_is_harmless() {
        let mut core = core_in(temp_dir("remove"));
        let (fd, _kernel) = fake_device(&mut core, Role::Keyboard);
        core.remove_device(fd);
        core.remove_device(fd);
        assert!(core.registry().is_empty());
    }

    #[test]
    fn test_discover_skips_non_device_nodes() {
        let dir = temp_dir("discover");
        // Regular files named like event nodes cannot be probed
        std::fs::write(dir.join("event0"), b"").unwrap();
        std::fs::write(dir.join("event3"), b"").unwrap();

        let mut core = core_in(dir);
        assert_eq!(core.discover(), 0);
        assert!(core.registry().is_empty());
    }

    // =========================================================================
    // Hot-plug
    // =========================================================================

    #[test]
    fn test_init_registers_watcher() {
        let mut core = core_in(temp_dir("init"));
        assert_eq!(core.init(None), 0);

        let watcher_fd = core.watcher().unwrap().fd().unwrap();
        assert!(core.registry().contains(watcher_fd));
        assert_eq!(core.registry().role_of(watcher_fd), Some(Role::Unclassified));
    }

    #[test]
    fn test_hotplug_notification_is_processed() {
        let dir = temp_dir("hotplug");
        let mut core = core_in(dir.clone());
        core.start_watcher().unwrap();

        std::fs::write(dir.join("mouse0"), b"").unwrap();
        std::fs::write(dir.join("event4"), b"").unwrap();

        assert_eq!(core.wait_and_dispatch(500).unwrap(), 1);
        // Neither file is a real event device, so only the watcher remains
        assert_eq!(core.device_count(), 1);
        assert!(!core.watcher().unwrap().is_lost());
    }

    #[test]
    fn test_watcher_fault_disables_hotplug() {
        let dir = temp_dir("lost");
        let mut core = core_in(dir.clone());
        core.start_watcher().unwrap();
        let watcher_fd = core.watcher().unwrap().fd().unwrap();

        core.apply(&[ReadyEvent::fault(watcher_fd)]);
        assert!(core.watcher().unwrap().is_lost());
        assert!(!core.registry().contains(watcher_fd));

        // Later creations are never delivered
        std::fs::write(dir.join("event1"), b"").unwrap();
        assert_eq!(core.wait_and_dispatch(50).unwrap(), 0);
        assert!(core.registry().is_empty());
    }

    #[test]
    fn test_device_events_drained_before_hotplug() {
        let dir = temp_dir("order");
        let mut core = core_in(dir.clone());
        core.start_watcher().unwrap();
        let watcher_fd = core.watcher().unwrap().fd().unwrap();
        let (fd, mut kernel) = fake_device(&mut core, Role::Keyboard);

        kernel.write_all(&InputRecord::key(keys::KEY_BRIGHTNESSUP, 1).to_bytes()).unwrap();
        std::fs::write(dir.join("event2"), b"").unwrap();

        // Watcher reported first; the device is still handled in this cycle
        core.apply(&[ReadyEvent::readable(watcher_fd), ReadyEvent::readable(fd)]);
        assert_eq!(actions(&core), &[Action::StepDisplayBrightness(Direction::Up)]);
        assert_eq!(core.device_count(), 2);
    }
}
