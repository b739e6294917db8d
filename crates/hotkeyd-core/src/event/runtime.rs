// Hotkeyd Event Runtime
// Device lifecycle and the single-threaded wait/dispatch step

use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

use super::dispatch::{DispatchConfig, EventDispatcher};
use super::hotplug::{open_node, HotplugWatcher, EVDEV_PREFIX};
use super::poller::{EventLoopError, EventLoopResult, Poller, Readiness, ReadyEvent, ReadyList};
use crate::action::Actuators;
use crate::device::{DeviceHandle, DeviceRegistry, ProbedDevice, Role, EVDEV_MAX};
use crate::inhibit::InhibitState;
use crate::input::{ClassifierConfig, DeviceClassifier, DeviceIdentity, Platform, EVENT_RECORD_SIZE};

/// Directory holding event device nodes
pub const EVDEV_DIR: &str = "/dev/input";

/// Upper bound for one wait, in milliseconds
pub const LOOP_TIMEOUT_MS: i32 = 200;

/// Settings the core is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub evdev_dir: PathBuf,
    pub timeout_ms: i32,
    pub classifier: ClassifierConfig,
    pub dispatch: DispatchConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            evdev_dir: PathBuf::from(EVDEV_DIR),
            timeout_ms: LOOP_TIMEOUT_MS,
            classifier: ClassifierConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

/// A probed node and the role it would get, for device listings
#[derive(Debug, Clone)]
pub struct DeviceReport {
    pub path: PathBuf,
    pub name: String,
    pub identity: DeviceIdentity,
    pub role: Option<Role>,
}

/// Owns every open descriptor, the epoll instance and the hot-plug watcher.
///
/// Registry membership and epoll registration always change together.
pub struct EvdevCore<P, A> {
    registry: DeviceRegistry,
    poller: Poller,
    watcher: Option<HotplugWatcher>,
    classifier: DeviceClassifier<P>,
    dispatcher: EventDispatcher<A>,
    evdev_dir: PathBuf,
    timeout_ms: i32,
}

impl<P: Platform, A: Actuators> EvdevCore<P, A> {
    pub fn new(platform: P, actuators: A, config: CoreConfig) -> EventLoopResult<Self> {
        let table = crate::input::PlatformTable::for_target();
        Ok(Self {
            registry: DeviceRegistry::new(),
            poller: Poller::new()?,
            watcher: None,
            classifier: DeviceClassifier::new(platform, table, config.classifier),
            dispatcher: EventDispatcher::new(actuators, config.dispatch),
            evdev_dir: config.evdev_dir,
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn watcher(&self) -> Option<&HotplugWatcher> {
        self.watcher.as_ref()
    }

    pub fn dispatcher(&self) -> &EventDispatcher<A> {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut EventDispatcher<A> {
        &mut self.dispatcher
    }

    pub fn inhibit(&self) -> &InhibitState {
        self.dispatcher.inhibit()
    }

    /// Descriptor of the registered tone generator, if any
    pub fn tone_fd(&self) -> Option<RawFd> {
        self.registry
            .iter()
            .find(|handle| handle.role() == Role::Tone)
            .map(DeviceHandle::fd)
    }

    pub fn device_count(&self) -> usize {
        self.registry.len()
    }

    /// Startup: scan existing nodes, add the tone device, then start
    /// watching for new nodes. Returns the number of devices added.
    pub fn init(&mut self, tone: Option<DeviceHandle>) -> usize {
        let mut ndevs = self.discover();
        log::debug!("Found {} devices", ndevs);

        if let Some(tone) = tone {
            if self.add_tone_device(tone) {
                ndevs += 1;
            }
        }

        if let Err(e) = self.start_watcher() {
            log::error!("{}", e);
        }

        ndevs
    }

    fn node_path(&self, index: usize) -> PathBuf {
        self.evdev_dir.join(format!("{}{}", EVDEV_PREFIX, index))
    }

    /// Try `event0` through `event{EVDEV_MAX - 1}`
    pub fn discover(&mut self) -> usize {
        let mut ndevs = 0;
        for i in 0..EVDEV_MAX {
            let Some(probed) = open_node(&self.node_path(i)) else {
                continue;
            };
            if self.try_add(probed) {
                ndevs += 1;
            }
        }
        ndevs
    }

    /// Classify a freshly opened node and register it if it is ours.
    /// Refused nodes are closed.
    pub fn try_add(&mut self, probed: ProbedDevice) -> bool {
        log::debug!("Investigating evdev [{}]", probed.name);

        match self.classifier.classify(&probed.identity, probed.capabilities) {
            Some(role) => self.add_device(probed.into_handle(role)),
            None => false,
        }
    }

    /// Register the tone generator. The handle must carry `Role::Tone`,
    /// which is what tells it apart from then on.
    pub fn add_tone_device(&mut self, handle: DeviceHandle) -> bool {
        if handle.role() != Role::Tone {
            log::warn!("Refusing {} device {} as beeper", handle.role(), handle.name());
            return false;
        }
        self.add_device(handle)
    }

    /// Start the hot-plug watcher on the event device directory
    pub fn start_watcher(&mut self) -> EventLoopResult<()> {
        let (watcher, fd) = HotplugWatcher::init(&self.evdev_dir)?;
        if !self.add_device(DeviceHandle::new(fd, Role::Unclassified, "inotify")) {
            return Err(EventLoopError::Watcher(
                "Failed to add inotify fd to epoll".to_string(),
            ));
        }
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Take ownership of `handle`, storing it and watching it for input.
    ///
    /// On failure the handle is closed and both sets are left unchanged.
    pub fn add_device(&mut self, handle: DeviceHandle) -> bool {
        let fd = handle.fd();
        let role = handle.role();

        if let Err(e) = self.registry.add(handle) {
            // The rejected handle is closed when `e` drops
            log::warn!("{}", e);
            return false;
        }

        if let Err(e) = self.poller.register(fd) {
            log::error!("Could not add device to epoll: {}", e);
            self.registry.remove(fd);
            return false;
        }

        log::debug!("Registered {} device on fd {}", role, fd);
        true
    }

    /// Stop watching `fd` and close it. Unknown descriptors are ignored.
    pub fn remove_device(&mut self, fd: RawFd) {
        if !self.registry.contains(fd) {
            return;
        }
        if let Err(e) = self.poller.deregister(fd) {
            log::error!("Could not remove device from epoll: {}", e);
        }
        self.registry.remove(fd);
    }

    /// First phase of a step: wait for readiness
    pub fn collect_ready(&self, timeout_ms: i32) -> EventLoopResult<ReadyList> {
        self.poller.wait(timeout_ms)
    }

    /// Second phase of a step: handle every ready descriptor in order, then
    /// at most one hot-plug batch
    pub fn apply(&mut self, ready: &[ReadyEvent]) {
        let mut hotplug_pending = false;

        for event in ready {
            let is_watcher = self.watcher.as_ref().is_some_and(|w| w.is_watcher_fd(event.fd));

            match event.readiness {
                // Some event devices cease to exist when suspending
                Readiness::Fault => {
                    log::info!("Error condition signaled on event device");

                    if self.registry.role_of(event.fd) == Some(Role::Tone) {
                        log::warn!("Beeper device lost; this should not happen");
                    }
                    if is_watcher {
                        log::warn!("inotify fd lost; this should not happen");
                        if let Some(w) = self.watcher.as_mut() {
                            w.mark_lost();
                        }
                    }

                    self.remove_device(event.fd);
                }
                Readiness::Readable if is_watcher => hotplug_pending = true,
                Readiness::Readable => self.process_device(event.fd),
            }
        }

        if hotplug_pending {
            self.process_hotplug();
        }
    }

    /// One bounded wait plus dispatch of everything it reported.
    ///
    /// Returns the number of ready descriptors; errors are fatal.
    pub fn wait_and_dispatch(&mut self, timeout_ms: i32) -> EventLoopResult<usize> {
        let ready = self.collect_ready(timeout_ms)?;
        self.apply(&ready);
        Ok(ready.len())
    }

    /// `wait_and_dispatch` with the configured timeout
    pub fn step(&mut self) -> EventLoopResult<usize> {
        self.wait_and_dispatch(self.timeout_ms)
    }

    fn process_device(&mut self, fd: RawFd) {
        if !self.registry.contains(fd) {
            return;
        }

        let mut buf = [0u8; EVENT_RECORD_SIZE];
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            log::debug!("read on fd {} failed: {}", fd, std::io::Error::last_os_error());
            return;
        }

        self.dispatcher.dispatch(&buf[..n as usize]);
    }

    fn process_hotplug(&mut self) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };

        for path in watcher.read_candidates() {
            if let Some(probed) = open_node(&path) {
                self.try_add(probed);
            }
        }
    }

    /// Probe every node in the event directory without registering anything
    /// or running platform hooks
    pub fn list_devices(&self) -> Vec<DeviceReport> {
        let mut reports = Vec::new();
        for i in 0..EVDEV_MAX {
            let path = self.node_path(i);
            let Some(probed) = open_node(&path) else {
                continue;
            };
            reports.push(DeviceReport {
                role: self.classifier.identify(&probed.identity, probed.capabilities),
                identity: probed.identity,
                name: probed.name,
                path,
            });
        }
        reports
    }

    pub fn evdev_dir(&self) -> &Path {
        &self.evdev_dir
    }
}
