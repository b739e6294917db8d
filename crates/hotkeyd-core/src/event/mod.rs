// Hotkeyd Event Handling
// Readiness multiplexing, hot-plug discovery and event dispatch

pub mod dispatch;
pub mod hotplug;
pub mod poller;
pub mod runtime;

pub use dispatch::{DispatchConfig, EventDispatcher};
pub use hotplug::{parse_notifications, HotplugWatcher, Notification, EVDEV_PREFIX};
pub use poller::{
    EventLoopError, EventLoopResult, Poller, Readiness, ReadyEvent, ReadyList, MAX_EPOLL_EVENTS,
};
pub use runtime::{CoreConfig, DeviceReport, EvdevCore, EVDEV_DIR, LOOP_TIMEOUT_MS};
