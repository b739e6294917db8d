// Hotkeyd Core Library
// Event device discovery, classification and hotkey dispatch

pub mod action;
pub mod device;
pub mod event;
pub mod inhibit;
pub mod input;
pub mod settings;

pub use action::{Action, Actuators, Direction};
pub use device::{DeviceHandle, DeviceRegistry, RegistryError, Role};
pub use event::{
    CoreConfig, DispatchConfig, EvdevCore, EventDispatcher, EventLoopError, EventLoopResult,
    HotplugWatcher,
};
pub use inhibit::{InhibitReason, InhibitState};
pub use input::{
    CapabilitySet, ClassifierConfig, DeviceClassifier, DeviceIdentity, EventCategory, InputRecord,
    Platform, PlatformTable, SignaturePlatform,
};
pub use settings::{Settings, SettingsError};
