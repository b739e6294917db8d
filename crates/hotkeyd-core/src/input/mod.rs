// Hotkeyd Input Layer
// Device identity, classification and raw event decoding

pub mod classifier;
pub mod event;
pub mod identity;
pub mod signature;

pub use classifier::{ClassifierConfig, DeviceClassifier, FnMode, Platform, SignaturePlatform};
pub use event::{InputRecord, KeyState, EVENT_RECORD_SIZE};
pub use identity::{CapabilitySet, DeviceIdentity, EventCategory};
pub use signature::{PlatformTable, Signature};
