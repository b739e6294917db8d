// Hotkeyd Input Layer - Raw Event Records
// Fixed-size input_event decoding and the event codes we react to

use std::mem::size_of;

use super::identity::EventCategory;

/// Size of one `struct input_event` as read from an event device
pub const EVENT_RECORD_SIZE: usize = size_of::<libc::input_event>();

const TIME_SIZE: usize = size_of::<libc::timeval>();

/// Key codes from input-event-codes.h
pub mod keys {
    pub const KEY_MENU: u16 = 139;
    pub const KEY_MUTE: u16 = 113;
    pub const KEY_VOLUMEDOWN: u16 = 114;
    pub const KEY_VOLUMEUP: u16 = 115;
    pub const KEY_EJECTCD: u16 = 161;
    pub const KEY_NEXTSONG: u16 = 163;
    pub const KEY_PLAYPAUSE: u16 = 164;
    pub const KEY_PREVIOUSSONG: u16 = 165;
    pub const KEY_BRIGHTNESSDOWN: u16 = 224;
    pub const KEY_BRIGHTNESSUP: u16 = 225;
    pub const KEY_SWITCHVIDEOMODE: u16 = 227;
    pub const KEY_KBDILLUMTOGGLE: u16 = 228;
    pub const KEY_KBDILLUMDOWN: u16 = 229;
    pub const KEY_KBDILLUMUP: u16 = 230;
}

pub const SW_LID: u16 = 0x00;
pub const SND_TONE: u16 = 0x02;

/// Key event value, as reported in `input_event.value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum KeyState {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl KeyState {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Release),
            1 => Some(KeyState::Press),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }
}

/// The type/code/value triple of an input event; the timestamp is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRecord {
    pub kind: u16,
    pub code: u16,
    pub value: i32,
}

impl InputRecord {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    pub fn key(code: u16, value: i32) -> Self {
        Self::new(EventCategory::Key.code(), code, value)
    }

    pub fn switch(code: u16, value: i32) -> Self {
        Self::new(EventCategory::Switch.code(), code, value)
    }

    pub fn sound(code: u16, value: i32) -> Self {
        Self::new(EventCategory::Sound.code(), code, value)
    }

    pub fn category(&self) -> Option<EventCategory> {
        EventCategory::from_code(self.kind)
    }

    /// Decode one record. Anything but exactly one full record is refused.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != EVENT_RECORD_SIZE {
            return None;
        }

        let body = &bytes[TIME_SIZE..];
        Some(Self {
            kind: u16::from_ne_bytes([body[0], body[1]]),
            code: u16::from_ne_bytes([body[2], body[3]]),
            value: i32::from_ne_bytes([body[4], body[5], body[6], body[7]]),
        })
    }

    /// Encode with a zero timestamp, in the layout `decode` expects
    pub fn to_bytes(&self) -> [u8; EVENT_RECORD_SIZE] {
        let mut out = [0u8; EVENT_RECORD_SIZE];
        out[TIME_SIZE..TIME_SIZE + 2].copy_from_slice(&self.kind.to_ne_bytes());
        out[TIME_SIZE + 2..TIME_SIZE + 4].copy_from_slice(&self.code.to_ne_bytes());
        out[TIME_SIZE + 4..TIME_SIZE + 8].copy_from_slice(&self.value.to_ne_bytes());
        out
    }
}
