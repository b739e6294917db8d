// Hotkeyd Event Dispatch
// Turns raw input records into actions and inhibit state changes

use crate::action::{Action, Actuators, Direction};
use crate::inhibit::{InhibitReason, InhibitState};
use crate::input::event::{keys, SND_TONE, SW_LID};
use crate::input::{EventCategory, InputRecord, KeyState};

/// Configuration surface consumed by the dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchConfig {
    pub has_kbd_backlight: bool,
    /// With auto-on, the backlight toggle key flips the user inhibit reason
    /// instead of the backlight power
    pub auto_on: bool,
}

/// What a key code is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyBinding {
    Fire(Action),
    /// Keyboard backlight keys, ignored without backlight hardware
    Backlight(Action),
    /// Recognized but produces nothing
    Inert(&'static str),
}

fn key_binding(code: u16) -> Option<KeyBinding> {
    use KeyBinding::*;

    let binding = match code {
        keys::KEY_BRIGHTNESSDOWN => Fire(Action::StepDisplayBrightness(Direction::Down)),
        keys::KEY_BRIGHTNESSUP => Fire(Action::StepDisplayBrightness(Direction::Up)),
        keys::KEY_MUTE => Fire(Action::ToggleMute),
        keys::KEY_VOLUMEDOWN => Fire(Action::StepVolume(Direction::Down)),
        keys::KEY_VOLUMEUP => Fire(Action::StepVolume(Direction::Up)),
        keys::KEY_SWITCHVIDEOMODE => Inert("video toggle"),
        keys::KEY_KBDILLUMTOGGLE => Backlight(Action::ToggleKeyboardBacklight),
        keys::KEY_KBDILLUMDOWN => Backlight(Action::StepKeyboardBrightness(Direction::Down)),
        keys::KEY_KBDILLUMUP => Backlight(Action::StepKeyboardBrightness(Direction::Up)),
        keys::KEY_EJECTCD => Fire(Action::EjectMedia),
        keys::KEY_NEXTSONG => Inert("IR fast forward"),
        keys::KEY_PREVIOUSSONG => Inert("IR rewind"),
        keys::KEY_PLAYPAUSE => Inert("IR play/pause"),
        keys::KEY_MENU => Inert("IR menu"),
        _ => return None,
    };
    Some(binding)
}

/// Decodes raw events and drives the actuators.
pub struct EventDispatcher<A> {
    actuators: A,
    inhibit: InhibitState,
    config: DispatchConfig,
}

impl<A: Actuators> EventDispatcher<A> {
    pub fn new(actuators: A, config: DispatchConfig) -> Self {
        Self {
            actuators,
            inhibit: InhibitState::new(),
            config,
        }
    }

    pub fn inhibit(&self) -> &InhibitState {
        &self.inhibit
    }

    pub fn inhibit_mut(&mut self) -> &mut InhibitState {
        &mut self.inhibit
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn actuators_mut(&mut self) -> &mut A {
        &mut self.actuators
    }

    /// Dispatch one raw read. Reads that are not exactly one event record
    /// are dropped without touching any state.
    pub fn dispatch(&mut self, raw: &[u8]) -> Option<Action> {
        let record = InputRecord::decode(raw)?;
        self.dispatch_record(record)
    }

    /// Dispatch a decoded record, returning the action fired, if any
    pub fn dispatch_record(&mut self, record: InputRecord) -> Option<Action> {
        match record.category()? {
            EventCategory::Key => self.handle_key(record.code, record.value),
            EventCategory::Sound => self.handle_sound(record.code, record.value),
            EventCategory::Switch => {
                self.handle_switch(record.code, record.value);
                None
            }
            _ => None,
        }
    }

    fn handle_key(&mut self, code: u16, value: i32) -> Option<Action> {
        // Releases never drive anything
        if KeyState::from_i32(value) == Some(KeyState::Release) {
            return None;
        }

        // Any key activity resets the idle timer, bound or not
        self.inhibit.clear(InhibitReason::IdleTimeout);
        self.actuators.key_activity();

        let action = match key_binding(code)? {
            KeyBinding::Inert(what) => {
                log::debug!("KEY: {}", what);
                return None;
            }
            KeyBinding::Backlight(_) if !self.config.has_kbd_backlight => return None,
            KeyBinding::Backlight(Action::ToggleKeyboardBacklight) if self.config.auto_on => {
                log::debug!("KEY: keyboard backlight user inhibit toggle");
                self.inhibit.toggle(InhibitReason::UserToggle);
                return None;
            }
            KeyBinding::Fire(action) | KeyBinding::Backlight(action) => action,
        };

        log::debug!("KEY: {}", action);
        self.fire(action)
    }

    fn handle_sound(&mut self, code: u16, value: i32) -> Option<Action> {
        if code != SND_TONE || value <= 0 {
            return None;
        }
        log::debug!("BEEP: BEEP!");
        self.fire(Action::EmitTone)
    }

    fn handle_switch(&mut self, code: u16, value: i32) {
        if code != SW_LID {
            return;
        }
        if value != 0 {
            log::debug!("LID: closed");
            self.inhibit.set(InhibitReason::LidClosed);
        } else {
            log::debug!("LID: open");
            self.inhibit.clear(InhibitReason::LidClosed);
        }
    }

    fn fire(&mut self, action: Action) -> Option<Action> {
        action.apply(&mut self.actuators, &self.inhibit);
        Some(action)
    }
}
