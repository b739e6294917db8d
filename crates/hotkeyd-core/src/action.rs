// Hotkeyd Actions
// Hardware actions produced by hotkey dispatch and the actuator seam

use std::fmt;

use crate::inhibit::InhibitState;

/// Step direction for brightness and volume actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Up,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Down => write!(f, "down"),
            Direction::Up => write!(f, "up"),
        }
    }
}

/// A named effect forwarded to an external actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    StepDisplayBrightness(Direction),
    ToggleMute,
    StepVolume(Direction),
    StepKeyboardBrightness(Direction),
    ToggleKeyboardBacklight,
    EjectMedia,
    EmitTone,
}

impl Action {
    /// Invoke the matching actuator method
    pub fn apply<A: Actuators + ?Sized>(self, actuators: &mut A, inhibit: &InhibitState) {
        match self {
            Action::StepDisplayBrightness(dir) => actuators.step_display_brightness(dir),
            Action::ToggleMute => actuators.toggle_audio_mute(),
            Action::StepVolume(dir) => actuators.step_volume(dir),
            Action::StepKeyboardBrightness(dir) => {
                actuators.step_keyboard_brightness(dir, inhibit)
            }
            Action::ToggleKeyboardBacklight => actuators.toggle_keyboard_backlight(inhibit),
            Action::EjectMedia => actuators.eject_media(),
            Action::EmitTone => actuators.emit_tone(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::StepDisplayBrightness(dir) => write!(f, "display brightness {}", dir),
            Action::ToggleMute => write!(f, "audio mute"),
            Action::StepVolume(dir) => write!(f, "audio {}", dir),
            Action::StepKeyboardBrightness(dir) => write!(f, "keyboard backlight {}", dir),
            Action::ToggleKeyboardBacklight => write!(f, "keyboard backlight toggle"),
            Action::EjectMedia => write!(f, "CD eject"),
            Action::EmitTone => write!(f, "beep"),
        }
    }
}

/// Hardware drivers the dispatcher forwards actions to.
///
/// Keyboard backlight actions receive the current inhibit state; honouring
/// it is the actuator's job.
pub trait Actuators {
    fn step_display_brightness(&mut self, direction: Direction);
    fn step_keyboard_brightness(&mut self, direction: Direction, inhibit: &InhibitState);
    fn toggle_keyboard_backlight(&mut self, inhibit: &InhibitState);
    fn toggle_audio_mute(&mut self);
    fn step_volume(&mut self, direction: Direction);
    fn eject_media(&mut self);
    fn emit_tone(&mut self);

    /// Any key press or repeat; restarts backlight idle timers
    fn key_activity(&mut self) {}
}
