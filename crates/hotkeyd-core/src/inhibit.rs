// Hotkeyd Inhibit State
// Independent reasons suppressing keyboard backlight actions

use strum_macros::{Display, EnumIter};

/// Why the keyboard backlight is currently suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum InhibitReason {
    IdleTimeout,
    LidClosed,
    UserToggle,
}

impl InhibitReason {
    fn bit(self) -> u8 {
        match self {
            InhibitReason::IdleTimeout => 1 << 0,
            InhibitReason::LidClosed => 1 << 1,
            InhibitReason::UserToggle => 1 << 2,
        }
    }
}

/// Set of active inhibit reasons; inhibited while any reason is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InhibitState {
    reasons: u8,
}

impl InhibitState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, reason: InhibitReason) {
        self.reasons |= reason.bit();
    }

    pub fn clear(&mut self, reason: InhibitReason) {
        self.reasons &= !reason.bit();
    }

    pub fn toggle(&mut self, reason: InhibitReason) {
        self.reasons ^= reason.bit();
    }

    pub fn is_set(&self, reason: InhibitReason) -> bool {
        self.reasons & reason.bit() != 0
    }

    pub fn is_inhibited(&self) -> bool {
        self.reasons != 0
    }

    /// Currently active reasons
    pub fn reasons(&self) -> impl Iterator<Item = InhibitReason> + '_ {
        use strum::IntoEnumIterator;
        InhibitReason::iter().filter(|r| self.is_set(*r))
    }
}
