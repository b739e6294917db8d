// Hotkeyd Settings Module
// Loads the configuration surface the event core depends on

use std::path::{Path, PathBuf};

use crate::event::{CoreConfig, DispatchConfig, EVDEV_DIR, LOOP_TIMEOUT_MS};
use crate::input::{ClassifierConfig, FnMode};

/// Settings for hotkeyd
///
/// Loaded from a TOML file (default: ~/.config/hotkeyd/settings.toml, then
/// /etc/hotkeyd.toml). Missing sections keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Keyboard backlight hardware is present
    pub kbd_backlight: bool,

    /// Backlight comes on automatically in the dark; the toggle key then
    /// only inhibits it
    pub kbd_auto_on: bool,

    /// Function-key mode to set when a keyboard needing it is found
    pub fnmode: Option<u8>,

    pub fnmode_path: PathBuf,

    pub appleir_enabled: bool,

    pub beep_enabled: bool,

    /// Tone generator device node
    pub beep_device: Option<PathBuf>,

    pub evdev_dir: PathBuf,

    pub timeout_ms: i32,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    keyboard: Option<KeyboardSettings>,

    #[serde(default)]
    appleir: Option<AppleIrSettings>,

    #[serde(default)]
    beep: Option<BeepSettings>,

    #[serde(default)]
    evdev: Option<EvdevSettings>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct KeyboardSettings {
    #[serde(default)]
    backlight: Option<bool>,
    #[serde(default)]
    auto_on: Option<bool>,
    #[serde(default)]
    fnmode: Option<i64>,
    #[serde(default)]
    fnmode_path: Option<PathBuf>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct AppleIrSettings {
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct BeepSettings {
    #[serde(default)]
    enabled: Option<bool>,
    #[serde(default)]
    device: Option<PathBuf>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct EvdevSettings {
    #[serde(default)]
    dir: Option<PathBuf>,
    #[serde(default)]
    timeout_ms: Option<i64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    pub const SYSTEM_PATH: &'static str = "/etc/hotkeyd.toml";

    /// Create settings with every default
    pub fn new() -> Self {
        Self {
            kbd_backlight: false,
            kbd_auto_on: false,
            fnmode: None,
            fnmode_path: PathBuf::from(FnMode::DEFAULT_PATH),
            appleir_enabled: false,
            beep_enabled: false,
            beep_device: None,
            evdev_dir: PathBuf::from(EVDEV_DIR),
            timeout_ms: LOOP_TIMEOUT_MS,
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let parsed: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(keyboard) = parsed.keyboard {
            if let Some(backlight) = keyboard.backlight {
                settings.kbd_backlight = backlight;
            }
            if let Some(auto_on) = keyboard.auto_on {
                settings.kbd_auto_on = auto_on;
            }
            if let Some(fnmode) = keyboard.fnmode {
                settings.fnmode = Some(parse_fnmode(fnmode)?);
            }
            if let Some(path) = keyboard.fnmode_path {
                settings.fnmode_path = path;
            }
        }

        if let Some(appleir) = parsed.appleir {
            settings.appleir_enabled = appleir.enabled.unwrap_or(false);
        }

        if let Some(beep) = parsed.beep {
            settings.beep_enabled = beep.enabled.unwrap_or(false);
            settings.beep_device = beep.device;
        }

        if let Some(evdev) = parsed.evdev {
            if let Some(dir) = evdev.dir {
                settings.evdev_dir = dir;
            }
            if let Some(timeout) = evdev.timeout_ms {
                settings.timeout_ms = parse_timeout(timeout)?;
            }
        }

        if settings.beep_enabled && settings.beep_device.is_none() {
            return Err(SettingsError::InvalidValue(
                "beep.enabled requires beep.device".to_string(),
            ));
        }

        Ok(settings)
    }

    /// Get the per-user settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hotkeyd").join("settings.toml"))
    }

    /// Load from the per-user location, then the system one; defaults if
    /// neither exists
    pub fn load_default() -> Result<Self, SettingsError> {
        let candidates = Self::default_path()
            .into_iter()
            .chain(std::iter::once(PathBuf::from(Self::SYSTEM_PATH)));

        for path in candidates {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::new())
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            ir_enabled: self.appleir_enabled,
            has_kbd_backlight: self.kbd_backlight,
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            has_kbd_backlight: self.kbd_backlight,
            auto_on: self.kbd_auto_on,
        }
    }

    pub fn fn_mode(&self) -> Option<FnMode> {
        self.fnmode.map(|value| FnMode {
            path: self.fnmode_path.clone(),
            value,
        })
    }

    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            evdev_dir: self.evdev_dir.clone(),
            timeout_ms: self.timeout_ms,
            classifier: self.classifier_config(),
            dispatch: self.dispatch_config(),
        }
    }
}

fn parse_fnmode(value: i64) -> Result<u8, SettingsError> {
    match value {
        1 | 2 => Ok(value as u8),
        _ => Err(SettingsError::InvalidValue(format!(
            "keyboard.fnmode must be 1 or 2, got {}",
            value
        ))),
    }
}

fn parse_timeout(value: i64) -> Result<i32, SettingsError> {
    if (1..=60_000).contains(&value) {
        Ok(value as i32)
    } else {
        Err(SettingsError::InvalidValue(format!(
            "evdev.timeout_ms must be between 1 and 60000, got {}",
            value
        )))
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# hotkeyd settings
# Place this file at: ~/.config/hotkeyd/settings.toml or /etc/hotkeyd.toml

[keyboard]
# Keyboard backlight hardware present
backlight = false
# Backlight turns on automatically; the toggle key inhibits it instead
auto_on = false
# Function key mode for keyboards that need it (1 or 2)
# fnmode = 2

[appleir]
enabled = false

[beep]
enabled = false
# device = "/dev/input/by-id/beeper"

[evdev]
dir = "/dev/input"
timeout_ms = 200
"#
}
