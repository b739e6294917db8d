// Hotkeyd Daemon
// Laptop hotkey handler driving the event core until signalled

use std::fs::OpenOptions;
use std::os::fd::OwnedFd;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use hotkeyd_core::{
    Actuators, DeviceHandle, Direction, EvdevCore, InhibitState, PlatformTable, Role, Settings,
    SignaturePlatform,
};

/// Laptop hotkey handler
#[derive(Parser, Debug)]
#[command(name = "hotkeyd")]
#[command(version)]
#[command(about = "Laptop hotkey handler daemon", long_about = None)]
struct Args {
    /// TOML settings file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate settings and exit
    #[arg(long)]
    check_config: bool,

    /// Classify the present event devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Print a default settings file and exit
    #[arg(long)]
    print_default_config: bool,
}

/// Actuators that report each action. The backlight, audio and eject
/// drivers hook in here.
#[derive(Debug, Default)]
struct LogActuators;

/// Comma-separated list of the active inhibit reasons
fn inhibit_reasons(inhibit: &InhibitState) -> String {
    inhibit
        .reasons()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Actuators for LogActuators {
    fn step_display_brightness(&mut self, direction: Direction) {
        log::info!("LCD backlight {}", direction);
    }

    fn step_keyboard_brightness(&mut self, direction: Direction, inhibit: &InhibitState) {
        if inhibit.is_inhibited() {
            log::debug!(
                "Keyboard backlight {} suppressed ({})",
                direction,
                inhibit_reasons(inhibit)
            );
            return;
        }
        log::info!("Keyboard backlight {}", direction);
    }

    fn toggle_keyboard_backlight(&mut self, inhibit: &InhibitState) {
        if inhibit.is_inhibited() {
            log::debug!("Keyboard backlight toggle suppressed ({})", inhibit_reasons(inhibit));
            return;
        }
        log::info!("Keyboard backlight toggle");
    }

    fn toggle_audio_mute(&mut self) {
        log::info!("Audio mute toggle");
    }

    fn step_volume(&mut self, direction: Direction) {
        log::info!("Audio volume {}", direction);
    }

    fn eject_media(&mut self) {
        log::info!("CD eject");
    }

    fn emit_tone(&mut self) {
        log::info!("Beep");
    }
}

/// Main application state
struct Application {
    settings: Settings,
    args: Args,
    /// Flag to signal event loop to stop
    running: Arc<AtomicBool>,
}

impl Application {
    fn new(args: Args) -> anyhow::Result<Self> {
        let settings = match &args.config {
            Some(path) => Settings::from_file(path)
                .with_context(|| format!("could not load {}", path.display()))?,
            None => Settings::load_default().context("could not load settings")?,
        };

        Ok(Self {
            settings,
            args,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    fn build_core(&self) -> anyhow::Result<EvdevCore<SignaturePlatform, LogActuators>> {
        let table = PlatformTable::for_target();
        let platform = SignaturePlatform::new(table.keyboards).with_fn_mode(self.settings.fn_mode());
        EvdevCore::new(platform, LogActuators, self.settings.core_config())
            .context("could not create event core")
    }

    /// Open the configured tone generator node, if any
    fn open_beeper(&self) -> Option<DeviceHandle> {
        if !self.settings.beep_enabled {
            return None;
        }
        let path = self.settings.beep_device.as_ref()?;

        match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => Some(DeviceHandle::new(OwnedFd::from(file), Role::Tone, "beeper")),
            Err(e) => {
                log::warn!("Could not open beeper device {}: {}", path.display(), e);
                None
            }
        }
    }

    fn check_config(&self) {
        match self.settings.source_path() {
            Some(path) => println!("Configuration {} is valid", path.display()),
            None => println!("No configuration file found, defaults are valid"),
        }
    }

    fn list_devices(&self) -> anyhow::Result<()> {
        let core = self.build_core()?;
        let reports = core.list_devices();
        println!("Found {} event device(s):", reports.len());
        for report in &reports {
            let role = report
                .role
                .map(|r| r.to_string())
                .unwrap_or_else(|| "ignored".to_string());
            println!(
                "  {}: {} [{}] -> {}",
                report.path.display(),
                report.name,
                report.identity,
                role
            );
        }
        Ok(())
    }

    fn install_signal_handler(&self) -> anyhow::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM]).context("could not install signal handler")?;
        let running = self.running.clone();

        std::thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                log::info!("Received signal {}, shutting down", signal);
                running.store(false, Ordering::SeqCst);
            }
        });
        Ok(())
    }

    /// Run the main event loop
    fn run(&self) -> anyhow::Result<()> {
        self.install_signal_handler()?;

        let mut core = self.build_core()?;
        let ndevs = core.init(self.open_beeper());
        log::info!("Monitoring {} device(s) in {}", ndevs, core.evdev_dir().display());

        while self.running.load(Ordering::SeqCst) {
            core.step().context("event loop failed")?;
        }

        log::info!("Exiting");
        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", hotkeyd_core::settings::default_settings_content());
        return Ok(());
    }

    init_logging(args.verbose);

    let app = Application::new(args)?;

    if app.args.check_config {
        app.check_config();
        return Ok(());
    }

    if app.args.list_devices {
        return app.list_devices();
    }

    app.run()
}
