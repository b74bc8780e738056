//! Gamegirl joypad daemon.
//!
//! Entry point and lifecycle: load config, configure the board lines,
//! register the virtual controller, then hand everything to the sampling
//! loop. Every error that reaches this level is fatal.

mod buttons;
mod config;
mod engine;
mod lines;
mod pacer;
mod platform;

use std::process::ExitCode;

use config::Config;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("gamegirl-joypad v{}", env!("CARGO_PKG_VERSION"));

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_os = "linux")]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    use engine::{Engine, TICK_PERIOD};
    use lines::LineRegistry;
    use pacer::Pacer;
    use platform::linux::{create_line_io, create_virtual_pad};
    use platform::shutdown::create_shutdown_requester;

    let config = Config::load(&Config::default_path())?;

    let mut io = create_line_io(&config.expander)?;
    let registry = LineRegistry::new();
    registry.configure(io.as_mut())?;

    let mut pad = create_virtual_pad()?;
    let mut shutdown = create_shutdown_requester(&config.shutdown)?;

    if !config.combos.enabled {
        log::info!("engine: select combos disabled");
    }
    let mut engine = Engine::new(registry, config.combos.enabled);
    let toggles = engine.toggles();
    log::info!(
        "engine: wifi {}, amplifier {}",
        if toggles.wifi_enabled { "on" } else { "off" },
        if toggles.amp_enabled { "on" } else { "off" }
    );
    let mut pacer = Pacer::new(TICK_PERIOD);

    match engine.run(io.as_mut(), pad.as_mut(), shutdown.as_mut(), &mut pacer) {
        Ok(never) => match never {},
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(target_os = "linux"))]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let _ = Config::default_path();
    Err("gamegirl-joypad requires Linux (uinput and Raspberry Pi GPIO)".into())
}
