//! Radbuzz - E-bike Dashboard
//!
//! Host build of the dashboard: the core handlers and the map tile cache
//! run on worker threads against a directory cold store and a real tile
//! server, fed by a ride simulator instead of the GPS receiver, phone and
//! motor controller.
//!
//! Usage: `radbuzz [CONFIG]`. Log filtering follows `RUST_LOG`.

use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use radbuzz_core::handlers::{
    BleHandler, BuzzerHandler, GpsReader, SpeedometerHandler, TelemetryHandler,
};
use radbuzz_core::tile::TileFetcher;

use crate::channels::{init_shared, Shared};
use crate::config::{load_config, AppConfig};
use crate::platform::{
    DirFilesystem, LoggingBleServer, LoggingPin, LoggingStepper, PngTileDecoder,
    ReqwestHttpClient,
};
use crate::tasks::{run_ride, spawn_worker, Dashboard};

mod channels;
mod config;
mod platform;
mod tasks;

/// Timeout of a single tile download
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn main() -> ExitCode {
    init_tracing();

    let config_path = env::args_os().nth(1).map(PathBuf::from);
    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    tracing::info!("Radbuzz starting...");

    let shared = init_shared(config.tiles.capacity());
    spawn_workers(shared, config)?;

    run_ride(shared, &config.simulator);
    Ok(())
}

/// Start every worker on its own thread
fn spawn_workers(shared: &'static Shared, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let fetcher = TileFetcher::new(
        &shared.tiles,
        &shared.state,
        config.tiles.clone(),
        DirFilesystem::new(&config.data_dir),
        ReqwestHttpClient::new(HTTP_TIMEOUT)?,
        PngTileDecoder,
    );
    spawn_worker("tile-fetcher", fetcher, shared.tiles.wakeup())?;

    let gps = GpsReader::new(&shared.state, &shared.gps, config.tiles.zoom);
    spawn_worker("gps", gps, shared.gps.wakeup())?;

    let ble = BleHandler::new(
        LoggingBleServer::default(),
        &shared.state,
        &shared.images,
        &shared.ble,
    );
    spawn_worker("ble", ble, shared.ble.wakeup())?;

    let telemetry = TelemetryHandler::new(&shared.state, &shared.telemetry);
    spawn_worker("telemetry", telemetry, shared.telemetry.wakeup())?;

    let speedometer =
        SpeedometerHandler::new(LoggingStepper::default(), &shared.state, config.speedometer);
    let wakeup = speedometer.wakeup();
    spawn_worker("speedometer", speedometer, wakeup)?;

    let buzzer = BuzzerHandler::new(
        LoggingPin::new("left"),
        LoggingPin::new("right"),
        &shared.state,
        config.buzzer,
    );
    let wakeup = buzzer.wakeup();
    spawn_worker("buzzer", buzzer, wakeup)?;

    let dashboard = Dashboard::new(&shared.state, &shared.tiles, &shared.images);
    let wakeup = dashboard.wakeup();
    spawn_worker("dashboard", dashboard, wakeup)?;

    tracing::info!("workers started");
    Ok(())
}
