//! distguide CLI
//!
//! Usage:
//!   distguide                                  # Serve WS/HTTP on 127.0.0.1:8765
//!   distguide --replay trace.json              # Serve, camera replayed from a trace
//!   distguide --replay trace.json --screen-size 24   # One local session, print ticks
//!   distguide --screen-size 24 --json          # JSON tick output

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, Level};

use distguide::config::AppConfig;
use distguide::core::{
    run_server, AppState, CalibrationSession, DeviceProvider, ReplayProvider, Trace,
};
use distguide::error::CalibrationError;
use distguide::types::TickOutput;
use distguide::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "distguide",
    version = VERSION,
    about = "Guide a subject to the correct viewing distance before a screen test",
    long_about = "distguide estimates distance from the apparent width of the subject's face\n\
                  and guides them into range for the screen under test.\n\n\
                  Phases:\n  \
                  TUNE       - Operator adjusts focal length, then locks\n  \
                  GUIDE      - Subject moves closer/farther until in range\n  \
                  COUNTDOWN  - Subject holds still; 5s continuous hold confirms\n\n\
                  A caller sends the screen size in inches over WS /calibrate\n\
                  and receives CALIBRATION_OK or CALIBRATION_ABANDONED."
)]
struct Args {
    /// Run as WebSocket/HTTP server (default when --screen-size is absent)
    #[arg(short, long)]
    serve: bool,

    /// Server address (overrides the config file)
    #[arg(long)]
    addr: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay camera frames and key presses from a JSON trace
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Run a single local session for this screen size (inches)
    #[arg(long, allow_hyphen_values = true)]
    screen_size: Option<f64>,

    /// Output ticks as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .with_ansi(!args.no_color)
        .init();

    if args.no_color {
        colored::control::set_override(false);
    }

    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    if let Some(addr) = &args.addr {
        config.server.addr = addr.clone();
    }

    let provider = match load_provider(&args) {
        Ok(provider) => provider,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let result = match args.screen_size {
        Some(screen_size) if !args.serve => run_local(&args, config, provider, screen_size).await,
        _ => run_serve(config, provider).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Replay provider from --replay, or a camera that reports itself unavailable
fn load_provider(args: &Args) -> Result<ReplayProvider, CalibrationError> {
    match &args.replay {
        Some(path) => {
            let trace = Trace::load(path)?;
            info!(path = ?path, frames = trace.frames.len(), "replaying trace");
            Ok(ReplayProvider::new(trace))
        }
        None => {
            info!("no capture backend configured; sessions will fail until --replay is given");
            Ok(ReplayProvider::new(Trace::unavailable()))
        }
    }
}

/// Run one session in-process and print every tick
async fn run_local(
    args: &Args,
    config: AppConfig,
    provider: ReplayProvider,
    screen_size: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session =
        CalibrationSession::new(config.calibration, provider.devices()).with_tick_observer(tx);
    let handle = tokio::task::spawn_blocking(move || session.start(screen_size)).await??;

    println!(
        "Screen {:.1}in → ideal distance {:.0}cm",
        screen_size,
        handle.ideal_distance_cm()
    );

    while let Some(tick) = rx.recv().await {
        print_tick(&tick, args)?;
    }

    let outcome = handle.outcome().await?;
    println!("{}", outcome.token());
    Ok(())
}

fn print_tick(tick: &TickOutput, args: &Args) -> Result<(), serde_json::Error> {
    if args.json {
        println!("{}", serde_json::to_string(tick)?);
    } else if args.no_color {
        println!("{}", tick.to_parseable_string());
    } else {
        println!("{}", tick.to_terminal_string());
    }
    Ok(())
}

/// Run WebSocket/HTTP server
async fn run_serve(
    config: AppConfig,
    provider: ReplayProvider,
) -> Result<(), Box<dyn std::error::Error>> {
    info!(version = VERSION, "distguide calibration server");
    let state = Arc::new(AppState::new(config.calibration, Arc::new(provider)));
    run_server(&config.server.addr, state).await
}
