use anyhow::{anyhow, Context, Result};
use clap::Parser;
use field_recorder::audio::{open_source, spawn_capture_thread};
use field_recorder::recording::{LedIndicator, LogIndicator, StatusIndicator};
use field_recorder::{
    create_router, AppState, Blinker, Config, DeviceClock, DirStorage, RecorderLoop,
    RecorderSettings, RecordingController,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(name = "field-recorder")]
#[command(about = "Record a raw PCM capture stream to WAV files under HTTP control")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/field-recorder")]
    config: String,

    /// Raw PCM input, overriding `capture.input` ("-" for stdin)
    #[arg(short, long)]
    input: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(input) = args.input {
        cfg.capture.input = input;
    }

    info!("Field Recorder v{}", env!("CARGO_PKG_VERSION"));
    info!("Device: {} ({})", cfg.device.name, cfg.device.serial_number);

    let storage = Arc::new(DirStorage::new(&cfg.storage.recordings_path)?);
    let clock = DeviceClock::new(cfg.clock.utc_offset_hours).context("Invalid clock config")?;
    let controller = RecordingController::new(RecorderSettings::from(&cfg), Arc::clone(&storage), clock);

    // Capture runs on its own thread; blocks reach the recorder loop via a channel
    let (block_tx, block_rx) = mpsc::channel(cfg.capture.queue_blocks.max(1));
    let source = open_source(&cfg.capture.input)
        .with_context(|| format!("Failed to open capture input: {}", cfg.capture.input))?;
    spawn_capture_thread(source, cfg.audio.block_size, block_tx)
        .context("Failed to spawn capture thread")?;

    let indicator: Box<dyn StatusIndicator> = match &cfg.indicator.led_path {
        Some(path) => Box::new(LedIndicator::new(path)),
        None => Box::new(LogIndicator::default()),
    };

    let (recorder_loop, recorder) = RecorderLoop::new(
        controller,
        block_rx,
        Blinker::new(indicator),
        Duration::from_millis(cfg.indicator.blink_interval_ms.max(1)),
    );
    let recorder_thread = recorder_loop
        .spawn_on_thread()
        .context("Failed to spawn recorder thread")?;

    let app = create_router(AppState::new(recorder, storage, cfg.device.clone()));

    let addr = format!("{}:{}", cfg.http.bind, cfg.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await
        .context("HTTP server failed")?;

    // The router (and with it the last RecorderHandle) is gone; the loop
    // finalizes any open recording and exits
    tokio::task::spawn_blocking(move || recorder_thread.join())
        .await?
        .map_err(|_| anyhow!("Recorder thread panicked"))?
        .context("Recorder runtime failed")?;

    Ok(())
}
