//! Heads-Up Posture Monitor - Main Entry Point

use camera_capture::{list_video_devices, VideoFrame};
use clap::{Parser, Subcommand};
use display_queue::display_queue;
use pipeline::{
    build_worker, init_logging, run_display, AppConfig, CaptureController, DisplayTicker,
    ScaledPreview,
};
use recorder::latest_clip;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "heads-up", author, version, about = "Posture monitor with alarm and clip recording")]
struct Cli {
    /// Configuration file (default: ./heads-up.toml when present)
    #[arg(long, global = true, env = "HEADSUP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor posture from a frame source (default)
    Run {
        /// Source locator, overrides camera.source
        #[arg(long)]
        source: Option<String>,
    },
    /// Print the newest recorded clip
    Latest {
        /// Look in the good-posture archive instead of poor-posture clips
        #[arg(long)]
        good: bool,
    },
    /// List video device nodes
    Devices,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run { source: None }) {
        Command::Run { source } => {
            if let Some(source) = source {
                config.camera.source = source;
            }
            init_logging(config.level()?)?;
            run(config).await?;
        }
        Command::Latest { good } => {
            let dir = if good {
                &config.recorder.good_dir
            } else {
                &config.recorder.poor_dir
            };
            match latest_clip(dir) {
                Some(path) => println!("{}", path.display()),
                None => println!("No recordings in {}", dir.display()),
            }
        }
        Command::Devices => {
            let devices = list_video_devices();
            if devices.is_empty() {
                println!("No video devices found");
            }
            for device in devices {
                println!("{}", device.display());
            }
        }
    }

    Ok(())
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("=== Heads-Up v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting posture monitor on {}", config.camera.source);

    let (producer, consumer) = display_queue::<VideoFrame>(config.display.capacity);
    let source = config.camera.open()?;
    let worker = build_worker(&config, source, producer)?;
    let token = worker.token();

    let mut controller = CaptureController::new(config.display.restart_grace());
    controller.start(worker)?;

    let preview = ScaledPreview::new(config.display.scale, config.display.preview_path.clone());
    let mut ticker = DisplayTicker::new(consumer, preview);

    tokio::select! {
        rendered = run_display(&mut ticker, config.display.interval(), &token) => {
            info!("Capture finished, {} frames displayed", rendered);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, stopping capture");
        }
    }

    if let Some(report) = controller.stop()? {
        info!(
            "Worker exit {:?}: {} frames, {} alarms, {} poor clips kept",
            report.exit, report.frames, report.recorder.alarms, report.recorder.poor_kept
        );
    }

    Ok(())
}
