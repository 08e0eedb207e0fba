//! Scanpoint CLI
//!
//! Command-line front end that runs real capture sessions against a
//! picked image file or a scripted camera.

use clap::{Parser, Subcommand};
use scanpoint::{
    capture::{
        toggle_facing, toggle_torch, Detection, FileConfig, FrameSource, MockFrameSource, Symbology,
    },
    decode::DecodeReport,
    metrics::ScanMetrics,
    session::{
        feed_frames, CaptureScreen, NavigationError, Notice, OpenedCapture, ScreenHandle, ScreenHost,
        ScreenState,
    },
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "scanpoint", version, about = "One-shot barcode and QR capture sessions")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a still image through a capture session
    Decode {
        /// Image file to decode
        image: PathBuf,
    },
    /// Drive a scripted camera through a capture session
    Simulate {
        /// Values the camera reports, each as a short burst of batches
        #[arg(long, value_delimiter = ',')]
        values: Vec<String>,
        /// Idle frames before the first value appears
        #[arg(long, default_value_t = 5)]
        lead_in: usize,
        /// Frame budget before the camera gives up
        #[arg(long, default_value_t = 100)]
        frames: u64,
        /// Switch to the other camera after opening
        #[arg(long)]
        flip: bool,
        /// Toggle the torch after opening
        #[arg(long)]
        torch: bool,
        /// Refuse camera permission
        #[arg(long)]
        deny_permission: bool,
    },
}

/// Prints notices to the terminal.
///
/// In one-shot mode a miss ends the session instead of waiting for the
/// user to try again.
struct ConsoleHost {
    show_attempts: bool,
    give_up: Option<ScreenHandle>,
}

impl ScreenHost for ConsoleHost {
    fn close_capture_screen(&mut self) -> Result<(), NavigationError> {
        info!("Capture screen closed");
        Ok(())
    }

    fn notify(&mut self, notice: Notice) {
        eprintln!("{notice}");
        if let (true, Some(handle)) = (ends_one_shot(&notice), &self.give_up) {
            if handle.cancel().is_err() {
                warn!("Capture screen already gone");
            }
        }
    }

    fn decode_finished(&mut self, report: &DecodeReport) {
        if self.show_attempts {
            eprintln!(
                "Attempts: {} ({}x{}, formats {:?})",
                report, report.width, report.height, report.formats
            );
        }
    }
}

/// Notices after which the screen re-arms and would wait for another try.
fn ends_one_shot(notice: &Notice) -> bool {
    matches!(
        notice,
        Notice::NoCodeFound { .. } | Notice::ImageLoadFailed(_) | Notice::ScanFailed(_)
    )
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Scanpoint v{}", scanpoint::VERSION);

    let config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(2);
            }
        },
        None => FileConfig::default(),
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(cli.command, config)) {
        Ok(Some(value)) => println!("{value}"),
        Ok(None) => {
            info!("Capture ended without a value");
            std::process::exit(3);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

async fn run(command: Command, config: FileConfig) -> Result<Option<String>, String> {
    let metrics = Arc::new(ScanMetrics::new().map_err(|e| e.to_string())?);
    let one_shot = matches!(command, Command::Decode { .. });

    let OpenedCapture {
        mut screen,
        handle,
        sink,
        pending,
    } = CaptureScreen::open(
        &config.scan,
        ConsoleHost {
            show_attempts: config.output.show_attempts,
            give_up: None,
        },
        Arc::clone(&metrics),
    );
    // The host only gets a handle once the screen exists.
    if one_shot {
        screen.host_mut().give_up = Some(handle.clone());
    }

    let ctrlc_handle = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if ctrlc_handle.cancel().is_err() {
            warn!("Capture screen already closed");
        }
    }) {
        warn!(error = %e, "Ctrl-C handler not installed");
    }

    let feeder = match command {
        Command::Decode { image } => {
            let bytes = std::fs::read(&image)
                .map_err(|e| format!("Failed to read {}: {}", image.display(), e))?;
            let file_name = image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            drop(sink);
            handle.pick_image(bytes, file_name).map_err(|e| e.to_string())?;
            None
        }
        Command::Simulate {
            values,
            lead_in,
            frames,
            flip,
            torch,
            deny_permission,
        } => {
            let mut source = MockFrameSource::with_script(script(&values, lead_in));
            if deny_permission {
                source = source.denying_permission();
            }
            let scan = config.scan.clone();
            let delay = Duration::from_millis(config.output.frame_delay_ms);
            let handle = handle.clone();
            Some(tokio::task::spawn_blocking(move || {
                if source.open(&scan).is_ok() {
                    if flip {
                        if let Err(e) = toggle_facing(&mut source) {
                            warn!(error = %e, "Could not switch camera");
                        }
                    }
                    if torch {
                        if let Err(e) = toggle_torch(&mut source) {
                            warn!(error = %e, "Could not toggle torch");
                        }
                    }
                    info!(facing = %source.facing(), torch = source.torch(), "Camera ready");
                }
                let outcome = feed_frames(&mut source, &scan, &sink, &handle, Some(frames), delay);
                if let Err(e) = &outcome {
                    warn!(error = %e, "Camera stopped");
                }
                // Running out of frames ends the session like a cancel.
                if !handle.is_closed() && handle.cancel().is_err() {
                    warn!("Capture screen already closed");
                }
                outcome
            }))
        }
    };
    drop(handle);

    let state = screen.run().await;
    if let ScreenState::Fulfilled(path) = state {
        info!(path = path.label(), "Capture screen finished");
    }
    if let Some(feeder) = feeder {
        if let Ok(Ok(summary)) = feeder.await {
            info!(
                frames = summary.frames,
                processed = summary.processed,
                dropped = summary.dropped,
                "Simulated camera summary"
            );
        }
    }

    let result = pending.wait().await;
    if config.output.dump_metrics {
        match metrics.encode() {
            Ok(text) => eprint!("{text}"),
            Err(e) => warn!(error = %e, "Metrics encoding failed"),
        }
    }
    Ok(result)
}

/// Idle frames, then three identical batches per value, as a camera held
/// over a label reports it.
fn script(values: &[String], lead_in: usize) -> Vec<Vec<Detection>> {
    let mut batches = vec![Vec::new(); lead_in];
    for value in values {
        for _ in 0..3 {
            batches.push(vec![Detection::new(value.clone(), Symbology::Qr)]);
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rearming_notices_end_one_shot() {
        assert!(ends_one_shot(&Notice::NoCodeFound { width: 4, height: 3 }));
        assert!(ends_one_shot(&Notice::ImageLoadFailed("bad header".to_string())));
        assert!(ends_one_shot(&Notice::ScanFailed("stack busy".to_string())));
        assert!(!ends_one_shot(&Notice::PermissionDenied));
    }
}
