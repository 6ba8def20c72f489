//! Record a session on the synthetic platform.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use screenrec_capture_engine::{
    CaptureConfiguration, ControllerConfig, DirectoryExporter, SessionController, SessionState,
};
use screenrec_common::clock::format_elapsed;
use screenrec_common::config::{parse_resolution, AppConfig};
use screenrec_platform_core::HeadlessPreview;
use screenrec_platform_synthetic::{ChunkPlan, SyntheticPlatform};

/// Flags that override the configured recording defaults.
pub struct RecordArgs {
    pub resolution: Option<String>,
    pub fps: Option<u32>,
    pub bitrate_kbps: Option<u32>,
    pub no_system_audio: bool,
    pub microphone: bool,
    pub output: Option<PathBuf>,
    pub duration_secs: Option<u64>,
}

fn capture_config(config: &AppConfig, args: &RecordArgs) -> anyhow::Result<CaptureConfiguration> {
    let mut capture = CaptureConfiguration::from_defaults(&config.recording)?;
    if let Some(resolution) = args.resolution.as_deref() {
        let (width, height) = parse_resolution(resolution)?;
        capture.width = width;
        capture.height = height;
    }
    if let Some(fps) = args.fps {
        capture.frame_rate = fps;
    }
    if let Some(kbps) = args.bitrate_kbps {
        capture.target_bitrate_kbps = kbps;
    }
    if args.no_system_audio {
        capture.include_system_audio = false;
    }
    if args.microphone {
        capture.include_microphone = true;
    }
    Ok(capture)
}

pub async fn run(config: AppConfig, args: RecordArgs) -> anyhow::Result<()> {
    let capture = capture_config(&config, &args)?;
    let output = args.output.clone().unwrap_or_else(|| config.output_dir.clone());

    println!("Starting recording session");
    println!("  Output: {}", output.display());
    println!("  Resolution: {}x{}", capture.width, capture.height);
    println!("  FPS: {}", capture.frame_rate);
    println!("  Bitrate: {} kbps", capture.effective_bitrate_kbps());
    println!("  System audio: {}", capture.include_system_audio);
    println!("  Mic: {}", capture.include_microphone);
    println!();

    tracing::debug!(output = %output.display(), "Exporting recordings to directory");
    let synthetic = SyntheticPlatform::builder()
        .chunks(ChunkPlan::Bitrate)
        .exporter(Arc::new(DirectoryExporter::new(&output)))
        .build();
    let handle = SessionController::spawn(
        synthetic.platform(),
        Box::new(HeadlessPreview::new()),
        ControllerConfig::from_defaults(&config.recording),
    );

    handle.start(capture).await?;
    let mut updates = handle.subscribe();

    match args.duration_secs {
        Some(secs) => println!("Recording for {secs}s (Ctrl+C stops early)..."),
        None => println!("Press Ctrl+C to stop recording..."),
    }
    println!();

    let deadline = async {
        match args.duration_secs {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let mut last_line = String::new();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
            _ = &mut deadline => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    anyhow::bail!("Recording controller stopped unexpectedly");
                }
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.state == SessionState::Idle {
                    println!("{}", snapshot.status);
                    break;
                }
                let line = format!(
                    "{:<10} {}  {}",
                    snapshot.status, snapshot.elapsed_label, snapshot.size_label
                );
                if line != last_line {
                    println!("{line}");
                    last_line = line;
                }
            }
        }
    }

    println!();
    let elapsed = handle.latest().elapsed;
    let stopped = handle.stop_and_wait().await?;
    let snapshot = handle.snapshot().await?;
    handle.shutdown().await?;

    let Some(link) = stopped.or_else(|| snapshot.downloads.first().cloned()) else {
        anyhow::bail!("No recording was produced: {}", snapshot.status);
    };
    println!(
        "Recording saved to: {} ({}, {})",
        link.url.trim_start_matches("file://"),
        link.mime_type,
        snapshot.size_label
    );
    println!("Duration: {}", format_elapsed(elapsed));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RecordArgs {
        RecordArgs {
            resolution: None,
            fps: None,
            bitrate_kbps: None,
            no_system_audio: false,
            microphone: false,
            output: None,
            duration_secs: None,
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = AppConfig::default();
        let capture = capture_config(
            &config,
            &RecordArgs {
                resolution: Some("1280x720".to_string()),
                fps: Some(60),
                bitrate_kbps: Some(500),
                no_system_audio: true,
                microphone: true,
                ..args()
            },
        )
        .unwrap();

        assert_eq!((capture.width, capture.height), (1280, 720));
        assert_eq!(capture.frame_rate, 60);
        assert_eq!(capture.effective_bitrate_kbps(), 1000);
        assert!(!capture.include_system_audio);
        assert!(capture.include_microphone);
    }

    #[test]
    fn test_defaults_come_from_config() {
        let capture = capture_config(&AppConfig::default(), &args()).unwrap();
        assert_eq!((capture.width, capture.height), (1920, 1080));
        assert_eq!(capture.target_bitrate_kbps, 12_000);
        assert!(capture.include_system_audio);
    }

    #[test]
    fn test_bad_resolution_is_rejected() {
        let result = capture_config(
            &AppConfig::default(),
            &RecordArgs {
                resolution: Some("wide".to_string()),
                ..args()
            },
        );
        assert!(result.is_err());
    }
}
