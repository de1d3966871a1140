//! Cast command - send a test pattern to virtual cameras

use anyhow::{Context, Result};
use clap::Args;
use loopcam_core::{
    config::{ConfigFile, DeliveryPolicy, WriteMode},
    CameraSession, FrameRate, LoopcamError, PixelFormat, SessionConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

/// Hue change per frame, in degrees
const HUE_STEP: f32 = 2.0;

/// Arguments for the cast command
#[derive(Args)]
pub struct CastArgs {
    /// Output device; repeat for several cameras (default: from config, else auto)
    #[arg(short, long = "device")]
    devices: Vec<String>,

    /// Frame width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Frames per second
    #[arg(short, long)]
    fps: Option<f64>,

    /// Delivery policy (best-effort, any, all, at-least:N)
    #[arg(short, long)]
    policy: Option<String>,

    /// Write to the devices in parallel
    #[arg(long)]
    parallel: bool,

    /// Stop after this many frames
    #[arg(short = 'n', long)]
    frames: Option<u64>,

    /// Log the measured frame rate
    #[arg(long)]
    log_fps: bool,
}

/// Open a session and send a hue-cycling pattern until interrupted
pub async fn cast(args: CastArgs) -> Result<()> {
    println!("Loopcam - Starting Cast\n");

    let config = build_config(&args)?;

    println!("Configuration:");
    println!("  Resolution:  {}", config.resolution());
    println!("  Framerate:   {}", config.fps);
    println!("  Devices:     {}", config.devices);
    println!("  Policy:      {}", config.policy);
    println!("  Write mode:  {}", config.write_mode);
    println!();

    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = stop.clone();
    let limit = args.frames;

    let worker = tokio::task::spawn_blocking(move || run_pattern(config, worker_stop, limit));

    tokio::select! {
        result = signal::ctrl_c() => {
            result.context("Failed to listen for Ctrl+C")?;
            println!("\nReceived interrupt signal...");
            stop.store(true, Ordering::SeqCst);
        }
        _ = wait_for(&stop) => {}
    }

    let frames = worker.await.context("Cast worker panicked")??;
    println!("Cast stopped after {} frames.", frames);

    Ok(())
}

async fn wait_for(stop: &AtomicBool) {
    while !stop.load(Ordering::SeqCst) {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

/// Merge command-line flags over the config file
///
/// The pattern is generated as RGB whatever format the file names.
fn build_config(args: &CastArgs) -> Result<SessionConfig> {
    let mut config = ConfigFile::load_or_default()
        .to_session_config()
        .context("Config file has invalid values")?
        .with_format(PixelFormat::Rgb);

    if !args.devices.is_empty() {
        config = config.with_devices(args.devices.clone());
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    if let Some(fps) = args.fps {
        config.fps = FrameRate::new(fps);
    }
    if let Some(ref policy) = args.policy {
        let policy: DeliveryPolicy = policy.parse().map_err(|e: String| anyhow::anyhow!(e))?;
        config.policy = policy;
    }
    if args.parallel {
        config.write_mode = WriteMode::Parallel;
    }
    if args.log_fps {
        config.log_fps = true;
    }

    Ok(config)
}

/// Blocking frame loop; returns the number of frames sent
fn run_pattern(config: SessionConfig, stop: Arc<AtomicBool>, limit: Option<u64>) -> Result<u64> {
    let mut cam = match CameraSession::open(config) {
        Ok(cam) => cam,
        Err(e) => {
            stop.store(true, Ordering::SeqCst);
            if let Some(hint) = e.user_hint() {
                eprintln!("Hint: {}", hint);
            }
            return Err(e).context("Failed to open camera session");
        }
    };

    println!("Casting to {}", cam.device_label());
    println!("Press Ctrl+C to stop...\n");

    let mut frame = vec![0u8; cam.frame_size()];
    let mut hue = 0.0f32;
    let mut sent = 0u64;

    while !stop.load(Ordering::SeqCst) && limit.is_none_or(|n| sent < n) {
        let color = hsv_to_rgb(hue, 1.0, 1.0);
        for pixel in frame.chunks_exact_mut(3) {
            pixel.copy_from_slice(&color);
        }

        match cam.send(&frame) {
            Ok(_) => {}
            Err(e @ LoopcamError::Delivery { .. }) => warn!("{}", e),
            Err(e) => {
                stop.store(true, Ordering::SeqCst);
                return Err(e).context("Failed to send frame");
            }
        }
        sent += 1;
        hue = (hue + HUE_STEP) % 360.0;
        cam.sleep_until_next_frame();
    }

    info!("{}", cam.stats().format_line());
    cam.close();
    stop.store(true, Ordering::SeqCst);
    Ok(sent)
}

/// Convert HSV (hue in degrees) to RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0..60 => (c, x, 0.0),
        60..120 => (x, c, 0.0),
        120..180 => (0.0, c, x),
        180..240 => (0.0, x, c),
        240..300 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_byte = |f: f32| ((f + m) * 255.0).round() as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), [255, 0, 0]);
        assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), [0, 255, 0]);
        assert_eq!(hsv_to_rgb(240.0, 1.0, 1.0), [0, 0, 255]);
        assert_eq!(hsv_to_rgb(60.0, 1.0, 1.0), [255, 255, 0]);
    }

    #[test]
    fn test_hsv_gray() {
        assert_eq!(hsv_to_rgb(200.0, 0.0, 0.5), [128, 128, 128]);
    }
}
