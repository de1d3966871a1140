//! List devices command

use anyhow::Result;
use loopcam_core::output::{is_loopback_device, MAX_VIDEO_NODES};
use std::path::Path;

/// List video nodes and mark the v4l2loopback outputs
pub async fn list() -> Result<()> {
    println!("Loopcam - Video Devices\n");

    let nodes = tokio::task::spawn_blocking(|| {
        (0..MAX_VIDEO_NODES)
            .map(|i| format!("/dev/video{}", i))
            .filter(|path| Path::new(path).exists())
            .map(|path| {
                let loopback = is_loopback_device(&path);
                (path, loopback)
            })
            .collect::<Vec<_>>()
    })
    .await?;

    if nodes.is_empty() {
        println!("No video devices found.");
        println!("\nCreate loopback devices with:");
        println!("  sudo modprobe v4l2loopback devices=2");
        return Ok(());
    }

    println!("{:<16} {:<12}", "Device", "Type");
    println!("{}", "-".repeat(28));

    for (path, loopback) in &nodes {
        println!("{}", device_row(path, *loopback));
    }

    let loopback_count = nodes.iter().filter(|(_, loopback)| *loopback).count();
    if loopback_count == 0 {
        println!("\nNo v4l2loopback devices found. Load the module with:");
        println!("  sudo modprobe v4l2loopback devices=2");
    } else {
        println!("\n{} loopback device(s) found.", loopback_count);
        println!("Use 'loopcam cast -d <device>' to send a test pattern.");
    }

    Ok(())
}

fn device_row(path: &str, loopback: bool) -> String {
    let kind = if loopback { "loopback" } else { "other" };
    format!("{:<16} {:<12}", path, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_row_columns() {
        let row = device_row("/dev/video2", true);
        assert!(row.starts_with("/dev/video2 "));
        assert_eq!(row.split_whitespace().collect::<Vec<_>>(), ["/dev/video2", "loopback"]);

        let row = device_row("/dev/video0", false);
        assert_eq!(row.split_whitespace().collect::<Vec<_>>(), ["/dev/video0", "other"]);
    }
}
