//! Integration tests for configuration system

use loopcam_core::config::{sample_config, ConfigFile, DeliveryPolicy, SessionConfig, WriteMode};
use loopcam_core::{DeviceSelection, LoopcamError, PixelFormat};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_session_config_builder() {
    let config = SessionConfig::new(1920, 1080, 60)
        .with_devices(["/dev/video0", "/dev/video1"])
        .with_format(PixelFormat::Bgr)
        .with_policy(DeliveryPolicy::All)
        .with_write_mode(WriteMode::Parallel)
        .with_fps_logging(true);

    assert_eq!(config.resolution().pixels(), 1920 * 1080);
    assert_eq!(
        config.devices.to_list(),
        Some(vec!["/dev/video0".to_string(), "/dev/video1".to_string()])
    );
    assert_eq!(config.policy, DeliveryPolicy::All);
    assert_eq!(config.write_mode, WriteMode::Parallel);
    assert!(config.log_fps);
    assert!(config.validate().is_ok());
}

#[test]
fn test_frame_interval() {
    let config = SessionConfig::new(640, 480, 20);
    let interval = config.frame_interval();
    assert!(interval.abs_diff(Duration::from_millis(50)) < Duration::from_micros(1));
}

#[test]
fn test_single_device_normalizes_to_list() {
    let config = SessionConfig::new(640, 480, 30).with_devices("/dev/video5");
    assert_eq!(config.devices, DeviceSelection::Single("/dev/video5".into()));
    assert_eq!(config.devices.to_list(), Some(vec!["/dev/video5".to_string()]));
}

#[test]
fn test_default_config_is_auto() {
    let config = SessionConfig::default();
    assert!(config.devices.is_auto());
    assert_eq!(config.devices.to_list(), None);
    assert_eq!(config.policy, DeliveryPolicy::Any);
    assert_eq!(config.write_mode, WriteMode::Sequential);
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_errors() {
    let cases = [
        SessionConfig::new(0, 0, 30),
        SessionConfig::new(640, 480, -1.0),
        SessionConfig::new(640, 480, 1e-20),
        SessionConfig::new(641, 480, 30),
        SessionConfig::new(640, 480, 30).with_devices(vec![""]),
        SessionConfig::new(640, 480, 30).with_devices(Vec::<String>::new()),
        SessionConfig::new(640, 480, 30)
            .with_devices(["/dev/video0", "/dev/video1"])
            .with_policy(DeliveryPolicy::AtLeast(3)),
        SessionConfig::new(640, 480, 30).with_policy(DeliveryPolicy::AtLeast(2)),
    ];

    for config in cases {
        assert!(
            matches!(config.validate(), Err(LoopcamError::Config(_))),
            "{:?} should be rejected",
            config
        );
    }
}

#[test]
fn test_passthrough_allows_odd_width() {
    let config = SessionConfig::new(641, 481, 30).with_format(PixelFormat::Gray);
    assert!(config.validate().is_ok());

    let config = SessionConfig::new(641, 480, 30).with_format(PixelFormat::Nv12);
    assert!(config.validate().is_err());
}

#[test]
fn test_config_file_save_and_load() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");

    let mut config = ConfigFile::default();
    config.defaults.width = 1920;
    config.defaults.height = 1080;
    config.defaults.fps = 24.0;
    config.output.devices = vec!["/dev/video2".into(), "/dev/video3".into()];
    config.output.policy = "all".into();
    config.output.write_mode = "parallel".into();

    config
        .save_to(config_path.clone())
        .expect("Failed to save config");

    let loaded = ConfigFile::load_from(config_path).expect("Failed to load config");
    assert_eq!(loaded, config);

    let session = loaded.to_session_config().unwrap();
    assert_eq!(session.width, 1920);
    assert_eq!(session.fps.as_f64(), 24.0);
    assert_eq!(session.policy, DeliveryPolicy::All);
    assert_eq!(session.write_mode, WriteMode::Parallel);
    assert_eq!(
        session.devices,
        DeviceSelection::List(vec!["/dev/video2".into(), "/dev/video3".into()])
    );
}

#[test]
fn test_config_file_creates_parent_dirs() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("nested").join("loopcam").join("config.toml");

    ConfigFile::default()
        .save_to(config_path.clone())
        .expect("Failed to save config");
    assert!(config_path.exists());
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let result = ConfigFile::load_from("/nonexistent/path/config.toml".into());
    assert_eq!(result.unwrap(), ConfigFile::default());
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[defaults]\nwidth = \"wide\"\n").unwrap();

    let err = ConfigFile::load_from(config_path).unwrap_err();
    assert!(matches!(err, LoopcamError::Config(_)));
}

#[test]
fn test_partial_config_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "[output]\npolicy = \"at-least:2\"\n").unwrap();

    let loaded = ConfigFile::load_from(config_path).unwrap();
    assert_eq!(loaded.defaults.width, 1280);
    assert_eq!(loaded.output.policy, "at-least:2");

    let session = loaded.to_session_config().unwrap();
    assert_eq!(session.policy, DeliveryPolicy::AtLeast(2));
    assert!(session.devices.is_auto());

    // Auto selection opens a single device, so two can never be reached
    assert!(matches!(session.validate(), Err(LoopcamError::Config(_))));
}

#[test]
fn test_bad_policy_in_file() {
    let mut config = ConfigFile::default();
    config.output.policy = "most".into();
    assert!(matches!(
        config.to_session_config(),
        Err(LoopcamError::Config(_))
    ));
}

#[test]
fn test_sample_config_roundtrip() {
    let config: ConfigFile = toml::from_str(&sample_config()).expect("sample should parse");
    let session = config.to_session_config().unwrap();
    assert_eq!(session.devices, DeviceSelection::Single("/dev/video0".into()));
    assert_eq!(session.format, PixelFormat::Rgb);
}
