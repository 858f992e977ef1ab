// Integration tests for configuration loading
//
// Defaults must match the shipped config file, and values from a file
// override only the keys they set.

use anyhow::Result;
use audio_first::Config;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_missing_file_uses_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let cfg = Config::load(&dir.path().join("absent").display().to_string())?;

    assert_eq!(cfg.recording.sample_rate, 44100);
    assert_eq!(cfg.recording.channels, 1);
    assert_eq!(cfg.recording.tick_interval(), Duration::from_secs(1));
    assert_eq!(cfg.recording.permission_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.recording.open_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.recording.finalize_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.recording.max_caption_chars, 280);

    assert_eq!(cfg.playback.load_timeout(), Duration::from_secs(15));
    assert_eq!(cfg.playback.position_interval(), Duration::from_millis(250));

    assert_eq!(cfg.waveform.bar_count, 40);
    assert_eq!(cfg.waveform.floor, 0.2);
    assert_eq!(cfg.waveform.seed, None);

    Ok(())
}

#[test]
fn test_shipped_config_matches_defaults() -> Result<()> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/audio-first");
    let shipped = Config::load(path)?;
    let defaults = Config::default();

    assert_eq!(shipped.recording.sample_rate, defaults.recording.sample_rate);
    assert_eq!(
        shipped.recording.recordings_path,
        defaults.recording.recordings_path
    );
    assert_eq!(
        shipped.playback.load_timeout_ms,
        defaults.playback.load_timeout_ms
    );
    assert_eq!(shipped.waveform.bar_count, defaults.waveform.bar_count);
    assert_eq!(shipped.waveform.settle_ms, defaults.waveform.settle_ms);

    Ok(())
}

#[test]
fn test_file_overrides_selected_keys() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[recording]
recordings_path = "/tmp/audio-first-test"
sample_rate = 16000

[waveform]
bar_count = 12
seed = 99
"#,
    )?;

    let cfg = Config::load(&path.display().to_string())?;

    assert_eq!(cfg.recording.sample_rate, 16000);
    assert_eq!(
        cfg.recording.recordings_dir(),
        std::path::PathBuf::from("/tmp/audio-first-test")
    );
    // Unset keys keep their defaults
    assert_eq!(cfg.recording.channels, 1);
    assert_eq!(cfg.playback.position_interval_ms, 250);

    assert_eq!(cfg.waveform.bar_count, 12);
    assert_eq!(cfg.waveform.seed, Some(99));

    Ok(())
}

#[test]
fn test_recordings_dir_expands_tilde() {
    let cfg = Config::default();
    let dir = cfg.recording.recordings_dir();

    assert!(!dir.starts_with("~"));
    assert!(dir.ends_with(".local/share/audio-first/recordings"));
}

#[test]
fn test_zero_intervals_are_clamped() {
    let mut cfg = Config::default();
    cfg.recording.tick_interval_ms = 0;
    cfg.playback.position_interval_ms = 0;

    assert_eq!(cfg.recording.tick_interval(), Duration::from_millis(1));
    assert_eq!(cfg.playback.position_interval(), Duration::from_millis(1));
}
