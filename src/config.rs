//! Driver configuration, TOML-loadable the same way `ControlConfig` loads
//! `config.toml` in this codebase's other config surface.

use serde::Deserialize;
use std::path::Path;

/// Maximum encoded LDM payload size (spec.md §4.5).
pub const MAXSIZE: usize = 4000;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DriverConfig {
    /// Device path or loopback URL for the serial port.
    pub serial_url: String,
    /// Initial line rate.
    #[serde(default = "default_baudrate")]
    pub serial_baudrate: u32,
    /// Try to upgrade the radio to 57600 baud after open.
    #[serde(default)]
    pub change_baudrate: bool,
    /// Let the radio handle air-retries itself, via `SetAutoRepeat` during
    /// `Radio::setup`; no local effect on the send state machine's own
    /// retry behavior.
    #[serde(default)]
    pub retry_sending: bool,
    /// Per-write ack wait, seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Max wait for the channel to become free, seconds.
    #[serde(default = "default_channel_timeout_secs")]
    pub channel_timeout_secs: u64,
    /// Per-chunk reassembly wait, seconds.
    #[serde(default = "default_receive_timeout_secs")]
    pub receive_timeout_secs: u64,
    /// Pre-declared topic names; each becomes a topic queue at construction.
    #[serde(default)]
    pub listeners: Vec<String>,
    /// If false, skip the zlib stage of the pickle pipeline.
    #[serde(default = "default_true")]
    pub compression: bool,
    /// Pre-send settle delay the radio's front panel needs between writes, seconds.
    #[serde(default = "default_write_pause_secs")]
    pub write_pause_secs: f64,
    /// Outer (communicator-level) retry budget; 0 disables outer retries.
    #[serde(default)]
    pub max_outer_retries: u32,
    #[serde(default = "default_backoff_min_ms")]
    pub outer_retry_backoff_min_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub outer_retry_backoff_max_ms: u64,
    /// Gate the start-call/end-call nudge used to wake a stuck channel.
    #[serde(default = "default_true")]
    pub wake_sequence_enabled: bool,
    /// Channel hysteresis after going free, seconds.
    #[serde(default = "default_free_threshold_secs")]
    pub free_threshold_secs: u64,
    /// Force-free watchdog silence window, seconds.
    #[serde(default = "default_force_threshold_secs")]
    pub force_threshold_secs: u64,
}

fn default_baudrate() -> u32 {
    9600
}
fn default_confirmation_timeout_secs() -> u64 {
    60
}
fn default_channel_timeout_secs() -> u64 {
    60
}
fn default_receive_timeout_secs() -> u64 {
    60
}
fn default_write_pause_secs() -> f64 {
    5.0
}
fn default_backoff_min_ms() -> u64 {
    2000
}
fn default_backoff_max_ms() -> u64 {
    10000
}
fn default_free_threshold_secs() -> u64 {
    4
}
fn default_force_threshold_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

impl DriverConfig {
    /// Load configuration from a TOML file.
    pub fn load(config_path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(config_path).map_err(|e| format!("Failed to read config file: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_minimal_config_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "serial-url = \"/dev/ttyUSB0\"\n").unwrap();

        let cfg = DriverConfig::load(&path).unwrap();
        assert_eq!(cfg.serial_url, "/dev/ttyUSB0");
        assert_eq!(cfg.serial_baudrate, 9600);
        assert_eq!(cfg.confirmation_timeout_secs, 60);
        assert!(cfg.compression);
        assert!(cfg.wake_sequence_enabled);
        assert_eq!(cfg.max_outer_retries, 0);
    }

    #[test]
    fn load_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "serial-url = \"/dev/ttyUSB0\"\nserial-baudrate = 57600\nlisteners = [\"about-you\"]\ncompression = false\n",
        )
        .unwrap();

        let cfg = DriverConfig::load(&path).unwrap();
        assert_eq!(cfg.serial_baudrate, 57600);
        assert_eq!(cfg.listeners, vec!["about-you".to_string()]);
        assert!(!cfg.compression);
    }

    #[test]
    fn load_missing_file_errors() {
        let err = DriverConfig::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }
}
