// Timeouts, periods, pin-level constants and the loadable runtime config
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

// Safety supervisor tick period
pub const SUPERVISOR_PERIOD: Duration = Duration::from_millis(500);

// Max age of a liveness timestamp before the watchdog forces a stop
pub const STALE_THRESHOLD: Duration = Duration::from_secs(3);

// Yield at the end of every event loop iteration
pub const LOOP_YIELD: Duration = Duration::from_millis(10);

// Max time the loop waits for a pending HTTP connection
pub const ACCEPT_TIMEOUT: Duration = Duration::from_millis(100);

// Horn pulse length (also used for the watchdog alert)
pub const HORN_PULSE: Duration = Duration::from_millis(200);

// Max bytes read from one HTTP request
pub const REQUEST_READ_LIMIT: usize = 1024;

// Speed applied at boot (percent)
pub const DEFAULT_SPEED_PERCENT: u8 = 50;

// PWM resolution: 10-bit duty (0..=1023)
pub const MAX_DUTY: u16 = 1023;
pub const PWM_FREQUENCY_HZ: u32 = 1000;

// Serial command channel
pub const SERIAL_BAUDRATE: u32 = 9600;
pub const SERIAL_TIMEOUT: Duration = Duration::from_millis(10);

// HTTP control endpoint
pub const HTTP_BIND: &str = "0.0.0.0:80";

/// Errors raised while loading or validating the runtime configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Runtime configuration
///
/// Every field has a default, so a config file only needs to list what it changes.
/// Durations are given in milliseconds in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(with = "millis")]
    pub supervisor_period: Duration,
    #[serde(with = "millis")]
    pub stale_threshold: Duration,
    #[serde(with = "millis")]
    pub loop_yield: Duration,
    #[serde(with = "millis")]
    pub accept_timeout: Duration,
    #[serde(with = "millis")]
    pub horn_pulse: Duration,
    pub request_read_limit: usize,
    pub default_speed: u8,
    pub max_duty: u16,
    pub pwm_frequency_hz: u32,
    /// Serial device for the command channel (None = serial disabled)
    pub serial_port: Option<String>,
    pub serial_baudrate: u32,
    /// Read timeout on the serial device
    #[serde(with = "millis")]
    pub serial_timeout: Duration,
    /// Bind address for the HTTP endpoint (None = HTTP disabled)
    pub http_bind: Option<SocketAddr>,
    /// Hold both simulated sensor lines active
    pub simulate_signals: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supervisor_period: SUPERVISOR_PERIOD,
            stale_threshold: STALE_THRESHOLD,
            loop_yield: LOOP_YIELD,
            accept_timeout: ACCEPT_TIMEOUT,
            horn_pulse: HORN_PULSE,
            request_read_limit: REQUEST_READ_LIMIT,
            default_speed: DEFAULT_SPEED_PERCENT,
            max_duty: MAX_DUTY,
            pwm_frequency_hz: PWM_FREQUENCY_HZ,
            serial_port: None,
            serial_baudrate: SERIAL_BAUDRATE,
            serial_timeout: SERIAL_TIMEOUT,
            http_bind: HTTP_BIND.parse().ok(),
            simulate_signals: false,
        }
    }
}

impl Config {
    /// Load a config from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supervisor_period.is_zero() {
            return Err(ConfigError::Invalid("supervisor_period must be > 0".into()));
        }
        if self.stale_threshold.is_zero() {
            return Err(ConfigError::Invalid("stale_threshold must be > 0".into()));
        }
        if self.max_duty == 0 {
            return Err(ConfigError::Invalid("max_duty must be > 0".into()));
        }
        if self.default_speed > 100 {
            return Err(ConfigError::Invalid(format!(
                "default_speed must be 0..=100, got {}",
                self.default_speed
            )));
        }
        if self.request_read_limit == 0 {
            return Err(ConfigError::Invalid("request_read_limit must be > 0".into()));
        }
        Ok(())
    }
}

// Durations as integer milliseconds
mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = Config::default();
        assert_eq!(config.supervisor_period, Duration::from_millis(500));
        assert_eq!(config.stale_threshold, Duration::from_secs(3));
        assert_eq!(config.default_speed, 50);
        assert_eq!(config.max_duty, 1023);
        assert_eq!(config.http_bind, Some("0.0.0.0:80".parse().unwrap()));
        assert!(config.serial_port.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "stale_threshold": 1500, "serial_port": "/dev/ttyUSB0" }"#)
                .unwrap();
        assert_eq!(config.stale_threshold, Duration::from_millis(1500));
        assert_eq!(config.serial_port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.horn_pulse, HORN_PULSE);
        assert_eq!(config.serial_timeout, SERIAL_TIMEOUT);
    }

    #[test]
    fn test_serial_timeout_from_json() {
        let config: Config = serde_json::from_str(r#"{ "serial_timeout": 50 }"#).unwrap();
        assert_eq!(config.serial_timeout, Duration::from_millis(50));
        assert_eq!(Config::default().serial_timeout, Duration::from_millis(10));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = serde_json::from_str::<Config>(r#"{ "turbo": true }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            default_speed: 101,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config {
            stale_threshold: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/rc-car.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
