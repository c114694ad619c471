use crate::error::{AmpError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Serial settings for the amplifier link
///
/// Only `port` is required; the rest default to the amplifier's factory
/// settings. Loaded from TOML:
///
/// ```toml
/// port = "/dev/ttyUSB0"
/// baud_rate = 9600
/// timeout_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmpConfig {
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Upper bound on one exchange's read
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Silence after the first reply byte that ends a read early
    #[serde(default = "default_inter_byte_gap_ms")]
    pub inter_byte_gap_ms: u64,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_inter_byte_gap_ms() -> u64 {
    50
}

impl AmpConfig {
    /// Default settings for the given port
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            inter_byte_gap_ms: default_inter_byte_gap_ms(),
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: AmpConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(AmpError::InvalidArgument("port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(AmpError::InvalidArgument("baud_rate must be non-zero".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(AmpError::InvalidArgument("timeout_ms must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn inter_byte_gap(&self) -> Duration {
        Duration::from_millis(self.inter_byte_gap_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_only_uses_defaults() {
        let config = AmpConfig::from_toml_str(r#"port = "/dev/ttyUSB0""#).unwrap();
        assert_eq!(config, AmpConfig::new("/dev/ttyUSB0"));
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.inter_byte_gap(), Duration::from_millis(50));
    }

    #[test]
    fn overrides_are_honoured() {
        let config = AmpConfig::from_toml_str(
            r#"
            port = "COM3"
            baud_rate = 19200
            timeout_ms = 300
            inter_byte_gap_ms = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.port, "COM3");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.timeout(), Duration::from_millis(300));
        assert_eq!(config.inter_byte_gap(), Duration::from_millis(20));
    }

    #[test]
    fn port_is_required() {
        let err = AmpConfig::from_toml_str("baud_rate = 9600").unwrap_err();
        assert!(matches!(err, AmpError::Config(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = AmpConfig::from_toml_str("port = \"/dev/ttyS0\"\ntimeout_ms = 0").unwrap_err();
        assert!(matches!(err, AmpError::InvalidArgument(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AmpConfig::load("/nonexistent/zone-amp.toml").unwrap_err();
        assert!(matches!(err, AmpError::Io(_)));
    }
}
