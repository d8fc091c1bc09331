//! Board configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::protocol::constants::{DEFAULT_INTER_COMMAND_DELAY_MS, DEFAULT_RELAY_COUNT};
use crate::protocol::framing::FramingMode;

#[cfg(windows)]
const DEFAULT_PORT: &str = "COM1";
#[cfg(not(windows))]
const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Configuration for one relay board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Serial device name.
    pub port: String,
    /// Number of relays on the board.
    pub relay_count: u8,
    /// Pacing delay after each frame, in milliseconds.
    pub delay_ms: u64,
    /// Frame batching mode.
    pub framing: FramingMode,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            relay_count: DEFAULT_RELAY_COUNT,
            delay_ms: DEFAULT_INTER_COMMAND_DELAY_MS,
            framing: FramingMode::default(),
        }
    }
}

impl BoardConfig {
    pub fn new(port: impl Into<String>, relay_count: u8) -> Self {
        Self {
            port: port.into(),
            relay_count,
            ..Default::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BoardConfig::default();
        assert_eq!(config.relay_count, 8);
        assert_eq!(config.delay_ms, 20);
        assert_eq!(config.framing, FramingMode::Batched);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = BoardConfig::from_toml_str(
            r#"
            port = "/dev/ttyACM2"
            framing = "byte_wise"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, "/dev/ttyACM2");
        assert_eq!(config.framing, FramingMode::ByteWise);
        assert_eq!(config.relay_count, 8);
    }

    #[test]
    fn test_fractional_delay_rejected() {
        assert!(BoardConfig::from_toml_str("delay_ms = 0.1").is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "usbrelay-config-{}.toml",
            std::process::id()
        ));
        let config = BoardConfig {
            delay_ms: 5,
            ..BoardConfig::new("COM7", 4)
        };
        config.save_to_file(&path).unwrap();
        let loaded = BoardConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
