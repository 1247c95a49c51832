//! Binary persistence for node configuration
//!
//! The embedding firmware keeps the config in flash (or EEPROM) as
//! postcard-serialized bytes; this module only converts to and from those
//! bytes.

use super::parse::ParseError;
use super::types::{NodeConfig, CONFIG_VERSION};

/// Maximum serialized config size (binary)
pub const MAX_CONFIG_SIZE: usize = 16;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Text parsing failed
    Parse(ParseError),
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Config version mismatch
    VersionMismatch,
}

impl From<ParseError> for ConfigError {
    fn from(e: ParseError) -> Self {
        ConfigError::Parse(e)
    }
}

impl NodeConfig {
    /// Serialize into `buffer`, returning the used part
    pub fn to_bytes<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize, checking the layout version and clamping ranges
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: NodeConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

        if config.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }

        Ok(config.normalized())
    }
}
