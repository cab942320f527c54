//! Memory configuration
//!
//! A memory and its bus can be described two ways. Spec strings follow the
//! `name:key=value,...` convention:
//!
//! ```text
//! 24xx256:port=0,speed=400000,addr=0x50,sda=21,scl=22
//! 25xx-sfdp:port=1,speed=20000000,mode=0,cs=5,sck=18,do=23,di=19
//! ```
//!
//! TOML files carry the same information:
//!
//! ```toml
//! [memory]
//! variant = "93c46"
//!
//! [spi]
//! port = 2
//! speed = 1000000
//! cs = 15
//! ```
//!
//! Missing speeds default to the family maximum, a missing I2C address to
//! 0x50.

use std::fs;
use std::path::{Path, PathBuf};
use std::string::{String, ToString};

use thiserror::Error;

use crate::memory::Memory;
use crate::transport::{I2cConfig, InterfaceConfig, SpiConfig, SpiMode, Transport};
use crate::variant::{InterfaceType, Variant};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variant name not recognized
    #[error("Unknown memory variant '{0}'")]
    UnknownVariant(String),

    /// Option without `=`
    #[error("Invalid parameter format: '{0}' (expected key=value)")]
    InvalidFormat(String),

    /// Option value out of range or not a number
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue {
        /// Option name
        key: String,
        /// Offending value
        value: String,
    },

    /// TOML table does not match the variant's bus
    #[error("{variant} is an {expected} part, configuration describes {found}")]
    InterfaceMismatch {
        /// Configured variant
        variant: Variant,
        /// Bus the variant needs
        expected: InterfaceType,
        /// Bus the configuration describes
        found: InterfaceType,
    },

    /// Both `[i2c]` and `[spi]` present
    #[error("Configuration has both [i2c] and [spi] tables")]
    AmbiguousInterface,

    /// Configuration file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for configuration parsing
pub type Result<T> = std::result::Result<T, ConfigError>;

/// A memory variant together with the bus it sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemorySpec {
    /// Part variant
    pub variant: Variant,
    /// Bus configuration
    pub interface: InterfaceConfig,
}

impl MemorySpec {
    /// Default bus configuration for `variant`
    pub fn new(variant: Variant) -> Self {
        let speed = variant.family().max_speed_hz();
        let interface = match variant.family().interface() {
            InterfaceType::I2c => I2cConfig::new(0, speed, I2cConfig::BASE_ADDRESS).into(),
            InterfaceType::Spi => SpiConfig::new(0, speed).into(),
        };
        Self { variant, interface }
    }

    /// Parse a TOML configuration
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: TomlConfigFile = toml::from_str(content)?;
        file.into_spec()
    }

    /// Load a TOML configuration file
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Open the bus with `open` and attach the memory
    pub fn open<T, F>(self, open: F) -> crate::error::Result<Memory<T>>
    where
        T: Transport,
        F: FnOnce(&InterfaceConfig) -> crate::error::Result<T>,
    {
        Memory::init(self.variant, self.interface, open)
    }
}

impl core::str::FromStr for MemorySpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        parse_memory_spec(s)
    }
}

/// Parse a `name:key=value,...` memory spec string
///
/// I2C keys: `port`, `speed`, `addr`, `sda`, `scl`.
/// SPI keys: `port`, `speed`, `mode`, `do`, `sck`, `di`, `cs`, `hd`, `wp`.
/// Unknown keys are ignored with a warning.
pub fn parse_memory_spec(s: &str) -> Result<MemorySpec> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));
    let variant: Variant = name
        .parse()
        .map_err(|_| ConfigError::UnknownVariant(name.to_string()))?;
    let mut spec = MemorySpec::new(variant);

    for opt in opts_str.split(',').filter(|o| !o.trim().is_empty()) {
        let (key, value) = opt
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidFormat(opt.to_string()))?;
        let (key, value) = (key.trim(), value.trim());

        match (&mut spec.interface, key) {
            (InterfaceConfig::I2c(c), "port") | (InterfaceConfig::I2c(c), "bus") => {
                c.port = parse_value(key, value)?
            }
            (InterfaceConfig::I2c(c), "speed") => c.speed_hz = parse_value(key, value)?,
            (InterfaceConfig::I2c(c), "addr") | (InterfaceConfig::I2c(c), "address") => {
                c.address = parse_value(key, value)?
            }
            (InterfaceConfig::I2c(c), "sda") => c.sda_pin = Some(parse_value(key, value)?),
            (InterfaceConfig::I2c(c), "scl") => c.scl_pin = Some(parse_value(key, value)?),
            (InterfaceConfig::Spi(c), "port") | (InterfaceConfig::Spi(c), "bus") => {
                c.port = parse_value(key, value)?
            }
            (InterfaceConfig::Spi(c), "speed") => c.speed_hz = parse_value(key, value)?,
            (InterfaceConfig::Spi(c), "mode") => c.mode = parse_mode(key, value)?,
            (InterfaceConfig::Spi(c), "do") | (InterfaceConfig::Spi(c), "mosi") => {
                c.do_pin = Some(parse_value(key, value)?)
            }
            (InterfaceConfig::Spi(c), "sck") => c.sck_pin = Some(parse_value(key, value)?),
            (InterfaceConfig::Spi(c), "di") | (InterfaceConfig::Spi(c), "miso") => {
                c.di_pin = Some(parse_value(key, value)?)
            }
            (InterfaceConfig::Spi(c), "cs") => c.cs_pin = Some(parse_value(key, value)?),
            (InterfaceConfig::Spi(c), "hd") => c.hd_pin = Some(parse_value(key, value)?),
            (InterfaceConfig::Spi(c), "wp") => c.wp_pin = Some(parse_value(key, value)?),
            _ => log::warn!("{}: Unknown option: {}={}", variant, key, value),
        }
    }

    Ok(spec)
}

/// Parse a number that can be hex (0x...) or decimal
fn parse_number(s: &str) -> std::result::Result<u32, String> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| std::format!("invalid hex: {}", e))
    } else {
        s.parse().map_err(|e| std::format!("invalid number: {}", e))
    }
}

fn parse_value<N: TryFrom<u32>>(key: &str, value: &str) -> Result<N> {
    parse_number(value)
        .ok()
        .and_then(|n| N::try_from(n).ok())
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_mode(key: &str, value: &str) -> Result<SpiMode> {
    parse_value::<u8>(key, value)
        .ok()
        .and_then(SpiMode::from_number)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

/// TOML configuration file structure
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfigFile {
    memory: TomlMemory,
    i2c: Option<TomlI2c>,
    spi: Option<TomlSpi>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlMemory {
    variant: Variant,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlI2c {
    #[serde(default)]
    port: u8,
    #[serde(default, deserialize_with = "deserialize_opt_hex_u32")]
    speed: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_opt_hex_u32")]
    address: Option<u32>,
    sda: Option<u8>,
    scl: Option<u8>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSpi {
    #[serde(default)]
    port: u8,
    #[serde(default, deserialize_with = "deserialize_opt_hex_u32")]
    speed: Option<u32>,
    #[serde(default)]
    mode: u8,
    #[serde(rename = "do")]
    do_pin: Option<u8>,
    sck: Option<u8>,
    di: Option<u8>,
    cs: Option<u8>,
    hd: Option<u8>,
    wp: Option<u8>,
}

impl TomlConfigFile {
    fn into_spec(self) -> Result<MemorySpec> {
        let variant = self.memory.variant;
        let expected = variant.family().interface();
        let mut spec = MemorySpec::new(variant);

        let found = match (&self.i2c, &self.spi) {
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousInterface),
            (Some(_), None) => InterfaceType::I2c,
            (None, Some(_)) => InterfaceType::Spi,
            (None, None) => expected,
        };
        if found != expected {
            return Err(ConfigError::InterfaceMismatch {
                variant,
                expected,
                found,
            });
        }

        match &mut spec.interface {
            InterfaceConfig::I2c(c) => {
                let t = self.i2c.unwrap_or_default();
                c.port = t.port;
                c.speed_hz = t.speed.unwrap_or(c.speed_hz);
                if let Some(address) = t.address {
                    c.address = u8::try_from(address).map_err(|_| ConfigError::InvalidValue {
                        key: "address".to_string(),
                        value: std::format!("{:#x}", address),
                    })?;
                }
                c.sda_pin = t.sda;
                c.scl_pin = t.scl;
            }
            InterfaceConfig::Spi(c) => {
                let t = self.spi.unwrap_or_default();
                c.port = t.port;
                c.speed_hz = t.speed.unwrap_or(c.speed_hz);
                c.mode = SpiMode::from_number(t.mode).ok_or_else(|| ConfigError::InvalidValue {
                    key: "mode".to_string(),
                    value: t.mode.to_string(),
                })?;
                c.do_pin = t.do_pin;
                c.sck_pin = t.sck;
                c.di_pin = t.di;
                c.cs_pin = t.cs;
                c.hd_pin = t.hd;
                c.wp_pin = t.wp;
            }
        }

        Ok(spec)
    }
}

/// Deserialize an optional u32 that can be hex (0x...) or decimal
fn deserialize_opt_hex_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    // Try to deserialize as a number first, then as a string
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrInt {
        Int(u32),
        Str(String),
    }

    match HexOrInt::deserialize(deserializer)? {
        HexOrInt::Int(n) => Ok(Some(n)),
        HexOrInt::Str(s) => parse_number(&s).map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_i2c_spec() {
        let spec = parse_memory_spec("24xx256:port=1,speed=100000,addr=0x51,sda=21,scl=22").unwrap();
        assert_eq!(spec.variant, Variant::Eeprom24xx256);
        assert_eq!(
            spec.interface,
            InterfaceConfig::I2c(I2cConfig {
                port: 1,
                speed_hz: 100_000,
                sda_pin: Some(21),
                scl_pin: Some(22),
                address: 0x51,
            })
        );
    }

    #[test]
    fn test_parse_defaults() {
        let spec: MemorySpec = "24xx02".parse().unwrap();
        assert_eq!(spec.interface, I2cConfig::new(0, 400_000, 0x50).into());

        let spec = parse_memory_spec("93c46:").unwrap();
        assert_eq!(spec.interface, SpiConfig::new(0, 2_000_000).into());
    }

    #[test]
    fn test_parse_spi_spec() {
        let spec = parse_memory_spec("sfdp:port=2,speed=20000000,mode=3,cs=5,sck=18,do=23,di=19").unwrap();
        assert_eq!(spec.variant, Variant::SpiNorSfdp);
        let InterfaceConfig::Spi(c) = spec.interface else {
            panic!("expected SPI config");
        };
        assert_eq!(c.port, 2);
        assert_eq!(c.speed_hz, 20_000_000);
        assert_eq!(c.mode, SpiMode::Mode3);
        assert_eq!(c.cs_pin, Some(5));
        assert_eq!(c.do_pin, Some(23));
        assert_eq!(c.hd_pin, None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_memory_spec("24xx2048"),
            Err(ConfigError::UnknownVariant(name)) if name == "24xx2048"
        ));
        assert!(matches!(
            parse_memory_spec("24xx02:speed"),
            Err(ConfigError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_memory_spec("24xx02:addr=0x150"),
            Err(ConfigError::InvalidValue { key, .. }) if key == "addr"
        ));
        assert!(matches!(
            parse_memory_spec("93c66:mode=4"),
            Err(ConfigError::InvalidValue { .. })
        ));
        // Unknown keys only warn
        assert!(parse_memory_spec("24xx02:cs=5").is_ok());
    }

    #[test]
    fn test_toml_config() {
        let spec = MemorySpec::from_toml_str(
            r#"
            [memory]
            variant = "24xx16"

            [i2c]
            port = 1
            speed = "0x61A80"
            address = 0x54
            "#,
        )
        .unwrap();
        assert_eq!(spec.variant, Variant::Eeprom24xx16);
        assert_eq!(spec.interface, I2cConfig::new(1, 400_000, 0x54).into());
    }

    #[test]
    fn test_toml_defaults_and_spi() {
        let spec = MemorySpec::from_toml_str("[memory]\nvariant = \"25xx-sfdp\"\n").unwrap();
        assert_eq!(spec.interface, SpiConfig::new(0, 40_000_000).into());

        let spec = MemorySpec::from_toml_str(
            "[memory]\nvariant = \"93C86\"\n[spi]\nspeed = 500000\nmode = 1\ncs = 4\n",
        )
        .unwrap();
        let InterfaceConfig::Spi(c) = spec.interface else {
            panic!("expected SPI config");
        };
        assert_eq!(c.speed_hz, 500_000);
        assert_eq!(c.mode, SpiMode::Mode1);
        assert_eq!(c.cs_pin, Some(4));
    }

    #[test]
    fn test_toml_errors() {
        assert!(matches!(
            MemorySpec::from_toml_str("[memory]\nvariant = \"24xx02\"\n[spi]\nport = 0\n"),
            Err(ConfigError::InterfaceMismatch { expected: InterfaceType::I2c, .. })
        ));
        assert!(matches!(
            MemorySpec::from_toml_str("[memory]\nvariant = \"24xx02\"\n[i2c]\n[spi]\n"),
            Err(ConfigError::AmbiguousInterface)
        ));
        assert!(matches!(
            MemorySpec::from_toml_str("[memory]\nvariant = \"24c02\"\n"),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            MemorySpec::load_toml("/nonexistent/memoree.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
