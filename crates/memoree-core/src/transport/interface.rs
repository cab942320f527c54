//! Interface configuration types

use crate::variant::InterfaceType;

/// I2C bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cConfig {
    /// Bus/peripheral number
    pub port: u8,
    /// Requested SCL frequency in Hz
    pub speed_hz: u32,
    /// SDA GPIO, if the platform routes pins
    pub sda_pin: Option<u8>,
    /// SCL GPIO, if the platform routes pins
    pub scl_pin: Option<u8>,
    /// 7-bit base device-select address
    pub address: u8,
}

impl I2cConfig {
    /// Default base address of 24xx parts with A2..A0 tied low
    pub const BASE_ADDRESS: u8 = 0x50;

    /// Create a configuration without pin routing
    pub const fn new(port: u8, speed_hz: u32, address: u8) -> Self {
        Self {
            port,
            speed_hz,
            sda_pin: None,
            scl_pin: None,
            address,
        }
    }

    /// Set the SDA and SCL pins
    pub const fn with_pins(mut self, sda: u8, scl: u8) -> Self {
        self.sda_pin = Some(sda);
        self.scl_pin = Some(scl);
        self
    }
}

/// SPI clock polarity/phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// Mode from its number (0-3)
    pub const fn from_number(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(Self::Mode0),
            1 => Some(Self::Mode1),
            2 => Some(Self::Mode2),
            3 => Some(Self::Mode3),
            _ => None,
        }
    }
}

/// SPI / Microwire bus configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpiConfig {
    /// Bus/peripheral number
    pub port: u8,
    /// Requested clock frequency in Hz
    pub speed_hz: u32,
    /// Data out (MOSI)
    pub do_pin: Option<u8>,
    /// Clock
    pub sck_pin: Option<u8>,
    /// Data in (MISO)
    pub di_pin: Option<u8>,
    /// Chip select
    pub cs_pin: Option<u8>,
    /// Hold
    pub hd_pin: Option<u8>,
    /// Write protect
    pub wp_pin: Option<u8>,
    /// Clock mode
    pub mode: SpiMode,
}

impl SpiConfig {
    /// Create a configuration without pin routing
    pub const fn new(port: u8, speed_hz: u32) -> Self {
        Self {
            port,
            speed_hz,
            do_pin: None,
            sck_pin: None,
            di_pin: None,
            cs_pin: None,
            hd_pin: None,
            wp_pin: None,
            mode: SpiMode::Mode0,
        }
    }
}

/// Configuration of the bus a memory is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceConfig {
    /// I2C bus
    I2c(I2cConfig),
    /// SPI / Microwire bus
    Spi(SpiConfig),
}

impl InterfaceConfig {
    /// Interface type of this configuration
    pub const fn interface(&self) -> InterfaceType {
        match self {
            Self::I2c(_) => InterfaceType::I2c,
            Self::Spi(_) => InterfaceType::Spi,
        }
    }

    /// Requested bus speed in Hz
    pub const fn speed_hz(&self) -> u32 {
        match self {
            Self::I2c(c) => c.speed_hz,
            Self::Spi(c) => c.speed_hz,
        }
    }

    /// Override the bus speed
    pub fn set_speed_hz(&mut self, speed_hz: u32) {
        match self {
            Self::I2c(c) => c.speed_hz = speed_hz,
            Self::Spi(c) => c.speed_hz = speed_hz,
        }
    }

    /// Base device-select address (0 for SPI)
    pub const fn select_address(&self) -> u8 {
        match self {
            Self::I2c(c) => c.address,
            Self::Spi(_) => 0,
        }
    }
}

impl From<I2cConfig> for InterfaceConfig {
    fn from(config: I2cConfig) -> Self {
        Self::I2c(config)
    }
}

impl From<SpiConfig> for InterfaceConfig {
    fn from(config: SpiConfig) -> Self {
        Self::Spi(config)
    }
}
