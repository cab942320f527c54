//! Memory variant type definitions

use core::fmt;
use core::str::FromStr;

use super::features::Features;
use crate::error::{Error, Result};

/// Physical interface a part is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
pub enum InterfaceType {
    /// Two-wire I2C bus
    I2c,
    /// SPI / Microwire bus
    Spi,
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c => write!(f, "I2C"),
            Self::Spi => write!(f, "SPI"),
        }
    }
}

/// Protocol family of a variant
///
/// Every engine dispatches on this type, so adding a family forces every
/// codec and timing rule to be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// 24xx I2C EEPROM with in-band addressing
    I2cEeprom,
    /// 93Cxx Microwire EEPROM with bit-level framing
    Microwire,
    /// 25xx SPI NOR flash described through SFDP
    SpiNor,
    /// Raw pass-through on the given interface
    Stub(InterfaceType),
}

impl Family {
    /// Interface type used by this family
    pub const fn interface(&self) -> InterfaceType {
        match self {
            Self::I2cEeprom => InterfaceType::I2c,
            Self::Microwire | Self::SpiNor => InterfaceType::Spi,
            Self::Stub(interface) => *interface,
        }
    }

    /// Maximum bus clock for this family in Hz
    pub const fn max_speed_hz(&self) -> u32 {
        match self {
            Self::I2cEeprom | Self::Stub(InterfaceType::I2c) => 400_000,
            Self::Microwire => 2_000_000,
            Self::SpiNor | Self::Stub(InterfaceType::Spi) => 40_000_000,
        }
    }

    /// Returns true for the raw pass-through variants
    pub const fn is_stub(&self) -> bool {
        matches!(self, Self::Stub(_))
    }
}

/// Supported memory part numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    /// Raw I2C pass-through
    StubI2c,
    /// 24xx02, 2 Kbit
    Eeprom24xx02,
    /// 24xx04, 4 Kbit
    Eeprom24xx04,
    /// 24xx08, 8 Kbit
    Eeprom24xx08,
    /// 24xx16, 16 Kbit
    Eeprom24xx16,
    /// 24xx32, 32 Kbit
    Eeprom24xx32,
    /// 24xx64, 64 Kbit
    Eeprom24xx64,
    /// 24xx128, 128 Kbit
    Eeprom24xx128,
    /// 24xx256, 256 Kbit
    Eeprom24xx256,
    /// 24xx512, 512 Kbit
    Eeprom24xx512,
    /// 24xx1024 / 24xx1025, 1 Mbit
    Eeprom24xx1024,
    /// Raw SPI pass-through
    StubSpi,
    /// 93C46, 1 Kbit
    Microwire93C46,
    /// 93C56, 2 Kbit
    Microwire93C56,
    /// 93C66, 4 Kbit
    Microwire93C66,
    /// 93C76, 8 Kbit
    Microwire93C76,
    /// 93C86, 16 Kbit
    Microwire93C86,
    /// Any 25xx SPI NOR flash implementing SFDP
    SpiNorSfdp,
}

impl Variant {
    /// Every variant, in identifier order
    pub const ALL: [Variant; 18] = [
        Variant::StubI2c,
        Variant::Eeprom24xx02,
        Variant::Eeprom24xx04,
        Variant::Eeprom24xx08,
        Variant::Eeprom24xx16,
        Variant::Eeprom24xx32,
        Variant::Eeprom24xx64,
        Variant::Eeprom24xx128,
        Variant::Eeprom24xx256,
        Variant::Eeprom24xx512,
        Variant::Eeprom24xx1024,
        Variant::StubSpi,
        Variant::Microwire93C46,
        Variant::Microwire93C56,
        Variant::Microwire93C66,
        Variant::Microwire93C76,
        Variant::Microwire93C86,
        Variant::SpiNorSfdp,
    ];

    /// Resolve a legacy numeric identifier
    ///
    /// Identifiers 11 and 18 were family boundary markers and carry no part,
    /// anything from 20 up is past the end of the table.
    pub const fn from_id(id: u8) -> Result<Self> {
        Ok(match id {
            0 => Self::StubI2c,
            1 => Self::Eeprom24xx02,
            2 => Self::Eeprom24xx04,
            3 => Self::Eeprom24xx08,
            4 => Self::Eeprom24xx16,
            5 => Self::Eeprom24xx32,
            6 => Self::Eeprom24xx64,
            7 => Self::Eeprom24xx128,
            8 => Self::Eeprom24xx256,
            9 => Self::Eeprom24xx512,
            10 => Self::Eeprom24xx1024,
            12 => Self::StubSpi,
            13 => Self::Microwire93C46,
            14 => Self::Microwire93C56,
            15 => Self::Microwire93C66,
            16 => Self::Microwire93C76,
            17 => Self::Microwire93C86,
            19 => Self::SpiNorSfdp,
            _ => return Err(Error::InvalidArgument),
        })
    }

    /// Legacy numeric identifier
    pub const fn id(&self) -> u8 {
        match self {
            Self::StubI2c => 0,
            Self::Eeprom24xx02 => 1,
            Self::Eeprom24xx04 => 2,
            Self::Eeprom24xx08 => 3,
            Self::Eeprom24xx16 => 4,
            Self::Eeprom24xx32 => 5,
            Self::Eeprom24xx64 => 6,
            Self::Eeprom24xx128 => 7,
            Self::Eeprom24xx256 => 8,
            Self::Eeprom24xx512 => 9,
            Self::Eeprom24xx1024 => 10,
            Self::StubSpi => 12,
            Self::Microwire93C46 => 13,
            Self::Microwire93C56 => 14,
            Self::Microwire93C66 => 15,
            Self::Microwire93C76 => 16,
            Self::Microwire93C86 => 17,
            Self::SpiNorSfdp => 19,
        }
    }

    /// Canonical name, as accepted by [`FromStr`]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StubI2c => "stub-i2c",
            Self::Eeprom24xx02 => "24xx02",
            Self::Eeprom24xx04 => "24xx04",
            Self::Eeprom24xx08 => "24xx08",
            Self::Eeprom24xx16 => "24xx16",
            Self::Eeprom24xx32 => "24xx32",
            Self::Eeprom24xx64 => "24xx64",
            Self::Eeprom24xx128 => "24xx128",
            Self::Eeprom24xx256 => "24xx256",
            Self::Eeprom24xx512 => "24xx512",
            Self::Eeprom24xx1024 => "24xx1024",
            Self::StubSpi => "stub-spi",
            Self::Microwire93C46 => "93c46",
            Self::Microwire93C56 => "93c56",
            Self::Microwire93C66 => "93c66",
            Self::Microwire93C76 => "93c76",
            Self::Microwire93C86 => "93c86",
            Self::SpiNorSfdp => "25xx-sfdp",
        }
    }

    /// Protocol family of this variant
    pub const fn family(&self) -> Family {
        match self {
            Self::StubI2c => Family::Stub(InterfaceType::I2c),
            Self::StubSpi => Family::Stub(InterfaceType::Spi),
            Self::Eeprom24xx02
            | Self::Eeprom24xx04
            | Self::Eeprom24xx08
            | Self::Eeprom24xx16
            | Self::Eeprom24xx32
            | Self::Eeprom24xx64
            | Self::Eeprom24xx128
            | Self::Eeprom24xx256
            | Self::Eeprom24xx512
            | Self::Eeprom24xx1024 => Family::I2cEeprom,
            Self::Microwire93C46
            | Self::Microwire93C56
            | Self::Microwire93C66
            | Self::Microwire93C76
            | Self::Microwire93C86 => Family::Microwire,
            Self::SpiNorSfdp => Family::SpiNor,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Alternative spellings accepted by [`FromStr`]
const ALIASES: [(&str, Variant); 5] = [
    ("sfdp", Variant::SpiNorSfdp),
    ("25xx", Variant::SpiNorSfdp),
    ("25xx_sfdp", Variant::SpiNorSfdp),
    ("stub_i2c", Variant::StubI2c),
    ("stub_spi", Variant::StubSpi),
];

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Variant::ALL
            .iter()
            .map(|v| (v.name(), *v))
            .chain(ALIASES.iter().copied())
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, v)| v)
            .ok_or(Error::InvalidArgument)
    }
}

#[cfg(feature = "std")]
impl serde::Serialize for Variant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[cfg(feature = "std")]
impl<'de> serde::Deserialize<'de> for Variant {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let name = std::string::String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| serde::de::Error::custom(std::format!("unknown memory variant '{}'", name)))
    }
}

/// Mutable geometry of a memory part
///
/// Cloned from the variant descriptor when a handle is created and
/// overwritten in place once SFDP discovery succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Geometry {
    /// Total size in bytes, a power of two
    pub size: u32,
    /// Width of the address field in bits
    pub addr_len: u8,
    /// Page size in bytes
    pub page_size: u16,
    /// Maximum page write completion time in ms
    pub page_write_delay_ms: u8,
}

impl Geometry {
    /// Create a geometry
    pub const fn new(size: u32, addr_len: u8, page_size: u16, page_write_delay_ms: u8) -> Self {
        Self {
            size,
            addr_len,
            page_size,
            page_write_delay_ms,
        }
    }

    /// Returns true once size and page size describe an addressable array
    pub const fn is_populated(&self) -> bool {
        self.size != 0 && self.page_size != 0
    }

    /// Number of pages (0 when not populated)
    pub const fn num_pages(&self) -> u32 {
        if self.page_size == 0 {
            0
        } else {
            self.size / self.page_size as u32
        }
    }

    /// Check if an address is inside the array
    pub const fn is_valid_address(&self, addr: u32) -> bool {
        addr < self.size
    }

    /// Check if a page index is inside the array
    pub const fn is_valid_page(&self, page: u32) -> bool {
        page < self.num_pages()
    }
}

/// Static description of one memory variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantDescriptor {
    /// The variant this descriptor belongs to
    pub variant: Variant,
    /// Interface the part is attached to
    pub interface: InterfaceType,
    /// Geometry (all zero for SFDP parts and stubs, except the delay)
    pub geometry: Geometry,
    /// Protocol features
    pub features: Features,
}

impl VariantDescriptor {
    /// Protocol family
    pub const fn family(&self) -> Family {
        self.variant.family()
    }

    /// Returns true when high address bits are folded into the select byte
    pub const fn folds_select(&self) -> bool {
        self.features.contains(Features::SELECT_FOLDING)
    }
}
