//! SFDP type definitions

use crate::error::{Error, Result};
use crate::variant::Geometry;

/// SFDP signature ("SFDP" as read from address 0)
pub const SFDP_SIGNATURE: [u8; 4] = *b"SFDP";

/// SFDP header plus the first parameter header
pub const HEADER_LEN: usize = 15;

/// Largest array reachable with 3-byte addresses
pub const MAX_3BYTE_SIZE: u64 = 1 << 24;

/// Largest parameter table the length byte can describe (255 DWORDs)
pub const MAX_PARAMETER_TABLE_SIZE: usize = 255 * 4;

/// Discovery progress of a memory handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
#[cfg_attr(feature = "std", serde(rename_all = "snake_case"))]
pub enum SfdpState {
    /// Not run yet
    #[default]
    None,
    /// Header read and validated
    HeaderRead,
    /// Parameter table read
    TableRead,
    /// Parameters decoded and applied
    Parsed,
    /// Last discovery failed
    Failed,
}

impl SfdpState {
    /// Returns true once discovery has succeeded
    pub const fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed)
    }
}

/// Decoded SFDP header and first parameter header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfdpHeader {
    /// SFDP revision, major in the high byte
    pub header_version: u16,
    /// Number of parameter headers
    pub header_count: u16,
    /// Basic flash parameter table revision, major in the high byte
    pub table_version: u16,
    /// Parameter table length in bytes
    pub table_size: u16,
    /// Parameter table address in SFDP space
    pub table_pointer: u32,
}

/// Where the write-enable for volatile status register bits comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub enum WriteEnableForVolatileSr {
    /// WREN (0x06)
    Wren,
    /// EWSR (0x50)
    Ewsr,
}

/// Parameters discovered through SFDP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct SfdpParameters {
    /// SFDP revision, major in the high byte
    pub header_version: u16,
    /// Number of parameter headers
    pub header_count: u16,
    /// Basic flash parameter table revision
    pub table_version: u16,
    /// Parameter table length in bytes
    pub table_size: u16,
    /// Parameter table address in SFDP space
    pub table_pointer: u32,
    /// Program granularity in bytes (1 or 64)
    pub write_granularity: u16,
    /// 4 KiB erase opcode, 0 when the part has none
    pub erase_4k_opcode: u8,
    /// Smallest uniform erase size, 0 when 4 KiB erase is unsupported
    pub min_sector_size: u32,
    /// Write enable for volatile status register bits
    pub volatile_sr_write_enable: WriteEnableForVolatileSr,
    /// Address width in bytes (3 or 4)
    pub address_bytes: u8,
    /// Double transfer rate clocking supported
    pub dtr: bool,
    /// Total size in bytes
    pub size: u64,
}

impl SfdpParameters {
    /// Geometry described by these parameters
    ///
    /// The size must be a power of two reachable with the address width and
    /// a whole number of write pages.
    pub fn geometry(&self, page_write_delay_ms: u8) -> Result<Geometry> {
        let addr_len = self.address_bytes * 8;
        if self.size > 1u64 << addr_len {
            log::debug!(
                "SFDP density {} bytes exceeds {}-bit addressing",
                self.size,
                addr_len
            );
            return Err(Error::SfdpInvalidHeader);
        }
        let size = u32::try_from(self.size).map_err(|_| Error::SfdpInvalidHeader)?;
        if !size.is_power_of_two() || size % self.write_granularity as u32 != 0 {
            return Err(Error::SfdpInvalidHeader);
        }
        Ok(Geometry::new(
            size,
            addr_len,
            self.write_granularity,
            page_write_delay_ms,
        ))
    }
}
