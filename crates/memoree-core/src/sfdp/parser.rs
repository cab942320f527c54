//! SFDP discovery
//!
//! Reads the SFDP header and the basic flash parameter table through RDSFDP
//! and decodes the fields needed to drive the part.

use crate::codec::nor;
use crate::error::{Error, Result};
use crate::transport::Transport;

use super::types::*;

/// Read raw SFDP data at `addr`
pub fn read_sfdp<T: Transport + ?Sized>(
    transport: &mut T,
    addr: u32,
    buf: &mut [u8],
    timeout_ms: u32,
) -> Result<()> {
    let mut txn = nor::read_sfdp(addr, buf, timeout_ms);
    transport.write_read(0, &mut txn)
}

impl SfdpHeader {
    /// Decode and validate the 15 header bytes
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Result<Self> {
        if buf[..4] != SFDP_SIGNATURE {
            log::debug!("SFDP signature invalid (expected 'SFDP')");
            return Err(Error::SfdpNotSupported);
        }

        // Byte 7 is reserved; the table must reach the density DWORD
        if buf[7] != 0xFF || buf[11] < 2 {
            log::debug!(
                "SFDP header rejected: reserved {:#04x}, table length {} DWORDs",
                buf[7],
                buf[11]
            );
            return Err(Error::SfdpInvalidHeader);
        }

        Ok(Self {
            header_version: u16::from_le_bytes([buf[4], buf[5]]),
            header_count: buf[6] as u16 + 1,
            table_version: u16::from_le_bytes([buf[9], buf[10]]),
            table_size: buf[11] as u16 * 4,
            table_pointer: u32::from_le_bytes([buf[12], buf[13], buf[14], 0]),
        })
    }
}

/// Fields of the basic flash parameter table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicTable {
    /// Program granularity in bytes
    pub write_granularity: u16,
    /// 4 KiB erase opcode, 0 when unsupported
    pub erase_4k_opcode: u8,
    /// 4096 when bits 1:0 advertise 4 KiB erase, else 0
    pub min_sector_size: u32,
    /// Write enable for volatile status register bits
    pub volatile_sr_write_enable: WriteEnableForVolatileSr,
    /// Address width in bytes
    pub address_bytes: u8,
    /// DTR clocking
    pub dtr: bool,
    /// Density in bytes
    pub size: u64,
}

impl BasicTable {
    /// Decode and validate the first two DWORDs of the table
    pub fn decode(table: &[u8]) -> Result<Self> {
        let t: &[u8; 8] = table
            .get(..8)
            .and_then(|s| s.try_into().ok())
            .ok_or(Error::SfdpInvalidHeader)?;

        if (t[0] >> 5) & 0b111 != 0b111 || t[2] & 0x80 == 0 || t[3] != 0xFF {
            log::debug!(
                "SFDP table reserved bits invalid: {:02X} {:02X} {:02X} {:02X}",
                t[0],
                t[1],
                t[2],
                t[3]
            );
            return Err(Error::SfdpInvalidHeader);
        }

        // Bits 1:0 - 4KB erase: 01b supported, 11b not supported
        let erase_field = t[0] & 0b11;
        let erase_4k_opcode = if erase_field == 0b11 { 0 } else { t[1] };
        let min_sector_size = if erase_field == 0b01 { 4096 } else { 0 };

        let size = decode_density(u32::from_le_bytes([t[4], t[5], t[6], t[7]]))?;

        // Byte 2 bits 2:1 - address bytes: 3 only, 3 or 4, 4 only
        let address_bytes = match (t[2] >> 1) & 0b11 {
            0b00 => 3,
            0b01 if size <= MAX_3BYTE_SIZE => 3,
            0b01 | 0b10 => 4,
            _ => {
                log::debug!("SFDP address mode field is reserved");
                return Err(Error::SfdpInvalidHeader);
            }
        };

        Ok(Self {
            write_granularity: if t[0] & (1 << 2) != 0 { 64 } else { 1 },
            erase_4k_opcode,
            min_sector_size,
            volatile_sr_write_enable: if t[0] & (1 << 4) != 0 {
                WriteEnableForVolatileSr::Wren
            } else {
                WriteEnableForVolatileSr::Ewsr
            },
            address_bytes,
            dtr: (t[2] >> 3) & 1 != 0,
            size,
        })
    }
}

/// Decode DWORD 2 into a size in bytes
///
/// Bit 31 clear: bits 30:0 hold the density in bits minus one.
/// Bit 31 set: bits 30:0 hold N where the density is 2^N bits.
fn decode_density(dword: u32) -> Result<u64> {
    if dword & (1 << 31) == 0 {
        return Ok((dword as u64 + 1) / 8);
    }
    let n = dword & 0x7FFF_FFFF;
    if !(3..=66).contains(&n) {
        log::debug!("SFDP density exponent {} out of range", n);
        return Err(Error::SfdpInvalidHeader);
    }
    Ok(1u64 << (n - 3))
}

/// Run discovery, tracking progress in `state`
///
/// `state` ends as [`SfdpState::Parsed`] on success and
/// [`SfdpState::Failed`] on any error.
pub fn discover<T: Transport + ?Sized>(
    transport: &mut T,
    timeout_ms: u32,
    state: &mut SfdpState,
) -> Result<SfdpParameters> {
    let result = run_discovery(transport, timeout_ms, state);
    match &result {
        Ok(params) => {
            log::debug!(
                "SFDP: {} bytes, {}-byte address, page {}, 4K erase {:#04x}",
                params.size,
                params.address_bytes,
                params.write_granularity,
                params.erase_4k_opcode
            );
            *state = SfdpState::Parsed;
        }
        Err(e) => {
            log::debug!("SFDP discovery failed: {}", e);
            *state = SfdpState::Failed;
        }
    }
    result
}

fn run_discovery<T: Transport + ?Sized>(
    transport: &mut T,
    timeout_ms: u32,
    state: &mut SfdpState,
) -> Result<SfdpParameters> {
    *state = SfdpState::None;

    log::debug!("Reading SFDP header ({} bytes at address 0x00)...", HEADER_LEN);
    let mut buf = [0xFFu8; HEADER_LEN];
    read_sfdp(transport, 0, &mut buf, timeout_ms)?;
    let header = SfdpHeader::decode(&buf)?;
    *state = SfdpState::HeaderRead;

    log::debug!(
        "SFDP header valid: revision {:#06x}, table {} bytes at {:#x}",
        header.header_version,
        header.table_size,
        header.table_pointer
    );

    let mut table: heapless::Vec<u8, MAX_PARAMETER_TABLE_SIZE> = heapless::Vec::new();
    table
        .resize(header.table_size as usize, 0xFF)
        .map_err(|_| Error::OutOfMemory)?;
    read_sfdp(transport, header.table_pointer, &mut table, timeout_ms)?;
    *state = SfdpState::TableRead;

    let basic = BasicTable::decode(&table)?;

    Ok(SfdpParameters {
        header_version: header.header_version,
        header_count: header.header_count,
        table_version: header.table_version,
        table_size: header.table_size,
        table_pointer: header.table_pointer,
        write_granularity: basic.write_granularity,
        erase_4k_opcode: basic.erase_4k_opcode,
        min_sector_size: basic.min_sector_size,
        volatile_sr_write_enable: basic.volatile_sr_write_enable,
        address_bytes: basic.address_bytes,
        dtr: basic.dtr,
        size: basic.size,
    })
}
