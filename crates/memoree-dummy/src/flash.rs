//! 25xx SPI NOR flash emulator with an SFDP image

use alloc::vec;
use alloc::vec::Vec;

use memoree_core::codec::nor;
use memoree_core::error::{Error, Result};
use memoree_core::transport::{Transaction, Transport};
use memoree_core::variant::InterfaceType;

use crate::bus::{BusEvent, BusLog};

/// Size of the SFDP header plus one parameter header
const HEADERS_LEN: usize = 16;
/// Length of the generated basic parameter table in DWORDs
const TABLE_DWORDS: u8 = 9;
/// Page program buffer of the emulated part
const PROGRAM_PAGE: usize = 256;

/// Address width advertised in SFDP and accepted by the emulated part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    /// 3-byte addresses only
    #[default]
    ThreeByte,
    /// 3-byte or 4-byte addresses
    ThreeOrFour,
    /// 4-byte addresses only
    FourByte,
}

impl AddressMode {
    /// SFDP DWORD 1 bits 18:17
    const fn field(self) -> u8 {
        match self {
            Self::ThreeByte => 0b00,
            Self::ThreeOrFour => 0b01,
            Self::FourByte => 0b10,
        }
    }

    const fn accepts(self, address_bits: u8) -> bool {
        match self {
            Self::ThreeByte => address_bits == 24,
            Self::ThreeOrFour => address_bits == 24 || address_bits == 32,
            Self::FourByte => address_bits == 32,
        }
    }
}

/// Parameters of a generated SFDP image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SfdpImage {
    /// Density in bytes
    pub size: u64,
    /// 4 KiB erase opcode, None if the part cannot erase 4 KiB
    pub erase_4k_opcode: Option<u8>,
    /// Address widths the part takes
    pub address_mode: AddressMode,
    /// Program granularity of 64 bytes instead of 1
    pub page_program_64: bool,
}

impl SfdpImage {
    /// A 3-byte-address part with 4 KiB erase (0x20) and 64-byte pages
    pub const fn new(size: u64) -> Self {
        Self {
            size,
            erase_4k_opcode: Some(0x20),
            address_mode: AddressMode::ThreeByte,
            page_program_64: true,
        }
    }

    /// Serialize into SFDP space: headers at 0, basic table at 0x10
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut image = vec![0xFF; HEADERS_LEN + TABLE_DWORDS as usize * 4];
        image[..4].copy_from_slice(b"SFDP");
        // Revision 1.6, one parameter header
        image[4..8].copy_from_slice(&[0x06, 0x01, 0x00, 0xFF]);
        // JEDEC basic table, revision 1.6
        image[8..12].copy_from_slice(&[0x00, 0x06, 0x01, TABLE_DWORDS]);
        image[12..16].copy_from_slice(&[HEADERS_LEN as u8, 0x00, 0x00, 0xFF]);

        let t = &mut image[HEADERS_LEN..];
        let erase_field = if self.erase_4k_opcode.is_some() { 0b01 } else { 0b11 };
        let granularity = if self.page_program_64 { 1 << 2 } else { 0 };
        t[0] = 0xE0 | granularity | erase_field;
        t[1] = self.erase_4k_opcode.unwrap_or(0xFF);
        t[2] = 0x80 | (self.address_mode.field() << 1);
        t[3] = 0xFF;

        let bits = self.size * 8;
        let density = if bits - 1 <= 0x7FFF_FFFF {
            (bits - 1) as u32
        } else {
            (1 << 31) | bits.trailing_zeros()
        };
        t[4..8].copy_from_slice(&density.to_le_bytes());
        image
    }
}

/// Emulated SFDP-compliant NOR flash
///
/// Programming can only clear bits and needs the write enable latch, which
/// every program and erase clears again. After a sector erase the part
/// reports Write In Progress for a configurable number of status reads and
/// rejects every other command meanwhile.
pub struct DummySfdpFlash {
    jedec_id: [u8; 3],
    sfdp: Vec<u8>,
    data: Vec<u8>,
    address_mode: AddressMode,
    erase_4k_opcode: Option<u8>,
    status: u8,
    erase_busy_polls: u32,
    busy_polls: u32,
    bus: BusLog,
}

impl DummySfdpFlash {
    /// Create an erased part described by `image`
    pub fn new(image: SfdpImage) -> Self {
        let mut flash = Self::from_raw(image.size as usize, image.to_bytes());
        flash.address_mode = image.address_mode;
        flash.erase_4k_opcode = image.erase_4k_opcode;
        flash
    }

    /// Create a 3-byte-address part of `size` bytes serving a raw SFDP space
    ///
    /// The part erases 4 KiB sectors with 0x20.
    pub fn from_raw(size: usize, sfdp: Vec<u8>) -> Self {
        Self {
            jedec_id: [0xC2, 0x20, 0x17],
            sfdp,
            data: vec![0xFF; size],
            address_mode: AddressMode::ThreeByte,
            erase_4k_opcode: Some(0x20),
            status: 0,
            erase_busy_polls: 0,
            busy_polls: 0,
            bus: BusLog::default(),
        }
    }

    /// Report WIP on this many status reads after each sector erase
    pub fn with_erase_busy_polls(mut self, polls: u32) -> Self {
        self.erase_busy_polls = polls;
        self
    }

    /// Override the JEDEC ID
    pub fn with_jedec_id(mut self, id: [u8; 3]) -> Self {
        self.jedec_id = id;
        self
    }

    /// Array contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable array contents
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Mutable SFDP space, to corrupt it
    pub fn sfdp_mut(&mut self) -> &mut Vec<u8> {
        &mut self.sfdp
    }

    /// Current status register value
    pub fn status(&self) -> u8 {
        self.status
    }

    /// Bus activity
    pub fn bus(&self) -> &BusLog {
        &self.bus
    }

    /// Mutable bus activity, to arm faults
    pub fn bus_mut(&mut self) -> &mut BusLog {
        &mut self.bus
    }

    /// Array offset of the address bits actually clocked in
    fn array_address(&self, txn: &Transaction<'_>) -> Result<usize> {
        if !self.address_mode.accepts(txn.address_bits) {
            log::debug!(
                "flash: {}-bit address sent to a {:?} part",
                txn.address_bits,
                self.address_mode
            );
            return Err(Error::Fail);
        }
        let wire = txn.address as u64 & ((1u64 << txn.address_bits) - 1);
        Ok((wire % self.data.len().max(1) as u64) as usize)
    }

    /// Consume the write enable latch, false if it was clear
    fn take_wel(&mut self) -> bool {
        let wel = self.status & nor::SR_WEL != 0;
        self.status &= !nor::SR_WEL;
        wel
    }

    fn handle_read(&mut self, txn: &mut Transaction<'_>) -> Result<()> {
        let addr = self.array_address(txn)?;
        let end = addr + txn.read_buf.len();
        let src = self.data.get(addr..end).ok_or(Error::Fail)?;
        txn.read_buf.copy_from_slice(src);
        Ok(())
    }

    fn handle_read_sfdp(&mut self, txn: &mut Transaction<'_>) -> Result<()> {
        if txn.address_bits != nor::SFDP_ADDRESS_BITS || txn.dummy_bits != nor::SFDP_DUMMY_BITS {
            return Err(Error::Fail);
        }
        for (i, b) in txn.read_buf.iter_mut().enumerate() {
            *b = self.sfdp.get(txn.address as usize + i).copied().unwrap_or(0xFF);
        }
        Ok(())
    }

    fn handle_page_program(&mut self, txn: &Transaction<'_>) -> Result<()> {
        let addr = self.array_address(txn)?;
        if !self.take_wel() {
            log::debug!("flash: page program at {:#x} without WEL ignored", addr);
            return Ok(());
        }
        let base = addr - addr % PROGRAM_PAGE;
        let mut offset = addr % PROGRAM_PAGE;
        for &b in txn.write_data {
            // Flash programming: can only change 1 -> 0
            if let Some(cell) = self.data.get_mut(base + offset) {
                *cell &= b;
            }
            offset = (offset + 1) % PROGRAM_PAGE;
        }
        Ok(())
    }

    fn handle_sector_erase(&mut self, txn: &Transaction<'_>) -> Result<()> {
        let addr = self.array_address(txn)?;
        if !self.take_wel() {
            log::debug!("flash: sector erase at {:#x} without WEL ignored", addr);
            return Ok(());
        }
        let start = addr & !(4096 - 1);
        let end = (start + 4096).min(self.data.len());
        self.data[start..end].fill(0xFF);
        self.busy_polls = self.erase_busy_polls;
        Ok(())
    }
}

impl Transport for DummySfdpFlash {
    fn interface(&self) -> InterfaceType {
        InterfaceType::Spi
    }

    fn write_read(&mut self, _select: u8, txn: &mut Transaction<'_>) -> Result<()> {
        self.bus.operation(BusEvent::Frame {
            opcode: txn.opcode,
            opcode_bits: txn.opcode_bits,
            address: txn.address,
            address_bits: txn.address_bits,
            write_len: txn.write_data.len(),
            read_len: txn.read_buf.len(),
        })?;
        if txn.opcode_bits != 8 {
            return Err(Error::Fail);
        }
        let opcode = txn.opcode as u8;

        if self.busy_polls > 0 && opcode != nor::RDSR {
            log::warn!("flash: opcode {:#04x} while busy", opcode);
            return Err(Error::Fail);
        }

        match opcode {
            nor::WREN => {
                self.status |= nor::SR_WEL;
                Ok(())
            }
            nor::WRDI => {
                self.status &= !nor::SR_WEL;
                Ok(())
            }
            nor::RDSR => {
                let mut sr = self.status;
                if self.busy_polls > 0 {
                    sr |= nor::SR_WIP;
                    self.busy_polls -= 1;
                }
                txn.read_buf.fill(sr);
                Ok(())
            }
            nor::RDID => {
                for (b, id) in txn.read_buf.iter_mut().zip(self.jedec_id.iter()) {
                    *b = *id;
                }
                Ok(())
            }
            nor::RDSFDP => self.handle_read_sfdp(txn),
            nor::READ => self.handle_read(txn),
            nor::PP => self.handle_page_program(txn),
            op if Some(op) == self.erase_4k_opcode => self.handle_sector_erase(txn),
            op => {
                log::debug!("flash: unsupported opcode {:#04x}", op);
                Err(Error::Fail)
            }
        }
    }

    fn deinit(&mut self) -> Result<()> {
        self.bus.record(BusEvent::Deinit);
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.bus.record(BusEvent::Delay(ms));
    }
}
