//! 24xx I2C EEPROM emulator

use alloc::vec;
use alloc::vec::Vec;

use memoree_core::error::{Error, Result};
use memoree_core::transport::{Transaction, Transport};
use memoree_core::variant::{descriptor, Family, Geometry, InterfaceType, Variant};

use crate::bus::{BusEvent, BusLog};

/// Emulated 24xx EEPROM
///
/// The part answers on the base select address with the block bits of
/// folding parts in bits 3:1. Page writes roll over inside the page and
/// start a write cycle during which the part does not acknowledge; the
/// cycle ends after the page write delay has been spent in
/// [`Transport::delay_ms`].
pub struct DummyI2cEeprom {
    geometry: Geometry,
    base: u8,
    block_mask: u8,
    data: Vec<u8>,
    pointer: u32,
    write_cycle_ms: u32,
    busy_ms: u32,
    bus: BusLog,
}

impl DummyI2cEeprom {
    /// Create an erased part at select address 0x50
    pub fn new(variant: Variant) -> Result<Self> {
        let desc = descriptor(variant);
        if desc.family() != Family::I2cEeprom {
            return Err(Error::InvalidArgument);
        }
        let g = desc.geometry;
        let space = u32::BITS - (g.size - 1).leading_zeros();
        let block_bits = space.saturating_sub(g.addr_len as u32);
        Ok(Self {
            geometry: g,
            base: 0x50,
            block_mask: (((1u32 << block_bits) - 1) << 1) as u8,
            data: vec![0xFF; g.size as usize],
            pointer: 0,
            write_cycle_ms: g.page_write_delay_ms as u32,
            busy_ms: 0,
            bus: BusLog::default(),
        })
    }

    /// Answer on a different base select address
    pub fn with_base_address(mut self, base: u8) -> Self {
        self.base = base;
        self
    }

    /// Override the write cycle time
    pub fn with_write_cycle_ms(mut self, ms: u32) -> Self {
        self.write_cycle_ms = ms;
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

    /// Bus activity
    pub fn bus(&self) -> &BusLog {
        &self.bus
    }

    /// Mutable bus activity, to arm faults
    pub fn bus_mut(&mut self) -> &mut BusLog {
        &mut self.bus
    }

    /// Returns true while a write cycle is in progress
    pub fn is_busy(&self) -> bool {
        self.busy_ms > 0
    }

    /// Block number encoded in `select`, or None if the part does not answer
    fn block(&self, select: u8) -> Option<u32> {
        if select & !self.block_mask != self.base & !self.block_mask || self.is_busy() {
            return None;
        }
        Some(((select & self.block_mask) >> 1) as u32)
    }

    fn address_bytes(&self) -> usize {
        self.geometry.addr_len as usize / 8
    }

    /// Load the address pointer from the in-band address bytes
    fn set_pointer(&mut self, block: u32, bytes: &[u8]) {
        let in_band = bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32);
        let addr = (block << self.geometry.addr_len) | in_band;
        self.pointer = addr & (self.geometry.size - 1);
    }

    /// Page write starting at the pointer, rolling over inside the page
    fn program(&mut self, payload: &[u8]) {
        let page = self.geometry.page_size as u32;
        let base = self.pointer - self.pointer % page;
        let mut offset = self.pointer % page;
        for &b in payload {
            self.data[(base + offset) as usize] = b;
            offset = (offset + 1) % page;
        }
        self.pointer = base + offset;
        self.busy_ms = self.write_cycle_ms;
        log::debug!("24xx: wrote {} bytes in page at {:#x}", payload.len(), base);
    }

    /// Sequential read, rolling over at the end of the array
    fn read_sequential(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.data[self.pointer as usize];
            self.pointer = (self.pointer + 1) % self.geometry.size;
        }
    }

    fn handle_write(&mut self, select: u8, data: &[u8]) -> Result<()> {
        let block = self.block(select).ok_or(Error::Fail)?;
        let n = self.address_bytes();
        if data.len() < n {
            log::debug!("24xx: write of {} bytes has no full address", data.len());
            return Err(Error::Fail);
        }
        let (address, payload) = data.split_at(n);
        self.set_pointer(block, address);
        if !payload.is_empty() {
            self.program(payload);
        }
        Ok(())
    }
}

impl Transport for DummyI2cEeprom {
    fn interface(&self) -> InterfaceType {
        InterfaceType::I2c
    }

    fn write(&mut self, select: u8, data: &[u8], _timeout_ms: u32) -> Result<usize> {
        self.bus.operation(BusEvent::Write {
            select,
            len: data.len(),
        })?;
        self.handle_write(select, data)?;
        Ok(data.len())
    }

    fn read(&mut self, select: u8, buf: &mut [u8], _timeout_ms: u32) -> Result<usize> {
        self.bus.operation(BusEvent::Read {
            select,
            len: buf.len(),
        })?;
        self.block(select).ok_or(Error::Fail)?;
        self.read_sequential(buf);
        Ok(buf.len())
    }

    fn write_read(&mut self, select: u8, txn: &mut Transaction<'_>) -> Result<()> {
        self.bus.operation(BusEvent::WriteRead {
            select,
            write_len: txn.write_data.len(),
            read_len: txn.read_buf.len(),
        })?;
        if txn.header_bits() != 0 {
            return Err(Error::InvalidArgument);
        }
        if txn.has_write() {
            self.handle_write(select, txn.write_data)?;
        }
        self.block(select).ok_or(Error::Fail)?;
        self.read_sequential(txn.read_buf);
        Ok(())
    }

    fn ping(&mut self, select: u8, _timeout_ms: u32) -> Result<()> {
        let acked = self.block(select).is_some();
        self.bus.record(BusEvent::Ping { select, acked });
        if acked {
            Ok(())
        } else {
            Err(Error::Fail)
        }
    }

    fn deinit(&mut self) -> Result<()> {
        self.bus.record(BusEvent::Deinit);
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.bus.record(BusEvent::Delay(ms));
        self.busy_ms = self.busy_ms.saturating_sub(ms);
    }
}
