//! Reads and paged writes

use super::Memory;
use crate::codec::{self, microwire, nor};
use crate::engine::{write_paged, ChunkSink};
use crate::error::{Error, PartialWrite, Result};
use crate::transport::{Transaction, Transport};
use crate::variant::{Family, Features};

impl<T: Transport> Memory<T> {
    /// Read one byte
    pub fn read_byte(&mut self, addr: u32, timeout_ms: u32) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read(addr, &mut buf, timeout_ms)?;
        Ok(buf[0])
    }

    /// Write one byte and wait for it to be committed
    pub fn write_byte(&mut self, addr: u32, value: u8, timeout_ms: u32) -> Result<()> {
        match self.write(addr, &[value], timeout_ms, false)? {
            1 => Ok(()),
            _ => Err(Error::Fail),
        }
    }

    /// Read `buf.len()` bytes starting at `addr`
    ///
    /// A read running past the end of the array continues at address 0.
    /// Returns the number of bytes read.
    pub fn read(&mut self, addr: u32, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        self.require_addressable()?;
        let size = self.geometry.size;
        if !self.geometry.is_valid_address(addr) || buf.len() as u64 > size as u64 {
            return Err(Error::InvalidArgument);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let to_end = (size - addr) as usize;
        if buf.len() > to_end {
            let (head, tail) = buf.split_at_mut(to_end);
            self.read_span(addr, head, timeout_ms)?;
            self.read_span(0, tail, timeout_ms)?;
        } else {
            self.read_span(addr, buf, timeout_ms)?;
        }
        Ok(buf.len())
    }

    fn read_span(&mut self, addr: u32, buf: &mut [u8], timeout_ms: u32) -> Result<()> {
        let g = self.geometry;
        log::trace!("Read {} bytes at {:#x}", buf.len(), addr);

        match self.family() {
            Family::I2cEeprom => {
                let select = self.select_for(addr)?;
                let address = codec::in_band_address(addr, g.addr_len)?;
                let timeout = codec::effective_timeout_ms(timeout_ms, address.len() + buf.len(), self.speed_hz);
                let mut txn = Transaction::data(&address, buf, timeout);
                self.transport.write_read(select, &mut txn)
            }
            Family::Microwire => {
                let mut txn = microwire::read(addr, g.addr_len, buf, timeout_ms);
                self.execute(&mut txn)
            }
            Family::SpiNor => {
                let addr = codec::mask_address(addr, g.size);
                let mut txn = nor::read(addr, g.addr_len, buf, timeout_ms);
                self.execute(&mut txn)
            }
            Family::Stub(_) => Err(Error::InvalidArgument),
        }
    }

    /// Write `data` starting at `addr`
    ///
    /// The data is split at page boundaries and the page-write delay is
    /// observed after every chunk. Past the end of the array the write
    /// continues at address 0 when `wrap` is set, otherwise it is truncated
    /// and the shorter count returned. A timeout of 0 picks one from the
    /// chunk length and bus speed.
    pub fn write(&mut self, addr: u32, data: &[u8], timeout_ms: u32, wrap: bool) -> Result<usize> {
        self.write_counted(addr, data, timeout_ms, wrap)
            .map_err(|partial| partial.error)
    }

    /// Like [`Memory::write`], but reports how much was written before a
    /// failure
    pub fn write_counted(
        &mut self,
        addr: u32,
        data: &[u8],
        timeout_ms: u32,
        wrap: bool,
    ) -> core::result::Result<usize, PartialWrite> {
        self.require_addressable()?;
        if data.is_empty() {
            return Ok(0);
        }
        if !self.geometry.is_valid_address(addr) {
            return Err(Error::InvalidArgument.into());
        }

        // Parts without an auto-clearing latch stay enabled until disabled
        if !self.has(Features::WEL_AUTO_CLEAR) {
            self.write_enable()?;
        }

        let geometry = self.geometry;
        let mut sink = Programmer {
            memory: self,
            timeout_ms,
        };
        write_paged(&mut sink, &geometry, addr, data, wrap)
    }

    /// Frame and send one page-bounded chunk
    fn program_chunk(&mut self, addr: u32, data: &[u8], timeout_ms: u32) -> Result<()> {
        let g = self.geometry;
        match self.family() {
            Family::I2cEeprom => {
                let select = self.select_for(addr)?;
                let frame = codec::in_band_frame(addr, g.addr_len, data)?;
                let timeout = codec::effective_timeout_ms(timeout_ms, frame.len(), self.speed_hz);
                let sent = self.transport.write(select, &frame, timeout)?;
                if sent != frame.len() {
                    log::debug!("Short write at {:#x}: {} of {} bytes", addr, sent, frame.len());
                    return Err(Error::Fail);
                }
                Ok(())
            }
            Family::Microwire => {
                let mut txn = microwire::write(addr, g.addr_len, data, timeout_ms);
                self.execute(&mut txn)
            }
            Family::SpiNor => {
                if self.has(Features::WEL_AUTO_CLEAR) {
                    self.write_enable()?;
                }
                let addr = codec::mask_address(addr, g.size);
                let mut txn = nor::page_program(addr, g.addr_len, data, timeout_ms);
                self.execute(&mut txn)
            }
            Family::Stub(_) => Err(Error::InvalidArgument),
        }
    }

    /// Device-select byte for an I2C array address
    fn select_for(&self, addr: u32) -> Result<u8> {
        if !self.descriptor.folds_select() {
            return Ok(self.select);
        }
        let space = codec::address_space_bits(self.geometry.size)?;
        Ok(codec::device_select(self.select, addr, self.geometry.addr_len, space))
    }
}

/// Feeds write engine chunks to a memory handle
struct Programmer<'m, T: Transport> {
    memory: &'m mut Memory<T>,
    timeout_ms: u32,
}

impl<T: Transport> ChunkSink for Programmer<'_, T> {
    fn program(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.memory.program_chunk(addr, data, self.timeout_ms)
    }

    fn settle(&mut self) {
        self.memory.settle();
    }
}
