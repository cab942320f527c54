//! Page and full-array erase

use super::Memory;
use crate::codec::{microwire, nor, MAX_PAGE_SIZE};
use crate::engine::{erase, EraseStrategy, PageErase};
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::variant::Features;

/// Polls of the status register after a sector erase, 1 ms apart
const SECTOR_ERASE_POLLS: u32 = 400;

impl<T: Transport> Memory<T> {
    /// Set every byte of one page to `value`
    ///
    /// Microwire parts use ERASE for 0xFF and a WRITE of `value` otherwise;
    /// other families write a page filled with `value`.
    pub fn erase_page(&mut self, page: u32, value: u8) -> Result<()> {
        self.require_addressable()?;
        if !self.geometry.is_valid_page(page) {
            return Err(Error::InvalidArgument);
        }
        let addr = page * self.geometry.page_size as u32;
        let addr_len = self.geometry.addr_len;

        match PageErase::plan(self.descriptor.features, value)? {
            PageErase::EraseLocation => {
                self.write_enable()?;
                self.execute(&mut microwire::erase(addr, addr_len, 0))?;
                self.settle();
                Ok(())
            }
            PageErase::WriteLocation(value) => {
                self.write_enable()?;
                let data = [value];
                self.execute(&mut microwire::write(addr, addr_len, &data, 0))?;
                self.settle();
                Ok(())
            }
            PageErase::Fill(value) => self.fill_page(page, value),
        }
    }

    /// Set every byte of the array to `value`
    ///
    /// SPI NOR parts run SFDP discovery first if it has not succeeded yet.
    /// The first failure stops the erase.
    pub fn erase(&mut self, value: u8) -> Result<()> {
        let features = self.descriptor.features;
        if features.contains(Features::RAW_ONLY) {
            return Err(Error::InvalidArgument);
        }
        if features.contains(Features::SFDP) && !self.sfdp_state.is_parsed() {
            self.discover(0)?;
        }
        self.require_addressable()?;

        let erase_4k = self.sfdp.map(|p| p.erase_4k_opcode).unwrap_or(0);
        let strategy = EraseStrategy::plan(features, value, erase_4k)?;
        log::debug!("Erasing {} bytes to {:#04x} ({:?})", self.geometry.size, value, strategy);

        match strategy {
            EraseStrategy::EraseAll => {
                self.write_enable()?;
                let mut txn = microwire::erase_all(self.geometry.addr_len, 0);
                self.execute(&mut txn)?;
                self.settle();
                Ok(())
            }
            EraseStrategy::WriteEach(value) => {
                self.write_enable()?;
                let data = [value];
                for addr in 0..self.geometry.size {
                    let mut txn = microwire::write(addr, self.geometry.addr_len, &data, 0);
                    self.execute(&mut txn).inspect_err(|e| {
                        log::error!("Erase failed at address {:#x}: {}", addr, e);
                    })?;
                    self.settle();
                }
                Ok(())
            }
            EraseStrategy::Sectors { opcode, fill } => {
                self.erase_sectors(opcode)?;
                match fill {
                    Some(value) => self.fill_all(value),
                    None => Ok(()),
                }
            }
            EraseStrategy::PageFill(value) => self.fill_all(value),
        }
    }

    fn erase_sectors(&mut self, opcode: u8) -> Result<()> {
        let page_size = self.geometry.page_size as u32;
        for addr in erase::sectors(self.geometry.size) {
            self.erase_sector(opcode, addr).inspect_err(|e| {
                log::error!("Erase failed at page {}: {}", addr / page_size, e);
            })?;
        }
        Ok(())
    }

    fn erase_sector(&mut self, opcode: u8, addr: u32) -> Result<()> {
        log::trace!("Sector erase {:#04x} at {:#x}", opcode, addr);
        self.write_enable()?;
        self.execute(&mut nor::sector_erase(opcode, addr, self.geometry.addr_len, 0))?;
        self.settle();
        self.wait_ready(SECTOR_ERASE_POLLS)
    }

    /// Poll RDSR until Write In Progress clears
    fn wait_ready(&mut self, polls: u32) -> Result<()> {
        for _ in 0..polls {
            let mut sr = [0u8; 1];
            self.execute(&mut nor::read_status(&mut sr, 0))?;
            if sr[0] & nor::SR_WIP == 0 {
                return Ok(());
            }
            self.transport.delay_ms(1);
        }
        Err(Error::Timeout)
    }

    fn fill_all(&mut self, value: u8) -> Result<()> {
        for page in 0..self.geometry.num_pages() {
            self.fill_page(page, value).inspect_err(|e| {
                log::error!("Erase failed at page {}: {}", page, e);
            })?;
        }
        Ok(())
    }

    fn fill_page(&mut self, page: u32, value: u8) -> Result<()> {
        let page_size = self.geometry.page_size as usize;
        if page_size > MAX_PAGE_SIZE {
            return Err(Error::OutOfMemory);
        }
        let buf = [value; MAX_PAGE_SIZE];
        let addr = page * page_size as u32;
        match self.write(addr, &buf[..page_size], 0, false)? {
            n if n == page_size => Ok(()),
            _ => Err(Error::Fail),
        }
    }
}
