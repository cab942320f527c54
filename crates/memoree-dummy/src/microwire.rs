//! 93Cxx Microwire EEPROM emulator

use alloc::vec;
use alloc::vec::Vec;

use memoree_core::codec::microwire::{self, LONG_OPCODE_BITS, SHORT_OPCODE_BITS};
use memoree_core::error::{Error, Result};
use memoree_core::transport::{Transaction, Transport};
use memoree_core::variant::{descriptor, Family, Geometry, InterfaceType, Variant};

use crate::bus::{BusEvent, BusLog};

/// Reads a packed MSB-first header one field at a time
struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, bits: u8) -> u32 {
        let mut value = 0u32;
        for _ in 0..bits {
            let byte = self.bytes.get(self.pos / 8).copied().unwrap_or(0);
            let bit = (byte >> (7 - self.pos % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.pos += 1;
        }
        value
    }
}

/// A decoded Microwire instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Instruction {
    Read(u32),
    Write(u32),
    Erase(u32),
    Ewen,
    Ewds,
    Eral,
    Wral,
}

/// Emulated 93Cxx EEPROM in x8 organization
///
/// Instructions are decoded from the serialized header bits, so a frame
/// with the wrong field widths is rejected the way a real part would
/// misread it. Programming is self-timed and needs a prior EWEN; writes
/// and erases while disabled are ignored.
pub struct DummyMicrowire {
    geometry: Geometry,
    data: Vec<u8>,
    write_enabled: bool,
    bus: BusLog,
}

impl DummyMicrowire {
    /// Create an erased part
    pub fn new(variant: Variant) -> Result<Self> {
        let desc = descriptor(variant);
        if desc.family() != Family::Microwire {
            return Err(Error::InvalidArgument);
        }
        Ok(Self {
            geometry: desc.geometry,
            data: vec![0xFF; desc.geometry.size as usize],
            write_enabled: false,
            bus: BusLog::default(),
        })
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

    /// Returns true after EWEN until EWDS
    pub fn is_write_enabled(&self) -> bool {
        self.write_enabled
    }

    fn decode(&self, txn: &Transaction<'_>) -> Result<Instruction> {
        let mut header = [0u8; 8];
        let bits = txn.encode_header(&mut header)?;
        let addr_bits = self.geometry.addr_len;

        let mut reader = BitReader::new(&header);
        let short = reader.take(SHORT_OPCODE_BITS);
        let insn = match short {
            microwire::READ => Instruction::Read(reader.take(addr_bits)),
            microwire::WRITE => Instruction::Write(reader.take(addr_bits)),
            microwire::ERASE => Instruction::Erase(reader.take(addr_bits)),
            0b100 => {
                let sub = reader.take(LONG_OPCODE_BITS - SHORT_OPCODE_BITS);
                reader.take(addr_bits - (LONG_OPCODE_BITS - SHORT_OPCODE_BITS));
                match (short << 2) | sub {
                    microwire::EWEN => Instruction::Ewen,
                    microwire::EWDS => Instruction::Ewds,
                    microwire::ERAL => Instruction::Eral,
                    _ => Instruction::Wral,
                }
            }
            _ => {
                log::debug!("93Cxx: no start bit in header {:03b}", short);
                return Err(Error::Fail);
            }
        };

        if reader.pos + txn.dummy_bits as usize != bits {
            log::debug!("93Cxx: {} header bits, expected {}", bits, reader.pos);
            return Err(Error::Fail);
        }
        Ok(insn)
    }

    fn program(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let [value] = data else {
            log::debug!("93Cxx: write of {} bytes, x8 parts take one", data.len());
            return Err(Error::Fail);
        };
        if !self.write_enabled {
            log::debug!("93Cxx: write to {:#x} ignored, not enabled", addr);
            return Ok(());
        }
        self.data[addr as usize] = *value;
        Ok(())
    }
}

impl Transport for DummyMicrowire {
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

        match self.decode(txn)? {
            Instruction::Read(addr) => {
                let size = self.data.len();
                for (i, b) in txn.read_buf.iter_mut().enumerate() {
                    *b = self.data[(addr as usize + i) % size];
                }
                Ok(())
            }
            Instruction::Write(addr) => self.program(addr, txn.write_data),
            Instruction::Erase(addr) => self.program(addr, &[0xFF]),
            Instruction::Ewen => {
                self.write_enabled = true;
                Ok(())
            }
            Instruction::Ewds => {
                self.write_enabled = false;
                Ok(())
            }
            Instruction::Eral => {
                if self.write_enabled {
                    self.data.fill(0xFF);
                }
                Ok(())
            }
            Instruction::Wral => {
                let [value] = txn.write_data else {
                    return Err(Error::Fail);
                };
                if self.write_enabled {
                    self.data.fill(*value);
                }
                Ok(())
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
