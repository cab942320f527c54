//! Bus transaction structure

use crate::error::{Error, Result};

/// A single framed bus transaction
///
/// Designed to avoid allocation - uses slices for data. SPI and Microwire
/// transactions carry an opcode and an address of arbitrary bit width, I2C
/// transactions only use the data slices.
pub struct Transaction<'a> {
    /// Opcode value, right-aligned
    pub opcode: u32,
    /// Number of opcode bits to clock out
    pub opcode_bits: u8,

    /// Address value, right-aligned
    pub address: u32,
    /// Number of address bits to clock out
    pub address_bits: u8,

    /// Number of dummy bits after the address
    pub dummy_bits: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into (mutable)
    pub read_buf: &'a mut [u8],

    /// Timeout handed to the transport, in ms
    pub timeout_ms: u32,
}

impl<'a> Transaction<'a> {
    /// Create a command with no address or data
    pub fn command(opcode: u32, opcode_bits: u8) -> Self {
        Self {
            opcode,
            opcode_bits,
            address: 0,
            address_bits: 0,
            dummy_bits: 0,
            write_data: &[],
            read_buf: &mut [],
            timeout_ms: 0,
        }
    }

    /// Create a plain data transaction (I2C, or a raw SPI transfer)
    pub fn data(write_data: &'a [u8], read_buf: &'a mut [u8], timeout_ms: u32) -> Self {
        Self {
            write_data,
            read_buf,
            timeout_ms,
            ..Self::command(0, 0)
        }
    }

    /// Set the address phase
    pub fn with_address(mut self, address: u32, bits: u8) -> Self {
        self.address = address;
        self.address_bits = bits;
        self
    }

    /// Set the number of dummy bits
    pub fn with_dummy_bits(mut self, bits: u8) -> Self {
        self.dummy_bits = bits;
        self
    }

    /// Set the data to write after the header
    pub fn with_write(mut self, data: &'a [u8]) -> Self {
        self.write_data = data;
        self
    }

    /// Set the buffer to read into
    pub fn with_read(mut self, buf: &'a mut [u8]) -> Self {
        self.read_buf = buf;
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Returns true if this transaction has a write phase
    pub fn has_write(&self) -> bool {
        !self.write_data.is_empty()
    }

    /// Number of bits in opcode, address and dummy phases
    pub fn header_bits(&self) -> usize {
        self.opcode_bits as usize + self.address_bits as usize + self.dummy_bits as usize
    }

    /// Number of bytes needed to hold the header
    pub fn header_len(&self) -> usize {
        self.header_bits().div_ceil(8)
    }

    /// Pack opcode, address and dummy bits MSB first into `buf`
    ///
    /// Dummy bits are sent as zeros and the trailing bits of the last byte
    /// are left clear. Returns the number of header bits, so bit-level
    /// transports know how many clocks to issue.
    pub fn encode_header(&self, buf: &mut [u8]) -> Result<usize> {
        if self.opcode_bits > 32 || self.address_bits > 32 {
            return Err(Error::InvalidArgument);
        }
        let len = self.header_len();
        let out = buf.get_mut(..len).ok_or(Error::OutOfMemory)?;
        out.fill(0);

        let mut pos = 0;
        for (value, bits) in [
            (self.opcode, self.opcode_bits),
            (self.address, self.address_bits),
            (0, self.dummy_bits),
        ] {
            for i in (0..bits as u32).rev() {
                if i < 32 && (value >> i) & 1 != 0 {
                    out[pos / 8] |= 0x80 >> (pos % 8);
                }
                pos += 1;
            }
        }

        Ok(pos)
    }
}

impl core::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Transaction")
            .field("opcode", &format_args!("{:#x}/{}", self.opcode, self.opcode_bits))
            .field("address", &format_args!("{:#x}/{}", self.address, self.address_bits))
            .field("dummy_bits", &self.dummy_bits)
            .field("write_len", &self.write_data.len())
            .field("read_len", &self.read_buf.len())
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microwire_read_header() {
        // 93C46: start bit + "10", 7-bit address
        let txn = Transaction::command(0b110, 3).with_address(0x55, 7);
        let mut buf = [0xAAu8; 4];
        assert_eq!(txn.encode_header(&mut buf), Ok(10));
        assert_eq!(txn.header_len(), 2);
        assert_eq!(&buf[..2], &[0xD5, 0x40]);
        // Bytes past the header are untouched
        assert_eq!(buf[2], 0xAA);
    }

    #[test]
    fn test_spi_header_with_dummy() {
        let txn = Transaction::command(0x5A, 8)
            .with_address(0x000010, 24)
            .with_dummy_bits(8);
        let mut buf = [0xFFu8; 5];
        assert_eq!(txn.encode_header(&mut buf), Ok(40));
        assert_eq!(buf, [0x5A, 0x00, 0x00, 0x10, 0x00]);
    }

    #[test]
    fn test_header_buffer_too_small() {
        let txn = Transaction::command(0x03, 8).with_address(0, 24);
        let mut buf = [0u8; 3];
        assert_eq!(txn.encode_header(&mut buf), Err(Error::OutOfMemory));
    }

    #[test]
    fn test_data_transaction_has_no_header() {
        let data = [1u8, 2];
        let mut read = [0u8; 3];
        let txn = Transaction::data(&data, &mut read, 7);
        assert_eq!(txn.header_bits(), 0);
        assert!(txn.has_write());
        assert!(!Transaction::command(0x06, 8).has_write());
        assert_eq!(txn.timeout_ms, 7);
    }
}
