//! 25xx SPI NOR command framing

use crate::transport::Transaction;

/// Write Enable - required before any write/erase operation
pub const WREN: u8 = 0x06;
/// Write Disable - clears WEL bit in status register
pub const WRDI: u8 = 0x04;
/// Read Status Register
pub const RDSR: u8 = 0x05;
/// Write Status Register
pub const WRSR: u8 = 0x01;
/// Read Data
pub const READ: u8 = 0x03;
/// Page Program
pub const PP: u8 = 0x02;
/// Read JEDEC ID
pub const RDID: u8 = 0x9F;
/// Read SFDP
pub const RDSFDP: u8 = 0x5A;

/// Write In Progress
pub const SR_WIP: u8 = 1 << 0;
/// Write Enable Latch
pub const SR_WEL: u8 = 1 << 1;

/// SFDP space is always addressed with 3 bytes
pub const SFDP_ADDRESS_BITS: u8 = 24;
/// Dummy cycles after an RDSFDP address
pub const SFDP_DUMMY_BITS: u8 = 8;

/// Command with no address or data (WREN, WRDI)
pub fn simple(opcode: u8, timeout_ms: u32) -> Transaction<'static> {
    Transaction::command(opcode as u32, 8).with_timeout(timeout_ms)
}

/// WREN
pub fn write_enable(timeout_ms: u32) -> Transaction<'static> {
    simple(WREN, timeout_ms)
}

/// RDSR into `buf`
pub fn read_status(buf: &mut [u8], timeout_ms: u32) -> Transaction<'_> {
    simple(RDSR, timeout_ms).with_read(buf)
}

/// RDID into `buf`
pub fn read_id(buf: &mut [u8], timeout_ms: u32) -> Transaction<'_> {
    simple(RDID, timeout_ms).with_read(buf)
}

/// READ at an array address
pub fn read<'a>(addr: u32, addr_bits: u8, buf: &'a mut [u8], timeout_ms: u32) -> Transaction<'a> {
    simple(READ, timeout_ms)
        .with_address(addr, addr_bits)
        .with_read(buf)
}

/// PP at an array address, `data` must not cross a page boundary
pub fn page_program<'a>(
    addr: u32,
    addr_bits: u8,
    data: &'a [u8],
    timeout_ms: u32,
) -> Transaction<'a> {
    simple(PP, timeout_ms)
        .with_address(addr, addr_bits)
        .with_write(data)
}

/// Sector erase with a discovered opcode
pub fn sector_erase(opcode: u8, addr: u32, addr_bits: u8, timeout_ms: u32) -> Transaction<'static> {
    simple(opcode, timeout_ms).with_address(addr, addr_bits)
}

/// RDSFDP at an SFDP-space address
pub fn read_sfdp(addr: u32, buf: &mut [u8], timeout_ms: u32) -> Transaction<'_> {
    simple(RDSFDP, timeout_ms)
        .with_address(addr, SFDP_ADDRESS_BITS)
        .with_dummy_bits(SFDP_DUMMY_BITS)
        .with_read(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_sfdp_framing() {
        let mut buf = [0u8; 15];
        let txn = read_sfdp(0, &mut buf, 10);
        assert_eq!(txn.opcode, RDSFDP as u32);
        assert_eq!(txn.header_bits(), 40);
        assert_eq!(txn.read_buf.len(), 15);
    }

    #[test]
    fn test_four_byte_program() {
        let data = [0u8; 4];
        let txn = page_program(0x0100_0000, 32, &data, 1);
        let mut hdr = [0u8; 5];
        assert_eq!(txn.encode_header(&mut hdr), Ok(40));
        assert_eq!(hdr, [PP, 0x01, 0x00, 0x00, 0x00]);
    }
}
