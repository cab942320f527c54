//! 93Cxx Microwire command framing
//!
//! Opcodes include the leading start bit. The three-bit commands are
//! followed by the full address field; the five-bit commands take the top
//! two address bits as part of the opcode and pad the rest with don't-care
//! bits.

use crate::transport::Transaction;

/// Bits in READ, WRITE and ERASE opcodes
pub const SHORT_OPCODE_BITS: u8 = 3;
/// Bits in EWEN, EWDS, ERAL and WRAL opcodes
pub const LONG_OPCODE_BITS: u8 = 5;

/// Read data
pub const READ: u32 = 0b110;
/// Write one location
pub const WRITE: u32 = 0b101;
/// Erase one location to 0xFF
pub const ERASE: u32 = 0b111;
/// Erase/write enable
pub const EWEN: u32 = 0b10011;
/// Erase/write disable
pub const EWDS: u32 = 0b10000;
/// Erase the whole array
pub const ERAL: u32 = 0b10010;
/// Write the whole array with one value
pub const WRAL: u32 = 0b10001;

fn long_command(opcode: u32, addr_bits: u8, timeout_ms: u32) -> Transaction<'static> {
    Transaction::command(opcode, LONG_OPCODE_BITS)
        .with_address(0, addr_bits.saturating_sub(2))
        .with_timeout(timeout_ms)
}

/// READ starting at `addr`
pub fn read<'a>(addr: u32, addr_bits: u8, buf: &'a mut [u8], timeout_ms: u32) -> Transaction<'a> {
    Transaction::command(READ, SHORT_OPCODE_BITS)
        .with_address(addr, addr_bits)
        .with_read(buf)
        .with_timeout(timeout_ms)
}

/// WRITE of `data` at `addr`
pub fn write<'a>(addr: u32, addr_bits: u8, data: &'a [u8], timeout_ms: u32) -> Transaction<'a> {
    Transaction::command(WRITE, SHORT_OPCODE_BITS)
        .with_address(addr, addr_bits)
        .with_write(data)
        .with_timeout(timeout_ms)
}

/// ERASE of the location at `addr`
pub fn erase(addr: u32, addr_bits: u8, timeout_ms: u32) -> Transaction<'static> {
    Transaction::command(ERASE, SHORT_OPCODE_BITS)
        .with_address(addr, addr_bits)
        .with_timeout(timeout_ms)
}

/// EWEN
pub fn write_enable(addr_bits: u8, timeout_ms: u32) -> Transaction<'static> {
    long_command(EWEN, addr_bits, timeout_ms)
}

/// EWDS
pub fn write_disable(addr_bits: u8, timeout_ms: u32) -> Transaction<'static> {
    long_command(EWDS, addr_bits, timeout_ms)
}

/// ERAL
pub fn erase_all(addr_bits: u8, timeout_ms: u32) -> Transaction<'static> {
    long_command(ERAL, addr_bits, timeout_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(txn: &Transaction<'_>) -> (usize, [u8; 4]) {
        let mut buf = [0u8; 4];
        let bits = txn.encode_header(&mut buf).unwrap();
        (bits, buf)
    }

    #[test]
    fn test_long_commands_fill_address_field() {
        // 93C46 (7 address bits): 10011 + 5 don't-care bits
        let (bits, buf) = header(&write_enable(7, 0));
        assert_eq!(bits, 10);
        assert_eq!(&buf[..2], &[0b1001_1000, 0]);

        // 93C86 (11 address bits): 10010 + 9 bits
        let (bits, buf) = header(&erase_all(11, 0));
        assert_eq!(bits, 14);
        assert_eq!(&buf[..2], &[0b1001_0000, 0]);
    }

    #[test]
    fn test_short_commands_carry_full_address() {
        let (bits, buf) = header(&erase(0x1FF, 9, 0));
        assert_eq!(bits, 12);
        assert_eq!(&buf[..2], &[0b1111_1111, 0b1111_0000]);

        let data = [0x5A];
        let txn = write(0x01, 7, &data, 3);
        let (bits, buf) = header(&txn);
        assert_eq!(bits, 10);
        assert_eq!(&buf[..2], &[0b1010_0000, 0b0100_0000]);
        assert_eq!(txn.write_data, &[0x5A]);
        assert_eq!(txn.timeout_ms, 3);
    }
}
