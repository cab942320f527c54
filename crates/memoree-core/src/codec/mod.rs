//! Address and command codec
//!
//! Builds the bytes or bit frames each family expects on the wire. The I2C
//! family sends its address in-band ([`address`]); Microwire and SPI NOR
//! parts carry opcode and address in the transaction header ([`microwire`],
//! [`nor`]).

pub mod address;
pub mod microwire;
pub mod nor;

pub use address::{
    address_space_bits, device_select, in_band_address, in_band_frame, mask_address, InBandFrame,
    MAX_PAGE_SIZE,
};

/// Timeout for moving `bytes` at `speed_hz`, never below 1 ms
///
/// Used whenever a caller passes a timeout of 0.
pub fn default_timeout_ms(bytes: usize, speed_hz: u32) -> u32 {
    if speed_hz == 0 {
        return 1;
    }
    let ms = (bytes as u64 * 8000) / speed_hz as u64;
    ms.clamp(1, u32::MAX as u64) as u32
}

/// `timeout_ms`, or the default for `bytes` when it is 0
pub fn effective_timeout_ms(timeout_ms: u32, bytes: usize, speed_hz: u32) -> u32 {
    if timeout_ms == 0 {
        default_timeout_ms(bytes, speed_hz)
    } else {
        timeout_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout() {
        assert_eq!(default_timeout_ms(1, 400_000), 1);
        assert_eq!(default_timeout_ms(1000, 400_000), 20);
        assert_eq!(default_timeout_ms(131072, 2_000_000), 524);
        assert_eq!(effective_timeout_ms(50, 1000, 400_000), 50);
    }
}
