//! In-band addressing for 24xx parts
//!
//! The byte address goes on the wire ahead of the payload. Parts whose array
//! is larger than their native address field take the excess high bits in
//! the device-select byte instead.

use crate::error::{Error, Result};

/// Largest page the in-band frame has room for
pub const MAX_PAGE_SIZE: usize = 256;

/// Widest in-band address
pub const MAX_ADDR_BYTES: usize = 4;

/// Address bytes followed by up to one page of payload
pub type InBandFrame = heapless::Vec<u8, { MAX_PAGE_SIZE + MAX_ADDR_BYTES }>;

/// Number of bits needed to address every byte of an array of `size` bytes
///
/// `size` must be a non-zero power of two.
pub fn address_space_bits(size: u32) -> Result<u8> {
    if !size.is_power_of_two() {
        return Err(Error::InvalidArgument);
    }
    Ok((u32::BITS - (size - 1).leading_zeros()) as u8)
}

/// Device-select byte for `addr`
///
/// When the native field (`addr_len` bits) is narrower than the address
/// space (`space_bits`), the bits above the field are shifted into bits 3:1
/// of `base`. Otherwise `base` is returned as is.
pub const fn device_select(base: u8, addr: u32, addr_len: u8, space_bits: u8) -> u8 {
    if addr_len >= space_bits || addr_len >= 32 {
        return base;
    }
    base | (((addr >> addr_len) << 1) & 0x0F) as u8
}

/// The in-band address bytes, MSB first
///
/// Only the low `addr_len` bits of `addr` are emitted; the rest live in the
/// device-select byte.
pub fn in_band_address(addr: u32, addr_len: u8) -> Result<heapless::Vec<u8, MAX_ADDR_BYTES>> {
    if addr_len % 8 != 0 || addr_len as usize > MAX_ADDR_BYTES * 8 {
        return Err(Error::InvalidArgument);
    }
    let n = (addr_len / 8) as usize;
    let bytes = addr.to_be_bytes();
    heapless::Vec::from_slice(&bytes[MAX_ADDR_BYTES - n..]).map_err(|_| Error::OutOfMemory)
}

/// Prepend the in-band address to `payload` in one contiguous buffer
pub fn in_band_frame(addr: u32, addr_len: u8, payload: &[u8]) -> Result<InBandFrame> {
    let address = in_band_address(addr, addr_len)?;
    let mut frame = InBandFrame::new();
    frame
        .extend_from_slice(&address)
        .and_then(|_| frame.extend_from_slice(payload))
        .map_err(|_| Error::OutOfMemory)?;
    Ok(frame)
}

/// Wrap `addr` into an array of `size` bytes (a power of two)
pub const fn mask_address(addr: u32, size: u32) -> u32 {
    if size == 0 {
        addr
    } else {
        addr & (size - 1)
    }
}
