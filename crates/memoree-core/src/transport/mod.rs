//! Bus transport abstraction
//!
//! The core never touches hardware. A platform supplies a [`Transport`]
//! that moves bytes on an I2C bus or executes framed [`Transaction`]s on an
//! SPI/Microwire bus, and sleeps on request.

mod interface;
mod transaction;

pub use interface::{I2cConfig, InterfaceConfig, SpiConfig, SpiMode};
pub use transaction::Transaction;

use crate::error::{Error, Result};
use crate::variant::InterfaceType;

/// Platform bus driver
///
/// I2C transports implement `write`, `read`, `ping` and `write_read`; SPI
/// transports only need `write_read`. `select` is the device-select address
/// on I2C and is ignored on SPI.
///
/// ## Example
///
/// ```ignore
/// impl Transport for LinuxI2c {
///     fn interface(&self) -> InterfaceType {
///         InterfaceType::I2c
///     }
///
///     fn write(&mut self, select: u8, data: &[u8], _timeout_ms: u32) -> Result<usize> {
///         self.dev.set_slave_address(select as u16).map_err(|_| Error::Fail)?;
///         self.dev.write(data).map_err(|_| Error::Fail)
///     }
///     // ...
/// }
/// ```
pub trait Transport {
    /// Bus type this transport drives
    fn interface(&self) -> InterfaceType;

    /// Write `data` to the device at `select`
    ///
    /// Returns the number of bytes acknowledged.
    fn write(&mut self, _select: u8, _data: &[u8], _timeout_ms: u32) -> Result<usize> {
        Err(Error::InvalidArgument)
    }

    /// Read `buf.len()` bytes from the device at `select`
    ///
    /// Returns the number of bytes received.
    fn read(&mut self, _select: u8, _buf: &mut [u8], _timeout_ms: u32) -> Result<usize> {
        Err(Error::InvalidArgument)
    }

    /// Execute one transaction
    ///
    /// On I2C this is a write of `txn.write_data` followed by a
    /// repeated-start read into `txn.read_buf`. On SPI it is one
    /// chip-select-framed transfer of header, write data and read data.
    fn write_read(&mut self, select: u8, txn: &mut Transaction<'_>) -> Result<()>;

    /// Check whether a device acknowledges `select`
    fn ping(&mut self, _select: u8, _timeout_ms: u32) -> Result<()> {
        Err(Error::InvalidArgument)
    }

    /// Release the bus
    fn deinit(&mut self) -> Result<()> {
        Ok(())
    }

    /// Blocking sleep
    fn delay_ms(&mut self, ms: u32);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn interface(&self) -> InterfaceType {
        (**self).interface()
    }

    fn write(&mut self, select: u8, data: &[u8], timeout_ms: u32) -> Result<usize> {
        (**self).write(select, data, timeout_ms)
    }

    fn read(&mut self, select: u8, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        (**self).read(select, buf, timeout_ms)
    }

    fn write_read(&mut self, select: u8, txn: &mut Transaction<'_>) -> Result<()> {
        (**self).write_read(select, txn)
    }

    fn ping(&mut self, select: u8, timeout_ms: u32) -> Result<()> {
        (**self).ping(select, timeout_ms)
    }

    fn deinit(&mut self) -> Result<()> {
        (**self).deinit()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

// Blanket impl for boxed transports to allow trait objects
#[cfg(feature = "alloc")]
impl Transport for alloc::boxed::Box<dyn Transport + Send> {
    fn interface(&self) -> InterfaceType {
        (**self).interface()
    }

    fn write(&mut self, select: u8, data: &[u8], timeout_ms: u32) -> Result<usize> {
        (**self).write(select, data, timeout_ms)
    }

    fn read(&mut self, select: u8, buf: &mut [u8], timeout_ms: u32) -> Result<usize> {
        (**self).read(select, buf, timeout_ms)
    }

    fn write_read(&mut self, select: u8, txn: &mut Transaction<'_>) -> Result<()> {
        (**self).write_read(select, txn)
    }

    fn ping(&mut self, select: u8, timeout_ms: u32) -> Result<()> {
        (**self).ping(select, timeout_ms)
    }

    fn deinit(&mut self) -> Result<()> {
        (**self).deinit()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

/// Helper for implementing [`Transport::write_read`] on byte-oriented SPI
/// controllers
///
/// Packs the header into `scratch` followed by the write data, then calls
/// `transfer_fn` with the outgoing bytes and the read buffer. Headers that
/// are not a whole number of bytes need a bit-level controller and are
/// rejected.
pub fn default_write_read<F>(
    txn: &mut Transaction<'_>,
    scratch: &mut [u8],
    transfer_fn: F,
) -> Result<()>
where
    F: FnOnce(&[u8], &mut [u8]) -> Result<()>,
{
    let bits = txn.encode_header(scratch)?;
    if bits % 8 != 0 {
        return Err(Error::InvalidArgument);
    }
    let header_len = bits / 8;
    let total = header_len + txn.write_data.len();
    let out = scratch.get_mut(header_len..total).ok_or(Error::OutOfMemory)?;
    out.copy_from_slice(txn.write_data);
    transfer_fn(&scratch[..total], txn.read_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_write_read_packs_header() {
        let data = [0xAA, 0xBB];
        let mut read = [0u8; 1];
        let mut txn = Transaction::command(0x02, 8)
            .with_address(0x0102, 16)
            .with_write(&data)
            .with_read(&mut read);
        let mut scratch = [0u8; 8];
        let mut sent = [0u8; 5];
        default_write_read(&mut txn, &mut scratch, |out, rd| {
            sent.copy_from_slice(out);
            rd[0] = 0x42;
            Ok(())
        })
        .unwrap();
        assert_eq!(sent, [0x02, 0x01, 0x02, 0xAA, 0xBB]);
        assert_eq!(read[0], 0x42);
    }

    #[test]
    fn test_default_write_read_rejects_bit_frames() {
        let mut txn = Transaction::command(0b110, 3).with_address(0, 7);
        let mut scratch = [0u8; 8];
        let res = default_write_read(&mut txn, &mut scratch, |_, _| Ok(()));
        assert_eq!(res, Err(Error::InvalidArgument));
    }

    #[test]
    fn test_interface_config_accessors() {
        let mut config: InterfaceConfig = I2cConfig::new(0, 100_000, 0x50).into();
        assert_eq!(config.interface(), InterfaceType::I2c);
        assert_eq!(config.select_address(), 0x50);
        config.set_speed_hz(400_000);
        assert_eq!(config.speed_hz(), 400_000);

        let config: InterfaceConfig = SpiConfig::new(1, 1_000_000).into();
        assert_eq!(config.select_address(), 0);
        assert_eq!(config.interface(), InterfaceType::Spi);
    }
}
