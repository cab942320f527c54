#![allow(dead_code)]

use memoree_core::memory::Memory;
use memoree_core::transport::{I2cConfig, SpiConfig};
use memoree_core::Variant;
use memoree_dummy::{DummyI2cEeprom, DummyMicrowire, DummySfdpFlash, SfdpImage};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn i2c(variant: Variant) -> Memory<DummyI2cEeprom> {
    init_logging();
    let eeprom = DummyI2cEeprom::new(variant).unwrap();
    Memory::with_transport(variant, I2cConfig::new(0, 400_000, 0x50).into(), eeprom).unwrap()
}

pub fn microwire(variant: Variant) -> Memory<DummyMicrowire> {
    init_logging();
    let part = DummyMicrowire::new(variant).unwrap();
    Memory::with_transport(variant, SpiConfig::new(0, 2_000_000).into(), part).unwrap()
}

pub fn flash(flash: DummySfdpFlash) -> Memory<DummySfdpFlash> {
    init_logging();
    Memory::with_transport(Variant::SpiNorSfdp, SpiConfig::new(0, 20_000_000).into(), flash).unwrap()
}

pub fn flash_64k() -> Memory<DummySfdpFlash> {
    flash(DummySfdpFlash::new(SfdpImage::new(64 * 1024)))
}

/// Deterministic test pattern
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
