//! Builtin variant registry
//!
//! Lookup is an explicit mapping from [`Variant`] to its descriptor, so the
//! order in which variants are declared has no bearing on which geometry a
//! part receives. The table is checked at compile time.

use super::features::Features;
use super::types::{Geometry, InterfaceType, Variant, VariantDescriptor};

/// Page write delay of every 24xx part
const EEPROM_24XX_DELAY_MS: u8 = 5;

const fn eeprom_24xx(
    variant: Variant,
    size: u32,
    addr_len: u8,
    page_size: u16,
    features: Features,
) -> VariantDescriptor {
    VariantDescriptor {
        variant,
        interface: InterfaceType::I2c,
        geometry: Geometry::new(size, addr_len, page_size, EEPROM_24XX_DELAY_MS),
        features: Features::ACK_PING.union(features),
    }
}

const fn microwire_93cxx(variant: Variant, size: u32, addr_len: u8, delay_ms: u8) -> VariantDescriptor {
    VariantDescriptor {
        variant,
        interface: InterfaceType::Spi,
        geometry: Geometry::new(size, addr_len, 1, delay_ms),
        features: Features::WRITE_ENABLE
            .union(Features::ERASE_BYTE)
            .union(Features::ERASE_ALL),
    }
}

const fn stub(variant: Variant, interface: InterfaceType, features: Features) -> VariantDescriptor {
    VariantDescriptor {
        variant,
        interface,
        geometry: Geometry::new(0, 0, 0, 0),
        features: Features::RAW_ONLY.union(features),
    }
}

const STUB_I2C: VariantDescriptor = stub(Variant::StubI2c, InterfaceType::I2c, Features::ACK_PING);
const EEPROM_24XX02: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx02, 256, 8, 8, Features::empty());
const EEPROM_24XX04: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx04, 512, 8, 16, Features::SELECT_FOLDING);
const EEPROM_24XX08: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx08, 1024, 8, 16, Features::SELECT_FOLDING);
const EEPROM_24XX16: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx16, 2048, 8, 16, Features::SELECT_FOLDING);
const EEPROM_24XX32: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx32, 4096, 16, 32, Features::empty());
const EEPROM_24XX64: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx64, 8192, 16, 32, Features::empty());
const EEPROM_24XX128: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx128, 16384, 16, 64, Features::empty());
const EEPROM_24XX256: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx256, 32768, 16, 64, Features::empty());
const EEPROM_24XX512: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx512, 65536, 16, 128, Features::empty());
const EEPROM_24XX1024: VariantDescriptor =
    eeprom_24xx(Variant::Eeprom24xx1024, 131072, 16, 128, Features::SELECT_FOLDING);
const STUB_SPI: VariantDescriptor = stub(Variant::StubSpi, InterfaceType::Spi, Features::empty());
const MICROWIRE_93C46: VariantDescriptor = microwire_93cxx(Variant::Microwire93C46, 128, 7, 10);
const MICROWIRE_93C56: VariantDescriptor = microwire_93cxx(Variant::Microwire93C56, 256, 9, 5);
const MICROWIRE_93C66: VariantDescriptor = microwire_93cxx(Variant::Microwire93C66, 512, 9, 5);
const MICROWIRE_93C76: VariantDescriptor = microwire_93cxx(Variant::Microwire93C76, 1024, 11, 5);
const MICROWIRE_93C86: VariantDescriptor = microwire_93cxx(Variant::Microwire93C86, 2048, 11, 5);
// Size, address width and page size come from SFDP at runtime
const SPI_NOR_SFDP: VariantDescriptor = VariantDescriptor {
    variant: Variant::SpiNorSfdp,
    interface: InterfaceType::Spi,
    geometry: Geometry::new(0, 0, 0, 5),
    features: Features::SFDP
        .union(Features::WRITE_ENABLE)
        .union(Features::WEL_AUTO_CLEAR),
};

/// Look up the static descriptor of a variant
pub const fn descriptor(variant: Variant) -> &'static VariantDescriptor {
    match variant {
        Variant::StubI2c => &STUB_I2C,
        Variant::Eeprom24xx02 => &EEPROM_24XX02,
        Variant::Eeprom24xx04 => &EEPROM_24XX04,
        Variant::Eeprom24xx08 => &EEPROM_24XX08,
        Variant::Eeprom24xx16 => &EEPROM_24XX16,
        Variant::Eeprom24xx32 => &EEPROM_24XX32,
        Variant::Eeprom24xx64 => &EEPROM_24XX64,
        Variant::Eeprom24xx128 => &EEPROM_24XX128,
        Variant::Eeprom24xx256 => &EEPROM_24XX256,
        Variant::Eeprom24xx512 => &EEPROM_24XX512,
        Variant::Eeprom24xx1024 => &EEPROM_24XX1024,
        Variant::StubSpi => &STUB_SPI,
        Variant::Microwire93C46 => &MICROWIRE_93C46,
        Variant::Microwire93C56 => &MICROWIRE_93C56,
        Variant::Microwire93C66 => &MICROWIRE_93C66,
        Variant::Microwire93C76 => &MICROWIRE_93C76,
        Variant::Microwire93C86 => &MICROWIRE_93C86,
        Variant::SpiNorSfdp => &SPI_NOR_SFDP,
    }
}

/// Resolve a legacy numeric identifier straight to its descriptor
pub fn resolve(id: u8) -> crate::error::Result<&'static VariantDescriptor> {
    Variant::from_id(id).map(descriptor)
}

/// Check that a descriptor is self-consistent
///
/// Parts with static geometry need a power-of-two size split into whole
/// pages and an address field able to reach every page; SFDP parts and stubs
/// must leave the geometry empty.
pub const fn is_consistent(desc: &VariantDescriptor) -> bool {
    let g = &desc.geometry;
    if desc.features.contains(Features::RAW_ONLY) || desc.features.contains(Features::SFDP) {
        return g.size == 0 && g.page_size == 0 && g.addr_len == 0;
    }
    if !g.size.is_power_of_two() || g.page_size == 0 || g.size % g.page_size as u32 != 0 {
        return false;
    }
    // In-band addresses are whole bytes
    if matches!(desc.interface, InterfaceType::I2c) && g.addr_len % 8 != 0 {
        return false;
    }
    let space = u32::BITS - (g.size - 1).leading_zeros();
    let folds = (g.addr_len as u32) < space;
    if folds != desc.features.contains(Features::SELECT_FOLDING) {
        return false;
    }
    // At most three block bits fit into the select byte
    !folds || space - g.addr_len as u32 <= 3
}

const _: () = {
    let mut i = 0;
    while i < Variant::ALL.len() {
        assert!(is_consistent(descriptor(Variant::ALL[i])));
        i += 1;
    }
};
