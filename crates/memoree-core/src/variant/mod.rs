//! Memory variant registry
//!
//! Every supported part number maps to a [`VariantDescriptor`] carrying its
//! interface, geometry and protocol [`Features`].

mod features;
mod registry;
mod types;

pub use features::Features;
pub use registry::{descriptor, is_consistent, resolve};
pub use types::{Family, Geometry, InterfaceType, Variant, VariantDescriptor};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names_and_aliases() {
        assert_eq!("24xx256".parse::<Variant>(), Ok(Variant::Eeprom24xx256));
        assert_eq!("93C46".parse::<Variant>(), Ok(Variant::Microwire93C46));
        assert_eq!(" SFDP ".parse::<Variant>(), Ok(Variant::SpiNorSfdp));
        assert_eq!("stub_i2c".parse::<Variant>(), Ok(Variant::StubI2c));
        assert!("24xx2048".parse::<Variant>().is_err());
    }

    #[test]
    fn test_ids_are_sparse() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_id(variant.id()), Ok(variant));
        }
        assert!(Variant::from_id(11).is_err());
        assert!(Variant::from_id(18).is_err());
    }

    #[test]
    fn test_speed_caps() {
        assert_eq!(Family::I2cEeprom.max_speed_hz(), 400_000);
        assert_eq!(Family::Microwire.max_speed_hz(), 2_000_000);
        assert_eq!(Family::SpiNor.max_speed_hz(), 40_000_000);
        assert_eq!(Family::Stub(InterfaceType::I2c).max_speed_hz(), 400_000);
    }
}
