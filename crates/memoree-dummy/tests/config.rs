mod common;

use memoree_core::config::{parse_memory_spec, ConfigError, MemorySpec};
use memoree_core::error::Error;
use memoree_core::Variant;
use memoree_dummy::{DummyI2cEeprom, DummyMicrowire, DummySfdpFlash, SfdpImage};

#[test]
fn spec_string_opens_memory_with_clamped_speed() {
    common::init_logging();
    let spec = parse_memory_spec("24xx256:port=1,speed=1000000,addr=0x50").unwrap();
    let mut opened_at = 0;
    let mut mem = spec
        .open(|config| {
            opened_at = config.speed_hz();
            DummyI2cEeprom::new(Variant::Eeprom24xx256)
        })
        .unwrap();
    assert_eq!(opened_at, 400_000);
    assert_eq!(mem.write(0x10, b"memoree", 0, false), Ok(7));

    let info = mem.info();
    let text = toml::to_string(&info).unwrap();
    assert!(text.contains("variant = \"24xx256\""));
    assert!(text.contains("interface = \"i2c\""));
    assert!(text.contains("size = 32768"));
}

#[test]
fn toml_file_describes_microwire_part() {
    common::init_logging();
    let path = std::env::temp_dir().join(format!("memoree-config-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[memory]\nvariant = \"93C46\"\n\n[spi]\nport = 2\nspeed = \"0x1E8480\"\ncs = 15\n",
    )
    .unwrap();
    let spec = MemorySpec::load_toml(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(spec.variant, Variant::Microwire93C46);
    assert_eq!(spec.interface.speed_hz(), 2_000_000);
    let mut mem = spec.open(|_| DummyMicrowire::new(Variant::Microwire93C46)).unwrap();
    assert_eq!(mem.info().page_write_delay_ms, 10);
    mem.erase(0xFF).unwrap();
}

#[test]
fn sfdp_parameters_serialize() {
    common::init_logging();
    let spec: MemorySpec = "sfdp:speed=50000000".parse().unwrap();
    let mem = spec
        .open(|_| Ok(DummySfdpFlash::new(SfdpImage::new(1 << 20))))
        .unwrap();
    assert_eq!(mem.info().speed_hz, 40_000_000);

    let params = mem.sfdp_parameters().copied().unwrap();
    let text = toml::to_string(&params).unwrap();
    assert!(text.contains("size = 1048576"));
    assert!(text.contains("erase_4k_opcode = 32"));
}

#[test]
fn open_rejects_wrong_emulator() {
    common::init_logging();
    let spec = parse_memory_spec("24xx02").unwrap();
    let res = spec.open(|_| DummyMicrowire::new(Variant::Microwire93C46));
    assert!(matches!(res, Err(Error::InvalidArgument)));

    assert!(matches!(
        parse_memory_spec("25q128"),
        Err(ConfigError::UnknownVariant(_))
    ));
}
