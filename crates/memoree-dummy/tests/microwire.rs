mod common;

use common::{microwire, pattern};
use memoree_core::codec::microwire::{ERAL, ERASE, EWEN, WRITE};
use memoree_core::error::Error;
use memoree_core::Variant;
use memoree_dummy::BusEvent;

#[test]
fn write_then_read_one_location_at_a_time() {
    let mut mem = microwire(Variant::Microwire93C66);
    let data = pattern(10, 3);
    assert_eq!(mem.write(0x1F0, &data, 0, false), Ok(10));

    let bus = mem.transport().bus();
    assert_eq!(bus.frames_with_opcode(EWEN), 1);
    assert_eq!(bus.frames_with_opcode(WRITE), 10);
    assert_eq!(bus.total_delay_ms(), 10 * 5);

    let mut buf = [0u8; 10];
    assert_eq!(mem.read(0x1F0, &mut buf, 0), Ok(10));
    assert_eq!(&buf[..], &data[..]);
}

#[test]
fn wrapped_write_on_microwire() {
    let mut mem = microwire(Variant::Microwire93C46);
    assert_eq!(mem.write(0x7E, &[1, 2, 3, 4], 0, true), Ok(4));
    let data = mem.transport().data();
    assert_eq!(&data[0x7E..], &[1, 2]);
    assert_eq!(&data[..2], &[3, 4]);
    assert_eq!(mem.transport().bus().total_delay_ms(), 4 * 10);
}

#[test]
fn erase_to_ff_uses_eral() {
    let mut mem = microwire(Variant::Microwire93C86);
    mem.transport_mut().data_mut().fill(0x00);
    mem.erase(0xFF).unwrap();

    assert!(mem.transport().data().iter().all(|&b| b == 0xFF));
    let bus = mem.transport().bus();
    assert_eq!(bus.frames_with_opcode(ERAL), 1);
    assert_eq!(bus.frames_with_opcode(WRITE), 0);
    assert_eq!(bus.events().last(), Some(&BusEvent::Delay(5)));
}

#[test]
fn erase_to_other_value_writes_every_location() {
    let mut mem = microwire(Variant::Microwire93C56);
    mem.erase(0x5A).unwrap();
    assert!(mem.transport().data().iter().all(|&b| b == 0x5A));
    assert_eq!(mem.transport().bus().frames_with_opcode(WRITE), 256);
    assert_eq!(mem.transport().bus().frames_with_opcode(ERAL), 0);
}

#[test]
fn erase_page_on_microwire() {
    let mut mem = microwire(Variant::Microwire93C46);
    mem.transport_mut().data_mut().fill(0x00);

    mem.erase_page(0x20, 0xFF).unwrap();
    assert_eq!(mem.transport().bus().frames_with_opcode(ERASE), 1);
    mem.erase_page(0x21, 0x3C).unwrap();

    let data = mem.transport().data();
    assert_eq!(&data[0x1F..0x23], &[0x00, 0xFF, 0x3C, 0x00]);
}

#[test]
fn microwire_failure_stops_erase() {
    let mut mem = microwire(Variant::Microwire93C46);
    // EWEN plus three writes
    mem.transport_mut().bus_mut().fail_after(4);
    assert_eq!(mem.erase(0x00), Err(Error::Fail));
    let data = mem.transport().data();
    assert!(data[..3].iter().all(|&b| b == 0x00));
    assert!(data[3..].iter().all(|&b| b == 0xFF));
}

#[test]
fn microwire_has_no_presence_check() {
    let mut mem = microwire(Variant::Microwire93C76);
    assert_eq!(mem.ping(10), Err(Error::InvalidArgument));
    assert_eq!(mem.sfdp(0), Err(Error::InvalidArgument));
    assert!(mem.transport().bus().events().is_empty());
}
