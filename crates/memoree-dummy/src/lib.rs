//! memoree-dummy - In-memory memory part emulators for testing
//!
//! Each emulator implements [`Transport`](memoree_core::transport::Transport)
//! and behaves like the real part on the wire:
//!
//! - [`DummyI2cEeprom`] decodes the device-select byte, rolls page writes
//!   over inside the page and stops acknowledging during the write cycle
//! - [`DummyMicrowire`] decodes the bit-level header and ignores writes
//!   until EWEN is received
//! - [`DummySfdpFlash`] serves an SFDP image, can only clear bits when
//!   programming and drops its write enable latch after every program
//!
//! Every emulator keeps a [`BusLog`] of what it saw and can be told to fail
//! after a number of operations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "alloc")]
mod bus;
#[cfg(feature = "alloc")]
mod flash;
#[cfg(feature = "alloc")]
mod i2c;
#[cfg(feature = "alloc")]
mod microwire;

#[cfg(feature = "alloc")]
pub use bus::{BusEvent, BusLog};
#[cfg(feature = "alloc")]
pub use flash::{AddressMode, DummySfdpFlash, SfdpImage};
#[cfg(feature = "alloc")]
pub use i2c::DummyI2cEeprom;
#[cfg(feature = "alloc")]
pub use microwire::DummyMicrowire;
