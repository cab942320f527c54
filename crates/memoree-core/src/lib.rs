//! memoree-core - Protocol engine for serial nonvolatile memories
//!
//! This crate turns byte-addressed read, write and erase requests into
//! correctly framed bus transactions for three families of parts:
//!
//! - 24xx I2C EEPROMs (address sent in-band, high bits folded into the
//!   device-select byte on small parts)
//! - 93Cxx Microwire EEPROMs (bit-level opcode and address framing)
//! - 25xx SPI NOR flash that describes itself through JEDEC SFDP
//!
//! The physical bus is supplied by the caller through the
//! [`transport::Transport`] trait. The crate is `no_std` compatible.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`), the
//!   configuration loader and serde support
//! - `alloc` - Enable boxed transports
//!
//! # Example
//!
//! ```ignore
//! use memoree_core::memory::Memory;
//! use memoree_core::transport::{I2cConfig, InterfaceConfig};
//! use memoree_core::variant::Variant;
//!
//! let config = InterfaceConfig::I2c(I2cConfig::new(0, 400_000, 0x50));
//! let mut mem = Memory::with_transport(Variant::Eeprom24xx256, config, bus)?;
//! mem.write(0x0100, b"hello", 0, false)?;
//! let mut buf = [0u8; 5];
//! mem.read(0x0100, &mut buf, 100)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod codec;
#[cfg(feature = "std")]
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod sfdp;
pub mod transport;
pub mod variant;

pub use error::{Error, PartialWrite, Result};
pub use memory::{Memory, MemoryInfo};
pub use variant::Variant;
