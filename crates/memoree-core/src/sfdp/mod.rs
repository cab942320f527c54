//! SFDP (Serial Flash Discoverable Parameters) discovery
//!
//! 25xx NOR parts carry no static geometry. Discovery reads the SFDP header
//! with RDSFDP (0x5A), validates its signature and reserved fields, then
//! reads the basic flash parameter table it points to and decodes size,
//! address width, write granularity and the 4 KiB erase opcode.
//!
//! ```ignore
//! use memoree_core::sfdp::{self, SfdpState};
//!
//! let mut state = SfdpState::None;
//! let params = sfdp::discover(&mut spi, 10, &mut state)?;
//! println!("Flash size: {} bytes", params.size);
//! ```

mod parser;
mod types;

pub use parser::*;
pub use types::*;
