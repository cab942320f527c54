//! Erase planning
//!
//! Picks how a page or the whole array is brought to a value from the
//! part's feature flags. Executing the plan is up to the memory handle.

use crate::error::{Error, Result};
use crate::variant::Features;

/// Value of an erased cell
pub const ERASED: u8 = 0xFF;

/// Granularity of the discovered sector erase
pub const SECTOR_SIZE_4K: u32 = 4096;

/// How to erase a single page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageErase {
    /// Microwire ERASE of one location, after EWEN
    EraseLocation,
    /// Microwire WRITE of the value, after EWEN
    WriteLocation(u8),
    /// Page-sized write of the value
    Fill(u8),
}

impl PageErase {
    /// Plan a page erase
    pub fn plan(features: Features, value: u8) -> Result<Self> {
        if features.contains(Features::RAW_ONLY) {
            return Err(Error::InvalidArgument);
        }
        if !features.contains(Features::ERASE_BYTE) {
            return Ok(Self::Fill(value));
        }
        Ok(if value == ERASED {
            Self::EraseLocation
        } else {
            Self::WriteLocation(value)
        })
    }
}

/// How to erase the whole array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseStrategy {
    /// Microwire ERAL, after EWEN
    EraseAll,
    /// Microwire WRITE of the value to every location, after EWEN
    WriteEach(u8),
    /// WREN plus sector erase every 4 KiB, then fill with the value unless
    /// it is the erased value
    Sectors {
        /// Discovered 4 KiB erase opcode
        opcode: u8,
        /// Value to fill after erasing, if not 0xFF
        fill: Option<u8>,
    },
    /// Page-by-page write of the value
    PageFill(u8),
}

impl EraseStrategy {
    /// Plan a full-array erase
    ///
    /// `erase_4k_opcode` is the opcode discovered through SFDP, 0 meaning the
    /// part has none.
    pub fn plan(features: Features, value: u8, erase_4k_opcode: u8) -> Result<Self> {
        if features.contains(Features::RAW_ONLY) {
            return Err(Error::InvalidArgument);
        }
        if features.contains(Features::ERASE_ALL) {
            return Ok(if value == ERASED {
                Self::EraseAll
            } else {
                Self::WriteEach(value)
            });
        }
        if features.contains(Features::SFDP) && erase_4k_opcode != 0 {
            return Ok(Self::Sectors {
                opcode: erase_4k_opcode,
                fill: (value != ERASED).then_some(value),
            });
        }
        Ok(Self::PageFill(value))
    }
}

/// Start addresses of every 4 KiB sector in an array of `size` bytes
pub fn sectors(size: u32) -> impl Iterator<Item = u32> {
    (0..size).step_by(SECTOR_SIZE_4K as usize)
}
