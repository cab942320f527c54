//! Per-variant feature flags

use bitflags::bitflags;

bitflags! {
    /// Feature flags for memory variants
    ///
    /// These flags describe which protocol behaviors a part needs or
    /// supports. Erase planning, write-enable sequencing, presence checks
    /// and discovery are driven by them rather than by the family.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Features: u16 {
        // Addressing
        /// Address bits above the native field go into the device-select byte
        const SELECT_FOLDING  = 1 << 0;

        // Write behavior
        /// A write-enable command must precede writes and erases
        const WRITE_ENABLE    = 1 << 1;
        /// Write enable latch clears after every program operation
        const WEL_AUTO_CLEAR  = 1 << 2;

        // Erase behavior
        /// Dedicated single-location erase command
        const ERASE_BYTE      = 1 << 3;
        /// Dedicated whole-array erase command
        const ERASE_ALL       = 1 << 4;

        // Discovery
        /// Geometry is read from the part through SFDP
        const SFDP            = 1 << 5;
        /// Part can be detected by an address acknowledge
        const ACK_PING        = 1 << 6;

        // Pass-through
        /// Raw transactions only, no geometry
        const RAW_ONLY        = 1 << 7;
    }
}

impl Default for Features {
    fn default() -> Self {
        Features::empty()
    }
}
