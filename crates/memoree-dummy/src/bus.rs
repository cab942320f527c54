//! Bus activity log and fault injection

use alloc::vec::Vec;

use memoree_core::error::{Error, Result};

/// One thing an emulator saw on its bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// I2C write
    Write { select: u8, len: usize },
    /// I2C read
    Read { select: u8, len: usize },
    /// I2C write followed by a repeated-start read
    WriteRead { select: u8, write_len: usize, read_len: usize },
    /// Framed SPI / Microwire transfer
    Frame {
        opcode: u32,
        opcode_bits: u8,
        address: u32,
        address_bits: u8,
        write_len: usize,
        read_len: usize,
    },
    /// I2C address probe
    Ping { select: u8, acked: bool },
    /// Requested sleep
    Delay(u32),
    /// Bus released
    Deinit,
}

/// Record of bus activity with optional fault injection
#[derive(Debug, Default)]
pub struct BusLog {
    events: Vec<BusEvent>,
    operations: usize,
    fail_after: Option<usize>,
}

impl BusLog {
    /// Everything recorded so far
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Forget recorded events and reset the operation counter
    pub fn clear(&mut self) {
        self.events.clear();
        self.operations = 0;
    }

    /// Let `operations` more data operations succeed, then fail all others
    ///
    /// Pings, delays and deinit are not data operations.
    pub fn fail_after(&mut self, operations: usize) {
        self.fail_after = Some(self.operations + operations);
    }

    /// Stop injecting faults
    pub fn clear_faults(&mut self) {
        self.fail_after = None;
    }

    /// Number of data operations seen
    pub fn operations(&self) -> usize {
        self.operations
    }

    /// Sum of all requested delays
    pub fn total_delay_ms(&self) -> u64 {
        self.events
            .iter()
            .map(|e| match e {
                BusEvent::Delay(ms) => *ms as u64,
                _ => 0,
            })
            .sum()
    }

    /// Frames with the given opcode
    pub fn frames_with_opcode(&self, opcode: u32) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BusEvent::Frame { opcode: op, .. } if *op == opcode))
            .count()
    }

    pub(crate) fn record(&mut self, event: BusEvent) {
        log::trace!("bus: {:?}", event);
        self.events.push(event);
    }

    /// Record a data operation, failing it if a fault is armed
    pub(crate) fn operation(&mut self, event: BusEvent) -> Result<()> {
        self.record(event);
        self.operations += 1;
        match self.fail_after {
            Some(limit) if self.operations > limit => {
                log::debug!("bus: injected fault on operation {}", self.operations);
                Err(Error::Fail)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_injection_counts_from_arming() {
        let mut bus = BusLog::default();
        bus.operation(BusEvent::Deinit).unwrap();
        bus.fail_after(2);
        assert!(bus.operation(BusEvent::Deinit).is_ok());
        assert!(bus.operation(BusEvent::Deinit).is_ok());
        assert_eq!(bus.operation(BusEvent::Deinit), Err(Error::Fail));
        bus.clear_faults();
        assert!(bus.operation(BusEvent::Deinit).is_ok());
        assert_eq!(bus.operations(), 5);
    }

    #[test]
    fn test_total_delay() {
        let mut bus = BusLog::default();
        bus.record(BusEvent::Delay(5));
        bus.record(BusEvent::Ping { select: 0x50, acked: true });
        bus.record(BusEvent::Delay(10));
        assert_eq!(bus.total_delay_ms(), 15);
    }
}
