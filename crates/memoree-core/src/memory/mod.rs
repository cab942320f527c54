//! Memory handle
//!
//! [`Memory`] owns a transport and the working geometry of one attached
//! part. Every public operation validates its arguments against that
//! geometry before touching the bus.

mod erase;
mod io;

use crate::codec::{self, microwire, nor};
use crate::error::{Error, Result};
use crate::sfdp::{self, SfdpParameters, SfdpState};
use crate::transport::{InterfaceConfig, Transaction, Transport};
use crate::variant::{descriptor, Family, Features, Geometry, InterfaceType, Variant, VariantDescriptor};

/// Snapshot of a handle's configuration and geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(serde::Serialize))]
pub struct MemoryInfo {
    /// Bus the part is attached to
    pub interface: InterfaceType,
    /// Part variant
    pub variant: Variant,
    /// Total size in bytes
    pub size: u32,
    /// Effective bus speed in Hz
    pub speed_hz: u32,
    /// Width of the address field in bits
    pub addr_len: u8,
    /// Base device-select address (I2C only)
    pub select_address: u8,
    /// Page size in bytes
    pub page_size: u16,
    /// Number of pages
    pub num_pages: u32,
    /// Page write completion time in ms
    pub page_write_delay_ms: u8,
    /// Write protection state
    pub protected: bool,
}

/// An attached memory part
///
/// The handle exclusively owns its transport. [`Memory::deinit`] either
/// releases the bus or hands the transport back; dropping the handle drops
/// the transport without calling [`Transport::deinit`].
pub struct Memory<T: Transport> {
    transport: T,
    descriptor: &'static VariantDescriptor,
    geometry: Geometry,
    select: u8,
    speed_hz: u32,
    protected: bool,
    sfdp_state: SfdpState,
    sfdp: Option<SfdpParameters>,
}

impl<T: Transport> Memory<T> {
    /// Open a transport with `open` and attach `variant` to it
    ///
    /// The configured speed is clamped to the family maximum before `open`
    /// sees it. SFDP parts run discovery; if it fails the transport is
    /// released and the error returned.
    pub fn init<F>(variant: Variant, config: InterfaceConfig, open: F) -> Result<Self>
    where
        F: FnOnce(&InterfaceConfig) -> Result<T>,
    {
        let desc = descriptor(variant);
        let config = prepare_config(desc, config)?;
        let transport = open(&config)?;
        Self::attach(desc, &config, transport)
    }

    /// Attach `variant` to an already opened transport
    ///
    /// On failure the transport is released.
    pub fn with_transport(variant: Variant, config: InterfaceConfig, mut transport: T) -> Result<Self> {
        let desc = descriptor(variant);
        match prepare_config(desc, config) {
            Ok(config) => Self::attach(desc, &config, transport),
            Err(e) => {
                release(&mut transport);
                Err(e)
            }
        }
    }

    fn attach(desc: &'static VariantDescriptor, config: &InterfaceConfig, mut transport: T) -> Result<Self> {
        if transport.interface() != desc.interface {
            log::debug!(
                "{} needs an {} transport, got {}",
                desc.variant,
                desc.interface,
                transport.interface()
            );
            release(&mut transport);
            return Err(Error::InvalidArgument);
        }

        let mut mem = Self {
            transport,
            descriptor: desc,
            geometry: desc.geometry,
            select: config.select_address(),
            speed_hz: config.speed_hz(),
            protected: false,
            sfdp_state: SfdpState::None,
            sfdp: None,
        };

        if mem.has(Features::SFDP) {
            if let Err(e) = mem.discover(0) {
                release(&mut mem.transport);
                return Err(e);
            }
        }

        log::debug!(
            "Attached {} ({} bytes, page {}, {} Hz)",
            desc.variant,
            mem.geometry.size,
            mem.geometry.page_size,
            mem.speed_hz
        );
        Ok(mem)
    }

    /// Detach from the part
    ///
    /// With `release` set the transport is deinitialized and dropped,
    /// otherwise it is handed back to the caller.
    pub fn deinit(self, release: bool) -> Result<Option<T>> {
        let mut transport = self.transport;
        if release {
            transport.deinit()?;
            Ok(None)
        } else {
            Ok(Some(transport))
        }
    }

    /// Part variant
    pub fn variant(&self) -> Variant {
        self.descriptor.variant
    }

    /// Protocol family
    pub fn family(&self) -> Family {
        self.descriptor.family()
    }

    fn has(&self, features: Features) -> bool {
        self.descriptor.features.contains(features)
    }

    /// Working geometry
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Borrow the transport mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Configuration and geometry snapshot
    pub fn info(&self) -> MemoryInfo {
        MemoryInfo {
            interface: self.descriptor.interface,
            variant: self.descriptor.variant,
            size: self.geometry.size,
            speed_hz: self.speed_hz,
            addr_len: self.geometry.addr_len,
            select_address: self.select,
            page_size: self.geometry.page_size,
            num_pages: self.geometry.num_pages(),
            page_write_delay_ms: self.geometry.page_write_delay_ms,
            protected: self.protected,
        }
    }

    /// Check that the part is present
    ///
    /// I2C parts are polled for an address acknowledge every millisecond
    /// until `timeout_ms` runs out. SPI NOR parts re-run SFDP discovery.
    pub fn ping(&mut self, timeout_ms: u32) -> Result<()> {
        if self.has(Features::ACK_PING) {
            self.poll_ack(timeout_ms)
        } else if self.has(Features::SFDP) {
            self.discover(timeout_ms).map(|_| ())
        } else {
            Err(Error::InvalidArgument)
        }
    }

    fn poll_ack(&mut self, timeout_ms: u32) -> Result<()> {
        let mut waited = 0;
        loop {
            match self.transport.ping(self.select, 1) {
                Ok(()) => return Ok(()),
                Err(Error::InvalidArgument) => return Err(Error::InvalidArgument),
                Err(e) => log::trace!("No acknowledge from {:#04x}: {}", self.select, e),
            }
            if waited >= timeout_ms {
                log::debug!("Device {:#04x} did not acknowledge within {} ms", self.select, timeout_ms);
                return Err(Error::Timeout);
            }
            self.transport.delay_ms(1);
            waited += 1;
        }
    }

    /// Re-run SFDP discovery and apply the result
    pub fn sfdp(&mut self, timeout_ms: u32) -> Result<SfdpParameters> {
        if !self.has(Features::SFDP) {
            return Err(Error::InvalidArgument);
        }
        self.discover(timeout_ms)
    }

    /// Parameters of the last successful discovery
    pub fn sfdp_parameters(&self) -> Option<&SfdpParameters> {
        self.sfdp.as_ref()
    }

    /// Discovery progress
    pub fn sfdp_state(&self) -> SfdpState {
        self.sfdp_state
    }

    fn discover(&mut self, timeout_ms: u32) -> Result<SfdpParameters> {
        let timeout = codec::effective_timeout_ms(timeout_ms, sfdp::MAX_PARAMETER_TABLE_SIZE, self.speed_hz);
        let delay = self.descriptor.geometry.page_write_delay_ms;
        let result = sfdp::discover(&mut self.transport, timeout, &mut self.sfdp_state)
            .and_then(|params| Ok((params, params.geometry(delay)?)));

        match result {
            Ok((params, geometry)) => {
                self.geometry = geometry;
                self.sfdp = Some(params);
                Ok(params)
            }
            Err(e) => {
                self.sfdp_state = SfdpState::Failed;
                self.sfdp = None;
                self.geometry = self.descriptor.geometry;
                Err(e)
            }
        }
    }

    /// Pass a raw transaction through (stub variants only)
    ///
    /// On the I2C stub `txn.address` is the device-select address and only
    /// the data slices are used.
    pub fn transact(&mut self, txn: &mut Transaction<'_>) -> Result<()> {
        match self.family() {
            Family::Stub(InterfaceType::I2c) => {
                let select = u8::try_from(txn.address).map_err(|_| Error::InvalidArgument)?;
                self.transport.write_read(select, txn)
            }
            Family::Stub(InterfaceType::Spi) => self.transport.write_read(self.select, txn),
            _ => Err(Error::InvalidArgument),
        }
    }

    /// Read the JEDEC ID (SPI NOR only)
    pub fn read_id(&mut self, timeout_ms: u32) -> Result<[u8; 3]> {
        self.require_nor()?;
        let mut id = [0u8; 3];
        self.execute(&mut nor::read_id(&mut id, timeout_ms))?;
        Ok(id)
    }

    /// Read the status register (SPI NOR only)
    pub fn read_status(&mut self, timeout_ms: u32) -> Result<u8> {
        self.require_nor()?;
        let mut sr = [0u8; 1];
        self.execute(&mut nor::read_status(&mut sr, timeout_ms))?;
        Ok(sr[0])
    }

    fn require_nor(&self) -> Result<()> {
        match self.family() {
            Family::SpiNor => Ok(()),
            _ => Err(Error::InvalidArgument),
        }
    }

    /// Fail unless addressed operations can run
    fn require_addressable(&self) -> Result<()> {
        if self.has(Features::RAW_ONLY) {
            return Err(Error::InvalidArgument);
        }
        if self.has(Features::SFDP) && !self.sfdp_state.is_parsed() {
            log::debug!("SFDP not parsed ({:?}), refusing addressed operation", self.sfdp_state);
            return Err(Error::InvalidArgument);
        }
        if !self.geometry.is_populated() {
            return Err(Error::InvalidArgument);
        }
        Ok(())
    }

    fn execute(&mut self, txn: &mut Transaction<'_>) -> Result<()> {
        if txn.timeout_ms == 0 {
            let bytes = txn.header_len() + txn.write_data.len() + txn.read_buf.len();
            txn.timeout_ms = codec::default_timeout_ms(bytes, self.speed_hz);
        }
        self.transport.write_read(self.select, txn)
    }

    /// Send the family's write enable (Microwire EWEN, NOR WREN)
    fn write_enable(&mut self) -> Result<()> {
        if !self.has(Features::WRITE_ENABLE) {
            return Ok(());
        }
        match self.family() {
            Family::Microwire => {
                let mut txn = microwire::write_enable(self.geometry.addr_len, 0);
                self.execute(&mut txn)
            }
            Family::SpiNor => self.execute(&mut nor::write_enable(0)),
            _ => Ok(()),
        }
    }

    fn settle(&mut self) {
        let ms = self.geometry.page_write_delay_ms as u32;
        self.transport.delay_ms(ms);
    }
}

fn prepare_config(desc: &VariantDescriptor, mut config: InterfaceConfig) -> Result<InterfaceConfig> {
    if config.interface() != desc.interface {
        log::debug!("{} is an {} part, config is {}", desc.variant, desc.interface, config.interface());
        return Err(Error::InvalidArgument);
    }
    let speed = config.speed_hz();
    if speed == 0 {
        return Err(Error::InvalidArgument);
    }
    let max = desc.family().max_speed_hz();
    if speed > max {
        log::debug!("Clamping {} Hz to {} Hz for {}", speed, max, desc.variant);
        config.set_speed_hz(max);
    }
    Ok(config)
}

fn release<T: Transport>(transport: &mut T) {
    if let Err(e) = transport.deinit() {
        log::warn!("Failed to release transport: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{I2cConfig, SpiConfig};
    use heapless::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Event {
        Frame { opcode: u32, opcode_bits: u8, address: u32, address_bits: u8, write_len: usize },
        Ping(u8),
        Delay(u32),
        Deinit,
    }

    /// Records SPI frames and acknowledges I2C pings after `ack_after` tries
    struct RecordingBus {
        interface: InterfaceType,
        events: Vec<Event, 64>,
        ack_after: u32,
        pings: u32,
    }

    impl RecordingBus {
        fn new(interface: InterfaceType) -> Self {
            Self {
                interface,
                events: Vec::new(),
                ack_after: 0,
                pings: 0,
            }
        }
    }

    impl Transport for RecordingBus {
        fn interface(&self) -> InterfaceType {
            self.interface
        }

        fn write_read(&mut self, _select: u8, txn: &mut Transaction<'_>) -> Result<()> {
            let _ = self.events.push(Event::Frame {
                opcode: txn.opcode,
                opcode_bits: txn.opcode_bits,
                address: txn.address,
                address_bits: txn.address_bits,
                write_len: txn.write_data.len(),
            });
            txn.read_buf.fill(0x5A);
            Ok(())
        }

        fn ping(&mut self, select: u8, _timeout_ms: u32) -> Result<()> {
            let _ = self.events.push(Event::Ping(select));
            self.pings += 1;
            if self.pings > self.ack_after {
                Ok(())
            } else {
                Err(Error::Fail)
            }
        }

        fn deinit(&mut self) -> Result<()> {
            let _ = self.events.push(Event::Deinit);
            Ok(())
        }

        fn delay_ms(&mut self, ms: u32) {
            let _ = self.events.push(Event::Delay(ms));
        }
    }

    fn microwire(variant: Variant) -> Memory<RecordingBus> {
        let config = SpiConfig::new(0, 1_000_000).into();
        Memory::with_transport(variant, config, RecordingBus::new(InterfaceType::Spi)).unwrap()
    }

    #[test]
    fn test_speed_clamped_per_family() {
        let config = SpiConfig::new(0, 10_000_000).into();
        let mut seen = 0;
        let mem = Memory::init(Variant::Microwire93C66, config, |c| {
            seen = c.speed_hz();
            Ok(RecordingBus::new(InterfaceType::Spi))
        })
        .unwrap();
        assert_eq!(seen, 2_000_000);
        assert_eq!(mem.info().speed_hz, 2_000_000);

        let config = I2cConfig::new(0, 1_000_000, 0x50).into();
        let mem = Memory::with_transport(Variant::Eeprom24xx02, config, RecordingBus::new(InterfaceType::I2c)).unwrap();
        assert_eq!(mem.info().speed_hz, 400_000);
        assert_eq!(mem.info().num_pages, 32);
    }

    #[test]
    fn test_zero_speed_rejected_before_open() {
        let config = I2cConfig::new(0, 0, 0x50).into();
        let res = Memory::init(Variant::Eeprom24xx02, config, |_| -> Result<RecordingBus> {
            panic!("transport must not be opened")
        });
        assert!(matches!(res, Err(Error::InvalidArgument)));
    }

    #[test]
    fn test_interface_mismatch_releases_transport() {
        let mut bus = RecordingBus::new(InterfaceType::Spi);
        let config = I2cConfig::new(0, 100_000, 0x50).into();
        let res = Memory::with_transport(Variant::Eeprom24xx02, config, &mut bus);
        assert!(matches!(res, Err(Error::InvalidArgument)));
        assert_eq!(bus.events.as_slice(), &[Event::Deinit]);
    }

    #[test]
    fn test_deinit_hands_back_or_releases() {
        let mem = microwire(Variant::Microwire93C46);
        let bus = mem.deinit(false).unwrap().unwrap();
        assert!(bus.events.is_empty());

        let mut bus = RecordingBus::new(InterfaceType::Spi);
        let config = SpiConfig::new(0, 1_000_000).into();
        let mem = Memory::with_transport(Variant::Microwire93C46, config, &mut bus).unwrap();
        assert!(mem.deinit(true).unwrap().is_none());
        assert_eq!(bus.events.as_slice(), &[Event::Deinit]);
    }

    #[test]
    fn test_ack_polling() {
        let mut bus = RecordingBus::new(InterfaceType::I2c);
        bus.ack_after = 2;
        let config = I2cConfig::new(0, 100_000, 0x51).into();
        let mut mem = Memory::with_transport(Variant::Eeprom24xx256, config, bus).unwrap();
        mem.ping(10).unwrap();
        assert_eq!(
            mem.transport().events.as_slice(),
            &[
                Event::Ping(0x51),
                Event::Delay(1),
                Event::Ping(0x51),
                Event::Delay(1),
                Event::Ping(0x51),
            ]
        );

        mem.transport_mut().ack_after = u32::MAX;
        mem.transport_mut().events.clear();
        assert_eq!(mem.ping(3), Err(Error::Timeout));
        assert_eq!(mem.transport().events.len(), 7);
    }

    #[test]
    fn test_microwire_erase_uses_dedicated_opcodes() {
        let mut mem = microwire(Variant::Microwire93C46);
        mem.erase(0xFF).unwrap();
        assert_eq!(
            mem.transport().events.as_slice(),
            &[
                Event::Frame { opcode: microwire::EWEN, opcode_bits: 5, address: 0, address_bits: 5, write_len: 0 },
                Event::Frame { opcode: microwire::ERAL, opcode_bits: 5, address: 0, address_bits: 5, write_len: 0 },
                Event::Delay(10),
            ]
        );

        mem.transport_mut().events.clear();
        mem.erase_page(0x12, 0xFF).unwrap();
        assert_eq!(
            mem.transport().events.as_slice(),
            &[
                Event::Frame { opcode: microwire::EWEN, opcode_bits: 5, address: 0, address_bits: 5, write_len: 0 },
                Event::Frame { opcode: microwire::ERASE, opcode_bits: 3, address: 0x12, address_bits: 7, write_len: 0 },
                Event::Delay(10),
            ]
        );

        mem.transport_mut().events.clear();
        mem.erase_page(0x12, 0x00).unwrap();
        assert_eq!(
            mem.transport().events[1],
            Event::Frame { opcode: microwire::WRITE, opcode_bits: 3, address: 0x12, address_bits: 7, write_len: 1 }
        );
    }

    #[test]
    fn test_microwire_write_enables_once() {
        let mut mem = microwire(Variant::Microwire93C56);
        assert_eq!(mem.write(0x10, &[1, 2, 3], 0, false), Ok(3));
        let frames: Vec<Event, 8> = mem
            .transport()
            .events
            .iter()
            .copied()
            .filter(|e| matches!(e, Event::Frame { opcode: microwire::EWEN, .. }))
            .collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(mem.transport().events.len(), 1 + 3 * 2);
    }

    #[test]
    fn test_stub_only_transacts() {
        let config = SpiConfig::new(0, 1_000_000).into();
        let mut mem = Memory::with_transport(Variant::StubSpi, config, RecordingBus::new(InterfaceType::Spi)).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(mem.read(0, &mut buf, 0), Err(Error::InvalidArgument));
        assert_eq!(mem.erase(0xFF), Err(Error::InvalidArgument));
        let mut txn = Transaction::command(0x9F, 8).with_read(&mut buf);
        mem.transact(&mut txn).unwrap();
        assert_eq!(buf, [0x5A, 0x5A]);

        let mut mem = microwire(Variant::Microwire93C46);
        assert_eq!(mem.transact(&mut Transaction::command(0, 0)), Err(Error::InvalidArgument));
        assert_eq!(mem.read_id(0), Err(Error::InvalidArgument));
        assert_eq!(mem.ping(0), Err(Error::InvalidArgument));
    }

    #[test]
    fn test_addressed_operations_validate_range() {
        let mut mem = microwire(Variant::Microwire93C46);
        let mut buf = [0u8; 1];
        assert_eq!(mem.read(128, &mut buf, 0), Err(Error::InvalidArgument));
        assert_eq!(mem.write(128, &[0], 0, false), Err(Error::InvalidArgument));
        assert_eq!(mem.erase_page(128, 0xFF), Err(Error::InvalidArgument));
        assert!(mem.transport().events.is_empty());
    }
}
