#![no_std]
#![deny(missing_docs)]
//! # DS18B20
//!
//! A no-std implementation of the DS18B20 1-Wire temperature sensors in a group.
//!
//! The group discovers every device on the bus with a ROM search, gives each a fixed slot,
//! and addresses sensors individually with Match ROM.
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;
use embedded_onewire::{DeviceSearch, OneWire, OneWireError, OneWireResult, family_of};
use fixed::types::U12F4;
use log::{debug, warn};

const DS18B20_START_CONV: u8 = 0x44;
const DS18B20_WRITE_SCRATCH: u8 = 0x4e;
const DS18B20_READ_SCRATCH: u8 = 0xbe;
const DS18B20_COPY_SCRATCH: u8 = 0x48;
const DS18B20_COPY_SCRATCH_MS: u32 = 10;

/// Raw temperature register of a DS18B20, 1/16 °C per count.
///
/// The register is read as unsigned: temperatures below 0 °C wrap to large values.
pub type RawTemperature = U12F4;

#[derive(Debug)]
/// Represents a group of DS18B20 devices on the 1-Wire bus.
/// This struct can handle up to `N` devices, where `N` is a compile-time constant.
pub struct Ds18b20Group<const N: usize> {
    search: DeviceSearch<N>,
    temps: [u16; N],
    resolution: ReadoutResolution,
    user: [u8; 2],
}

impl<const N: usize> Default for Ds18b20Group<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Ds18b20Group<N> {
    #[inline]
    /// Returns the family code for the DS18B20 devices.
    pub const fn family() -> u8 {
        0x28
    }

    fn new() -> Self {
        Self {
            search: DeviceSearch::new(),
            temps: [0; N],
            resolution: ReadoutResolution::default(),
            user: [0xff, 0xff],
        }
    }

    /// Sets the temperature readout resolution written to every sensor.
    pub fn with_resolution(mut self, resolution: ReadoutResolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the two user bytes (TH and TL alarm registers) written to every sensor.
    pub fn with_user_bytes(mut self, th: u8, tl: u8) -> Self {
        self.user = [th, tl];
        self
    }

    /// Number of registered sensors.
    pub fn devices(&self) -> usize {
        self.search.registry().len()
    }

    /// ROM identifiers of the registered sensors, in slot order.
    pub fn ids(&self) -> &[u64] {
        self.search.registry().ids()
    }

    /// Copies the registered ROM identifiers into `buf`, see
    /// [`DeviceRegistry::get_all_ids`](embedded_onewire::DeviceRegistry::get_all_ids).
    pub fn get_all_ids(&self, buf: &mut [u64]) -> usize {
        self.search.registry().get_all_ids(buf)
    }

    /// Slot of a sensor given its ROM identifier.
    pub fn address_to_slot(&self, rom: u64) -> Option<usize> {
        self.search.registry().lookup_slot(rom)
    }

    fn rom<E>(&self, slot: usize) -> OneWireResult<u64, E> {
        self.search
            .registry()
            .get(slot)
            .ok_or(OneWireError::InvalidSlot)
    }

    /// Discovers the sensors on the bus and writes the group configuration to each of them.
    ///
    /// Returns the number of registered sensors.
    pub fn enumerate<O: OneWire, D: DelayNs>(
        &mut self,
        bus: &mut O,
        delay: &mut D,
    ) -> OneWireResult<usize, O::BusError>
    where
        O::BusError: Debug,
    {
        let devices = self.search.enumerate(bus);
        self.temps = [0; N];
        for slot in 0..devices {
            let rom = self.rom::<O::BusError>(slot)?;
            if family_of(rom) != Self::family() {
                warn!("ROM {rom:016X} in slot {slot} is not a DS18B20");
            }
            self.configure(bus, delay, rom)?;
        }
        Ok(devices)
    }

    fn configure<O: OneWire, D: DelayNs>(
        &self,
        bus: &mut O,
        delay: &mut D,
        rom: u64,
    ) -> OneWireResult<(), O::BusError> {
        bus.address(Some(rom))?;
        bus.write_byte(DS18B20_WRITE_SCRATCH)?;
        bus.write_byte(self.user[0])?;
        bus.write_byte(self.user[1])?;
        bus.write_byte(self.resolution as _)?;
        bus.address(Some(rom))?;
        critical_section::with(|_| -> OneWireResult<(), O::BusError> {
            bus.write_byte(DS18B20_COPY_SCRATCH)?;
            Self::power(bus)
        })?;
        delay.delay_ms(DS18B20_COPY_SCRATCH_MS);
        Ok(())
    }

    /// Enables the strong pullup, if the bus master has one.
    fn power<O: OneWire>(bus: &mut O) -> OneWireResult<(), O::BusError> {
        match bus.strong_pullup() {
            Err(OneWireError::Unimplemented) => Ok(()),
            res => res,
        }
    }

    /// Runs a conversion on the sensor in `slot` and reads the result in whole degrees Celsius.
    ///
    /// The reading is scaled by 1/16 and truncated.
    pub fn read_temperature<O: OneWire, D: DelayNs>(
        &mut self,
        bus: &mut O,
        delay: &mut D,
        slot: usize,
    ) -> OneWireResult<u16, O::BusError> {
        let raw = self.read_raw(bus, delay, slot)?;
        let temp = raw.to_num::<u16>();
        self.temps[slot] = temp;
        Ok(temp)
    }

    /// Runs a conversion on the sensor in `slot` and reads the raw temperature register.
    pub fn read_raw<O: OneWire, D: DelayNs>(
        &self,
        bus: &mut O,
        delay: &mut D,
        slot: usize,
    ) -> OneWireResult<RawTemperature, O::BusError> {
        let rom = self.rom::<O::BusError>(slot)?;
        bus.address(Some(rom))?;
        critical_section::with(|_| -> OneWireResult<(), O::BusError> {
            bus.write_byte(DS18B20_START_CONV)?;
            Self::power(bus)
        })?;
        delay.delay_us(self.resolution.delay_us());
        bus.address(Some(rom))?;
        bus.write_byte(DS18B20_READ_SCRATCH)?;
        let lsb = bus.read_byte()?;
        let msb = bus.read_byte()?;
        let raw = RawTemperature::from_le_bytes([lsb, msb]);
        debug!("ROM {rom:016X}: {raw}");
        Ok(raw)
    }

    /// Reads every registered sensor in slot order.
    pub fn read_temperatures<O: OneWire, D: DelayNs>(
        &mut self,
        bus: &mut O,
        delay: &mut D,
    ) -> OneWireResult<&[u16], O::BusError> {
        for slot in 0..self.devices() {
            self.read_temperature(bus, delay, slot)?;
        }
        Ok(&self.temps[..self.devices()])
    }
}

/// Readout resolution of the DS18B20, as written to its configuration register.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ReadoutResolution {
    /// 9 bits, 0.5 °C
    #[default]
    Resolution9bit = 0x1f,
    /// 10 bits, 0.25 °C
    Resolution10bit = 0x3f,
    /// 11 bits, 0.125 °C
    Resolution11bit = 0x5f,
    /// 12 bits, 0.0625 °C
    Resolution12bit = 0x7f,
}

impl ReadoutResolution {
    /// Maximum conversion time in microseconds.
    pub fn delay_us(&self) -> u32 {
        use ReadoutResolution::*;
        match self {
            Resolution9bit => 93750,
            Resolution10bit => 187500,
            Resolution11bit => 375000,
            Resolution12bit => 750000,
        }
    }
}

impl TryFrom<u8> for ReadoutResolution {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use ReadoutResolution::*;
        match value {
            0x1f | 9 => Ok(Resolution9bit),
            0x3f | 10 => Ok(Resolution10bit),
            0x5f | 11 => Ok(Resolution11bit),
            0x7f | 12 => Ok(Resolution12bit),
            _ => Err("Invalid readout resolution"),
        }
    }
}
