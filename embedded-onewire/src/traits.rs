use crate::{ONEWIRE_MATCH_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, OneWireError, OneWireResult, id_to_rom};

/// Bus status reported by a 1-Wire master after a bus operation.
pub trait OneWireStatus {
    /// A presence pulse was detected during the last bus reset.
    fn presence(&self) -> bool;
    /// The master is still executing a 1-Wire operation.
    fn busy(&self) -> bool;
    /// First bit read by the last triplet (the id bit).
    fn id_bit(&self) -> bool;
    /// Second bit read by the last triplet (the complement of the id bit).
    fn complement_bit(&self) -> bool;
    /// Direction bit written by the last triplet.
    fn direction(&self) -> bool;
}

/// Trait for 1-Wire communication.
/// This trait defines the basic operations required for 1-Wire communication through a bus
/// master: resetting the bus, writing and reading bytes, and the search triplet.
pub trait OneWire {
    /// The status type returned by the triplet operation.
    /// This type must implement the [OneWireStatus] trait.
    type Status: OneWireStatus;
    /// The error type returned by the operations of this trait.
    /// This type is used to indicate errors in the underlying hardware or communication.
    type BusError;

    /// Resets the 1-Wire bus.
    ///
    /// # Returns
    /// `true` if a presence pulse was observed and the bus went idle within the
    /// master's timing budget. Timeouts are reported as `false`, not as an error.
    ///
    /// # Errors
    /// This method returns an error if the transport to the bus master fails.
    fn reset(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Resets the 1-Wire bus, retrying within the master's timing budget until a presence
    /// pulse is seen.
    ///
    /// Masters without a timer of their own issue a single [`OneWire::reset`].
    fn reset_wait(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.reset()
    }

    /// Writes a byte to the 1-Wire bus.
    /// # Arguments
    /// * `byte` - The byte to write to the bus.
    ///
    /// # Errors
    /// This method returns an error if the write operation fails.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError>;

    /// Reads a byte from the 1-Wire bus.
    /// # Returns
    /// Byte read from the bus.
    ///
    /// # Errors
    /// This method returns an error if the read operation fails.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError>;

    /// Performs one step of the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html).
    ///
    /// Generates three time slots: two read time slots and one write time slot at the 1-Wire line.
    /// If both read time slots are 0 (a discrepancy), the written bit is `direction`.
    /// If the read time slots are 0 and 1, they are followed by a write-zero time slot.
    /// If the read time slots are 1 and 0, they are followed by a write-one time slot.
    /// If the read time slots are both 1 (no device answered), the write time slot is a write-one.
    ///
    /// # Returns
    /// The status snapshot carrying both read bits and the direction actually written.
    fn triplet(&mut self, direction: bool) -> OneWireResult<Self::Status, Self::BusError>;

    /// Enables the strong pull-up for the next bus activity, to power a device through
    /// a conversion or an EEPROM copy.
    fn strong_pullup(&mut self) -> OneWireResult<(), Self::BusError> {
        Err(OneWireError::Unimplemented)
    }

    /// Addresses devices on the 1-Wire bus.
    /// The first [`OneWire::read_byte`] or [`OneWire::write_byte`] operation of a device command
    /// should be preceded by this method.
    /// # Arguments
    /// * `rom` - The ROM identifier of the device to address. Pass [`None`] to skip ROM addressing
    ///   and address all devices on the bus.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`] if [`OneWire::reset_wait`] saw no presence pulse.
    fn address(&mut self, rom: Option<u64>) -> OneWireResult<(), Self::BusError> {
        if !self.reset_wait()? {
            return Err(OneWireError::NoDevicePresent);
        }
        match rom {
            Some(rom) => {
                self.write_byte(ONEWIRE_MATCH_ROM_CMD)?;
                for &b in id_to_rom(rom).iter() {
                    self.write_byte(b)?;
                }
            }
            None => self.write_byte(ONEWIRE_SKIP_ROM_CMD)?,
        }
        Ok(())
    }
}

