use crate::{
    DeviceRegistry, ONEWIRE_SEARCH_CMD, OneWire, OneWireCrc, OneWireResult, OneWireStatus,
    rom_to_id,
};
use core::fmt::Debug;
use log::{debug, info, warn};

/// State of the ROM search carried from one call of [`DeviceSearch::next`] to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    rom: [u8; 8],
    last_discrepancy: u8,
    last_family_discrepancy: u8,
    last_device: bool,
}

impl SearchState {
    /// Bit index (1..=64) of the most recent branch still to be taken the other way, 0 if none.
    pub fn last_discrepancy(&self) -> u8 {
        self.last_discrepancy
    }

    /// Bit index of the most recent unresolved branch inside the family code byte, 0 if none.
    pub fn last_family_discrepancy(&self) -> u8 {
        self.last_family_discrepancy
    }

    /// Set once the last device of the bus has been returned.
    pub fn last_device(&self) -> bool {
        self.last_device
    }

    /// Direction to prefer at bit `id_bit_num` if the devices disagree there.
    ///
    /// Before the last discrepancy the previous path is replayed, at the last
    /// discrepancy the 1 branch is taken, past it the 0 branch is taken.
    fn preferred_direction(&self, id_bit_num: u8, idx: usize, mask: u8) -> bool {
        if id_bit_num < self.last_discrepancy {
            self.rom[idx] & mask > 0
        } else {
            id_bit_num == self.last_discrepancy
        }
    }
}

/// Search context: the ROM search state and the registry it fills.
///
/// A full enumeration is [`first`](DeviceSearch::first) followed by
/// [`next`](DeviceSearch::next) until it returns `None`, which is what
/// [`enumerate`](DeviceSearch::enumerate) does. The order in which devices are found
/// depends only on their identifiers: at every discrepancy the 0 branch is visited first.
#[derive(Debug, Clone, Default)]
pub struct DeviceSearch<const N: usize> {
    state: SearchState,
    registry: DeviceRegistry<N>,
    pass_open: bool,
}

impl<const N: usize> DeviceSearch<N> {
    /// Creates a search context with an empty registry.
    pub fn new() -> Self {
        Self {
            state: SearchState::default(),
            registry: DeviceRegistry::new(),
            pass_open: false,
        }
    }

    /// Current search state.
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Identifiers found by the current or last search pass.
    pub fn registry(&self) -> &DeviceRegistry<N> {
        &self.registry
    }

    fn reset(&mut self) {
        self.state = SearchState::default();
        self.pass_open = false;
    }

    /// Starts a new search pass and returns the first device.
    ///
    /// Clears the search state and the registry. See [`next`](DeviceSearch::next) for
    /// the return values.
    pub fn first<T: OneWire>(&mut self, bus: &mut T) -> OneWireResult<Option<u64>, T::BusError> {
        self.reset();
        self.registry.clear();
        self.pass_open = true;
        self.next(bus)
    }

    /// Continues the search pass and returns the next device.
    ///
    /// Implements the [1-Wire search algorithm](https://www.analog.com/en/resources/app-notes/1wire-search-algorithm.html)
    /// on top of [`OneWire::triplet`]. A found identifier is appended to the registry.
    ///
    /// # Returns
    /// - `Ok(Some(rom))` when a device was found.
    /// - `Ok(None)` when the pass is exhausted: the last device was already returned, no
    ///   presence pulse was seen, no device answered a search bit, or the identifier read
    ///   as all zeros. The search state is reset, so the next call starts a fresh pass.
    ///
    /// # Errors
    /// Errors of the bus master (transport failures, busy timeouts) are returned after
    /// the search state has been reset.
    ///
    /// The trailing CRC byte of the identifier is not enforced: an identifier that fails
    /// its CRC check is logged and still returned.
    #[allow(clippy::should_implement_trait)]
    pub fn next<T: OneWire>(&mut self, bus: &mut T) -> OneWireResult<Option<u64>, T::BusError> {
        match self.step(bus) {
            Ok(Some(rom)) => {
                if !self.pass_open {
                    self.registry.clear();
                    self.pass_open = true;
                }
                debug!("Found ROM {rom:016X}");
                self.registry.register(rom);
                if self.state.last_device {
                    debug!("Last device on the bus");
                }
                Ok(Some(rom))
            }
            Ok(None) => {
                self.reset();
                Ok(None)
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    fn step<T: OneWire>(&mut self, bus: &mut T) -> OneWireResult<Option<u64>, T::BusError> {
        if self.state.last_device {
            return Ok(None);
        }
        if !bus.reset()? {
            debug!("No presence pulse, nothing to search");
            return Ok(None);
        }
        bus.write_byte(ONEWIRE_SEARCH_CMD)?;

        let mut id_bit_num: u8 = 1;
        let mut last_zero: u8 = 0;
        let mut idx: usize = 0;
        let mut rom_mask: u8 = 1;
        while idx < self.state.rom.len() {
            let dir = self.state.preferred_direction(id_bit_num, idx, rom_mask);
            let status = bus.triplet(dir)?;
            let (id_bit, complement_bit, taken) =
                (status.id_bit(), status.complement_bit(), status.direction());
            if id_bit && complement_bit {
                warn!("No device answered search bit {id_bit_num}");
                return Ok(None);
            }
            if !id_bit && !complement_bit && !taken {
                last_zero = id_bit_num;
                if last_zero < 9 {
                    self.state.last_family_discrepancy = last_zero;
                }
            }
            if taken {
                self.state.rom[idx] |= rom_mask;
            } else {
                self.state.rom[idx] &= !rom_mask;
            }
            id_bit_num += 1;
            rom_mask <<= 1;
            if rom_mask == 0 {
                idx += 1;
                rom_mask = 1;
            }
        }

        self.state.last_discrepancy = last_zero;
        self.state.last_device = last_zero == 0;
        let rom = rom_to_id(self.state.rom);
        if rom == 0 {
            return Ok(None);
        }
        // TODO: reject identifiers with a bad CRC once deployed sensor populations are checked for it.
        if !OneWireCrc::validate(&self.state.rom) {
            warn!("ROM {rom:016X} fails its CRC check, accepted unverified");
        }
        Ok(Some(rom))
    }

    /// Runs a full search pass and returns the number of registered devices.
    ///
    /// Any error ends the pass early: it is logged, and the devices found until then stay
    /// registered. Devices beyond the registry capacity are walked but not stored.
    pub fn enumerate<T: OneWire>(&mut self, bus: &mut T) -> usize
    where
        T::BusError: Debug,
    {
        let mut found = self.first(bus);
        loop {
            match found {
                Ok(Some(_)) => found = self.next(bus),
                Ok(None) => break,
                Err(e) => {
                    warn!("Search pass aborted: {e:?}");
                    break;
                }
            }
        }
        info!("Found {} devices", self.registry.len());
        self.registry.len()
    }
}
