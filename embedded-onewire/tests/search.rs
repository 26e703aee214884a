use embedded_onewire::{
    DeviceSearch, ONEWIRE_SEARCH_CMD, OneWire, OneWireError, OneWireResult, OneWireStatus,
    id_to_rom,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
struct Triplet {
    id_bit: bool,
    complement_bit: bool,
    direction: bool,
}

impl OneWireStatus for Triplet {
    fn presence(&self) -> bool {
        true
    }

    fn busy(&self) -> bool {
        false
    }

    fn id_bit(&self) -> bool {
        self.id_bit
    }

    fn complement_bit(&self) -> bool {
        self.complement_bit
    }

    fn direction(&self) -> bool {
        self.direction
    }
}

#[derive(Debug, PartialEq)]
struct Stuck;

/// Multi-drop bus with wired-AND reads, as seen through a triplet-capable master.
struct SimBus {
    devices: Vec<[u8; 8]>,
    selected: Vec<bool>,
    bit: usize,
    presence: bool,
    /// Force both read slots high at this bit position (0-based).
    dropout_at: Option<usize>,
    /// Fail the triplet with a bus master error at this bit position (0-based).
    stuck_at: Option<usize>,
    resets: usize,
}

impl SimBus {
    fn new(ids: &[u64]) -> Self {
        Self {
            devices: ids.iter().map(|&id| id_to_rom(id)).collect(),
            selected: vec![false; ids.len()],
            bit: 0,
            presence: !ids.is_empty(),
            dropout_at: None,
            stuck_at: None,
            resets: 0,
        }
    }

    fn device_bit(rom: &[u8; 8], bit: usize) -> bool {
        rom[bit / 8] & (1 << (bit % 8)) != 0
    }
}

impl OneWire for SimBus {
    type Status = Triplet;
    type BusError = Stuck;

    fn reset(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.resets += 1;
        self.selected.iter_mut().for_each(|s| *s = false);
        Ok(self.presence)
    }

    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        if byte == ONEWIRE_SEARCH_CMD {
            self.selected.iter_mut().for_each(|s| *s = true);
            self.bit = 0;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        Ok(0xff)
    }

    fn triplet(&mut self, direction: bool) -> OneWireResult<Self::Status, Self::BusError> {
        let bit = self.bit;
        self.bit += 1;
        if self.stuck_at == Some(bit) {
            return Err(OneWireError::Other(Stuck));
        }
        let active: Vec<usize> = (0..self.devices.len())
            .filter(|&i| self.selected[i])
            .collect();
        let (id_bit, complement_bit) = if self.dropout_at == Some(bit) {
            (true, true)
        } else {
            (
                active.iter().all(|&i| Self::device_bit(&self.devices[i], bit)),
                active.iter().all(|&i| !Self::device_bit(&self.devices[i], bit)),
            )
        };
        let taken = match (id_bit, complement_bit) {
            (false, false) => direction,
            (true, true) => true,
            (id, _) => id,
        };
        for &i in &active {
            if Self::device_bit(&self.devices[i], bit) != taken {
                self.selected[i] = false;
            }
        }
        Ok(Triplet {
            id_bit,
            complement_bit,
            direction: taken,
        })
    }
}

/// Reference order of a search: at every discrepancy the 0 branch comes first, which is
/// the ascending order of the identifiers read with bit 0 of wire byte 0 as the most
/// significant search bit.
fn search_order(ids: &[u64]) -> Vec<u64> {
    let key = |id: &u64| {
        let rom = id_to_rom(*id);
        (0..64).fold(0u64, |acc, bit| {
            (acc << 1) | ((rom[bit / 8] >> (bit % 8)) & 1) as u64
        })
    };
    let mut sorted = ids.to_vec();
    sorted.sort_by_key(key);
    sorted
}

fn full_pass<const N: usize>(search: &mut DeviceSearch<N>, bus: &mut SimBus) -> Vec<u64> {
    let mut found = Vec::new();
    let mut next = search.first(bus);
    while let Ok(Some(rom)) = next {
        found.push(rom);
        next = search.next(bus);
    }
    assert_eq!(next, Ok(None));
    found
}

#[test]
fn empty_bus_yields_nothing() {
    let mut bus = SimBus::new(&[]);
    let mut search = DeviceSearch::<16>::new();
    assert_eq!(search.first(&mut bus), Ok(None));
    assert_eq!(search.enumerate(&mut bus), 0);
    assert!(search.registry().is_empty());
    assert_eq!(search.state().last_discrepancy(), 0);
    assert!(!search.state().last_device());
}

#[test]
fn single_device() {
    let id = 0x2800_0000_1234_ab7e;
    let mut bus = SimBus::new(&[id]);
    let mut search = DeviceSearch::<16>::new();
    assert_eq!(search.first(&mut bus), Ok(Some(id)));
    assert!(search.state().last_device());
    assert_eq!(search.state().last_discrepancy(), 0);
    assert_eq!(search.next(&mut bus), Ok(None));
    assert!(!search.state().last_device());
    assert_eq!(search.registry().ids(), &[id]);
    assert_eq!(search.registry().lookup_slot(id), Some(0));
}

#[test]
fn two_devices_branch_at_bit_ten() {
    // wire byte 1 is 0b01 for one device and 0b11 for the other: bit 10 differs
    let low = 0x2801_0000_0000_0000;
    let high = 0x2803_0000_0000_0000;
    let mut bus = SimBus::new(&[high, low]);
    let mut search = DeviceSearch::<16>::new();

    assert_eq!(search.first(&mut bus), Ok(Some(low)));
    assert_eq!(search.state().last_discrepancy(), 10);
    assert_eq!(search.state().last_family_discrepancy(), 0);
    assert!(!search.state().last_device());

    assert_eq!(search.next(&mut bus), Ok(Some(high)));
    assert_eq!(search.state().last_discrepancy(), 0);
    assert!(search.state().last_device());

    assert_eq!(search.next(&mut bus), Ok(None));
    assert_eq!(search.registry().ids(), &[low, high]);
}

#[test]
fn family_discrepancy_is_tracked() {
    // family codes 0x28 and 0x10 first differ at bit 4
    let a = 0x1000_0000_0000_0001;
    let b = 0x2800_0000_0000_0001;
    let mut bus = SimBus::new(&[a, b]);
    let mut search = DeviceSearch::<4>::new();
    assert_eq!(search.first(&mut bus), Ok(Some(a)));
    assert_eq!(search.state().last_family_discrepancy(), 4);
    assert_eq!(search.state().last_discrepancy(), 4);
    assert_eq!(search.next(&mut bus), Ok(Some(b)));
}

#[test]
fn random_device_sets_enumerate_in_tree_order() {
    let mut rng = StdRng::seed_from_u64(0x1e57_0001);
    for k in 0..=16 {
        let mut ids = HashSet::new();
        while ids.len() < k {
            let id: u64 = rng.random();
            if id != 0 {
                ids.insert(id);
            }
        }
        let ids: Vec<u64> = ids.into_iter().collect();
        let mut bus = SimBus::new(&ids);
        let mut search = DeviceSearch::<16>::new();

        let found = full_pass(&mut search, &mut bus);
        assert_eq!(found, search_order(&ids), "device set of size {k}");
        assert_eq!(search.registry().ids(), found.as_slice());

        let again = full_pass(&mut search, &mut bus);
        assert_eq!(again, found, "re-enumeration of size {k}");
        assert_eq!(search.enumerate(&mut bus), k);
    }
}

#[test]
fn devices_sharing_a_prefix() {
    let ids = [
        0x2800_0000_0000_0001,
        0x2800_0000_0000_0003,
        0x2800_0000_0000_0002,
        0x2880_0000_0000_0000,
        0x2800_0000_0000_0080,
    ];
    let mut bus = SimBus::new(&ids);
    let mut search = DeviceSearch::<8>::new();
    assert_eq!(search.enumerate(&mut bus), ids.len());
    assert_eq!(search.registry().ids(), search_order(&ids).as_slice());
}

#[test]
fn overflow_walks_every_device_but_stores_capacity() {
    let ids: Vec<u64> = (1..=5).map(|i| 0x2800_0000_0000_0000 | i << 8).collect();
    let mut bus = SimBus::new(&ids);
    let mut search = DeviceSearch::<3>::new();
    let found = full_pass(&mut search, &mut bus);
    assert_eq!(found.len(), 5);
    assert_eq!(search.registry().ids(), &found[..3]);
    assert_eq!(search.enumerate(&mut bus), 3);
}

#[test]
fn dropout_aborts_pass_and_next_starts_fresh() {
    let ids = [0x2801_0000_0000_0000, 0x2803_0000_0000_0000];
    let mut bus = SimBus::new(&ids);
    let mut search = DeviceSearch::<4>::new();
    assert_eq!(search.first(&mut bus), Ok(Some(ids[0])));

    bus.dropout_at = Some(20);
    assert_eq!(search.next(&mut bus), Ok(None));
    assert_eq!(search.state().last_discrepancy(), 0);
    assert!(!search.state().last_device());

    // a new pass starts over from the lowest branch and overwrites slot 0
    bus.dropout_at = None;
    assert_eq!(search.next(&mut bus), Ok(Some(ids[0])));
    assert_eq!(search.registry().ids(), &[ids[0]]);
    assert_eq!(search.next(&mut bus), Ok(Some(ids[1])));
    assert_eq!(search.registry().ids(), &ids);
}

#[test]
fn bus_error_resets_state_and_ends_enumeration() {
    let ids = [0x2801_0000_0000_0000, 0x2803_0000_0000_0000];
    let mut bus = SimBus::new(&ids);
    let mut search = DeviceSearch::<4>::new();
    assert_eq!(search.first(&mut bus), Ok(Some(ids[0])));
    bus.stuck_at = Some(3);
    assert_eq!(search.next(&mut bus), Err(OneWireError::Other(Stuck)));
    assert_eq!(search.state().last_discrepancy(), 0);

    bus.stuck_at = Some(3);
    assert_eq!(search.enumerate(&mut bus), 0);
    bus.stuck_at = None;
    assert_eq!(search.enumerate(&mut bus), 2);
}

#[test]
fn search_after_last_device_is_exhausted_without_touching_bus() {
    let id = 0x2800_0000_1234_ab7e;
    let mut bus = SimBus::new(&[id]);
    let mut search = DeviceSearch::<2>::new();
    assert_eq!(search.first(&mut bus), Ok(Some(id)));
    let resets = bus.resets;
    assert_eq!(search.next(&mut bus), Ok(None));
    assert_eq!(bus.resets, resets);
}

#[test]
fn address_sends_match_rom_in_wire_order() {
    struct Recorder(Vec<u8>, bool);
    impl OneWire for Recorder {
        type Status = Triplet;
        type BusError = Stuck;
        fn reset(&mut self) -> OneWireResult<bool, Stuck> {
            Ok(self.1)
        }
        fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Stuck> {
            self.0.push(byte);
            Ok(())
        }
        fn read_byte(&mut self) -> OneWireResult<u8, Stuck> {
            Ok(0)
        }
        fn triplet(&mut self, _: bool) -> OneWireResult<Triplet, Stuck> {
            Err(OneWireError::Unimplemented)
        }
    }
    let mut bus = Recorder(Vec::new(), true);
    bus.address(Some(0x2800_0000_1234_ab7e)).unwrap();
    assert_eq!(bus.0, [0x55, 0x28, 0x00, 0x00, 0x00, 0x12, 0x34, 0xab, 0x7e]);
    bus.0.clear();
    bus.address(None).unwrap();
    assert_eq!(bus.0, [0xcc]);
    assert_eq!(bus.strong_pullup(), Err(OneWireError::Unimplemented));

    let mut absent = Recorder(Vec::new(), false);
    assert_eq!(absent.address(None), Err(OneWireError::NoDevicePresent));
    assert!(absent.0.is_empty());
}
