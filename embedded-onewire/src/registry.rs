use log::warn;

/// Fixed-capacity table of discovered ROM identifiers.
///
/// Slots are filled in discovery order. The slot index of an identifier stays stable
/// until the next search pass overwrites the table from slot 0.
#[derive(Debug, Clone)]
pub struct DeviceRegistry<const N: usize> {
    ids: [u64; N],
    len: usize,
}

impl<const N: usize> Default for DeviceRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DeviceRegistry<N> {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self { ids: [0; N], len: 0 }
    }

    /// Number of slots in the registry.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of occupied slots.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no identifier is registered.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.ids = [0; N];
        self.len = 0;
    }

    /// Appends an identifier at the next free slot.
    ///
    /// Returns `false` when the registry is full. The identifier is then dropped,
    /// only a warning is logged.
    pub fn register(&mut self, id: u64) -> bool {
        match self.ids.get_mut(self.len) {
            Some(slot) => {
                *slot = id;
                self.len += 1;
                true
            }
            None => {
                warn!("Device registry full ({N} slots), dropping ROM {id:016X}");
                false
            }
        }
    }

    /// Slot index of an identifier.
    pub fn lookup_slot(&self, id: u64) -> Option<usize> {
        self.ids().iter().position(|&v| v == id)
    }

    /// Identifier stored in a slot.
    pub fn get(&self, slot: usize) -> Option<u64> {
        self.ids().get(slot).copied()
    }

    /// The occupied slots in discovery order.
    pub fn ids(&self) -> &[u64] {
        &self.ids[..self.len]
    }

    /// Copies the registered identifiers into `buf`.
    ///
    /// Slots of `buf` past the copied identifiers are zeroed. Returns the number
    /// of identifiers copied.
    pub fn get_all_ids(&self, buf: &mut [u64]) -> usize {
        buf.fill(0);
        let count = self.len.min(buf.len());
        buf[..count].copy_from_slice(&self.ids[..count]);
        count
    }
}
