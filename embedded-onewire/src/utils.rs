/// Converts a ROM identifier from wire order to its integer form.
///
/// Byte 0 on the wire (the family code) becomes the most significant byte, and the
/// CRC byte (last on the wire) becomes the least significant byte, so that a DS18B20
/// reads as `0x28..`. The conversion does not depend on the platform byte order.
///
/// | Bits  | Wire byte | Description |
/// |-------|-----------|-------------|
/// | 56-63 | 0 | Family code (e.g., 0x28 for DS18B20) |
/// | 8-55  | 1-6 | Serial number |
/// | 0-7   | 7 | CRC-8 (`0b1_0001_1001` poly) |
pub const fn rom_to_id(rom: [u8; 8]) -> u64 {
    u64::from_be_bytes(rom)
}

/// Converts a ROM identifier to wire order, the inverse of [`rom_to_id`].
pub const fn id_to_rom(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Family code of a ROM identifier.
pub const fn family_of(id: u64) -> u8 {
    (id >> 56) as u8
}

#[derive(Debug, Default)]
/// Calculate CRC-8 used in 1-Wire communications.
pub struct OneWireCrc(u8);

impl OneWireCrc {
    /// Get the current CRC value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Update the CRC with the incoming byte.
    pub fn update(&mut self, byte: u8) {
        let mut crc = self.0 ^ byte;
        for _ in 0..8 {
            if crc & 0x1 == 0x1 {
                crc = (crc >> 1) ^ 0x8c;
            } else {
                crc >>= 1;
            }
        }
        self.0 = crc;
    }

    /// Validate a sequence of bytes where the last byte is the 1-Wire CRC of
    /// the previous bytes.
    pub fn validate(sequence: &[u8]) -> bool {
        let mut crc = OneWireCrc::default();
        for &byte in sequence.iter() {
            crc.update(byte);
        }
        crc.0 == 0x0
    }
}
