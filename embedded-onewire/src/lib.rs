#![no_std]
#![deny(missing_docs)]
//! # embedded-onewire
//! A no-std implementation of the 1-Wire protocol.
//!
//! This crate provides a trait-based interface for 1-Wire communication through a bus master
//! (typically a bridge chip). The [OneWire] trait defines the bus operations a master has to
//! provide: reset with presence detection, byte reads and writes, and the search triplet.
//!
//! The crate also provides the ROM search algorithm in [DeviceSearch], which enumerates the
//! identifiers of every device on the bus into a fixed-capacity [DeviceRegistry].

mod error;
mod registry;
mod search;
mod traits;
mod utils;
pub use error::OneWireError;
pub use registry::DeviceRegistry;
pub use search::{DeviceSearch, SearchState};
pub use traits::{OneWire, OneWireStatus};
pub use utils::{OneWireCrc, family_of, id_to_rom, rom_to_id};

/// Error type for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;

/// Command to match a specific ROM address in 1-Wire communication.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Command to skip ROM address in 1-Wire communication.
pub const ONEWIRE_SKIP_ROM_CMD: u8 = 0xcc;

/// Command to search for devices on the 1-Wire bus.
pub const ONEWIRE_SEARCH_CMD: u8 = 0xf0;
