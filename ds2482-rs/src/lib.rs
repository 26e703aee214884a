#![no_std]
#![deny(missing_docs)]

/*! # DS2482
 *
 * A no-std driver for the DS2482 I2C to 1-Wire bridge.
 *
 * The bridge executes 1-Wire bus cycles on behalf of the host. Every command is
 * preceded by a bounded wait on the 1-Wire busy flag, and a bus reset waits for the
 * presence pulse and the end of the reset cycle with separate budgets. All waits are
 * blocking polls of the status register spaced by one millisecond tick of the
 * [`DelayNs`](embedded_hal::delay::DelayNs) implementation.
 */

pub use embedded_onewire::{OneWire, OneWireError, OneWireResult};
mod error;
mod onewire;
mod registers;
mod timing;

pub use error::Ds2482Error;
pub use registers::{DeviceConfiguration, DeviceStatus, Ds2482Builder, Register};

/// Results of DS2482-specific function calls.
pub type Ds2482Result<T, E> = Result<T, Ds2482Error<E>>;

/// Default I2C address of the DS2482.
pub const DS2482_DEFAULT_ADDR: u8 = 0x18;

/// A DS2482 I2C to 1-Wire bridge device.
///
/// Takes ownership of an I2C bus (implementing [`I2c`](embedded_hal::i2c::I2c) trait)
/// and a timer object implementing the [`DelayNs`](embedded_hal::delay::DelayNs) trait.
pub struct Ds2482<I, D> {
    pub(crate) i2c: I,
    pub(crate) addr: u8,
    pub(crate) delay: D,
    pub(crate) busy_timeout: u32,
    pub(crate) reset_timeout: u32,
    pub(crate) config: DeviceConfiguration,
}

impl<I, D> Ds2482<I, D> {
    /// Creates a new instance of `Ds2482` with the given I2C interface and default timing budgets.
    ///
    /// The device is neither reset nor configured, use [`Ds2482Builder`] for that.
    pub fn new(i2c: I, delay: D) -> Self {
        Ds2482 {
            i2c,
            addr: DS2482_DEFAULT_ADDR,
            delay,
            busy_timeout: timing::BUSY_TIMEOUT_MS,
            reset_timeout: timing::RESET_TIMEOUT_MS,
            config: DeviceConfiguration::new(),
        }
    }

    /// Configuration last written to the device.
    pub fn config(&self) -> DeviceConfiguration {
        self.config
    }

    /// Releases the I2C bus and the timer.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}
