use core::fmt;

#[derive(Debug, PartialEq, Eq)]
/// DS2482 Hardware Errors
pub enum Ds2482Error<E> {
    /// I2C bus errors.
    I2c(E),
    /// The bridge stayed busy for the whole busy-wait budget.
    Timeout,
    /// The configuration read back after a write differs from the written one.
    ConfigMismatch {
        /// Register byte sent, complements included.
        written: u8,
        /// Register byte read back.
        read: u8,
    },
}

impl<E> From<E> for Ds2482Error<E> {
    fn from(value: E) -> Self {
        Self::I2c(value)
    }
}

impl<E: fmt::Debug> fmt::Display for Ds2482Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c(e) => write!(f, "I2C error: {e:?}"),
            Self::Timeout => f.write_str("1-Wire busy timeout"),
            Self::ConfigMismatch { written, read } => {
                write!(f, "configuration mismatch: wrote {written:#04x}, read {read:#04x}")
            }
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Ds2482Error<E> {}
