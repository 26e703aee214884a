use core::fmt;

/// One wire communication error type.
#[derive(Debug, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type from the underlying bus master.
    Other(E),
    /// Indicates that no device answered on the bus, either with a presence
    /// pulse after a reset or during a search bit.
    NoDevicePresent,
    /// Indicates that the operation is not implemented by the bus master.
    Unimplemented,
    /// The requested registry slot does not hold a device.
    InvalidSlot,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}

impl<E: fmt::Debug> fmt::Display for OneWireError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(e) => write!(f, "bus master error: {e:?}"),
            Self::NoDevicePresent => f.write_str("no device present on the 1-Wire bus"),
            Self::Unimplemented => f.write_str("operation not supported by the bus master"),
            Self::InvalidSlot => f.write_str("registry slot is empty"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for OneWireError<E> {}
