use thiserror::Error;

/// Invalid arguments detected before any bus traffic happens.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Pin index outside of `0..=7`.
    #[error("pin {0} out of range (0-7)")]
    InvalidPin(u8),
    /// I2C address outside of the `0x20..=0x27` window the chip can answer on.
    #[error("address 0x{0:02x} out of range (0x20-0x27)")]
    InvalidAddress(u8),
    /// Raw bank-mode value that is neither 0 nor 1.
    #[error("unknown bank mode {0}")]
    InvalidBankMode(u8),
}

/// Errors returned by the driver.
///
/// `E` is the error type of the underlying I2C bus.
#[derive(Error, Debug)]
pub enum Error<E> {
    /// The bus transaction failed.  Nothing is retried; the chip may have seen
    /// part of the transaction.
    #[error("bus transaction failed: {0:?}")]
    Bus(E),
    /// Invalid argument.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigurationError),
    /// The host interrupt line could not be configured or waited on.
    #[error("interrupt line error: {0:?}")]
    InterruptLine(embedded_hal::digital::ErrorKind),
}

impl<E> Error<E> {
    pub(crate) fn line<L: embedded_hal::digital::Error>(e: L) -> Self {
        Error::InterruptLine(e.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e: Error<()> = ConfigurationError::InvalidPin(9).into();
        assert_eq!(e.to_string(), "invalid configuration: pin 9 out of range (0-7)");

        let e = ConfigurationError::InvalidAddress(0x40);
        assert_eq!(e.to_string(), "address 0x40 out of range (0x20-0x27)");

        let e: Error<embedded_hal::i2c::ErrorKind> =
            Error::Bus(embedded_hal::i2c::ErrorKind::Other);
        assert_eq!(e.to_string(), "bus transaction failed: Other");
    }
}
