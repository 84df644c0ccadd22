use core::fmt;

/// Driver errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error<E> {
    /// I2C bus error while opening, writing or reading.
    I2c(E),
    /// CRC validation failed. Only returned when asking a `Reading` for a verified value.
    ChecksumMismatch,
    /// The session has not been initialized with `init`.
    NotInitialized,
    /// An earlier bus error or timeout left the session unusable.
    Failed,
    /// The sensor was still busy after the configured number of status reads.
    Timeout,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::ChecksumMismatch => f.write_str("CRC mismatch"),
            Error::NotInitialized => f.write_str("sensor not initialized"),
            Error::Failed => f.write_str("sensor session failed"),
            Error::Timeout => f.write_str("timed out waiting for sensor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn display() {
        let err: Error<u8> = Error::I2c(4);
        assert_eq!(format!("{}", err), "I2C error: 4");
        assert_eq!(format!("{}", Error::<u8>::Timeout), "timed out waiting for sensor");
    }
}
