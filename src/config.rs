use crate::checksum::ChecksumPolicy;
use crate::SENSOR_ADDRESS;

/// Default bound on status reads while waiting for a measurement.
///
/// A healthy sensor has finished converting by the time the 80ms wait is over, so this only
/// matters for a sensor that never clears its busy bit.
pub const DEFAULT_MAX_STATUS_READS: u32 = 1_000;

/// Where the sensor is and how readings are judged.
///
/// Given to `Aht20::new`, fixed for the life of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Config {
    /// Bus index handed to `Transport::open`.
    pub bus: u8,
    /// I2C address. This will be `SENSOR_ADDRESS` unless there is address translating hardware.
    pub address: u8,
    /// Flags handed to `Transport::open`.
    pub flags: u32,
    /// How the CRC byte of each frame is judged. A failed check never aborts a measurement.
    pub checksum: ChecksumPolicy,
    /// How many status reads to make before giving up on a busy sensor with `Error::Timeout`.
    /// `None` waits forever. At least one status read is always made, so `Some(0)` behaves like
    /// `Some(1)`.
    pub max_status_reads: Option<u32>,
}

impl Config {
    pub const fn new(bus: u8) -> Self {
        Config {
            bus,
            address: SENSOR_ADDRESS,
            flags: 0,
            checksum: ChecksumPolicy::Strict,
            max_status_reads: Some(DEFAULT_MAX_STATUS_READS),
        }
    }

    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    pub const fn with_checksum(mut self, checksum: ChecksumPolicy) -> Self {
        self.checksum = checksum;
        self
    }

    pub const fn with_max_status_reads(mut self, max_status_reads: Option<u32>) -> Self {
        self.max_status_reads = max_status_reads;
        self
    }
}

impl Default for Config {
    /// Bus 1, the usual bus on a Raspberry Pi header.
    fn default() -> Self {
        Config::new(1)
    }
}
