//! Getting hold of the I2C device the sensor sits on.
//!
//! Reads and writes go through [`embedded_hal::i2c::I2c`]. What this module adds is the step
//! before that: turning a bus index into an open device. On a microcontroller the HAL has already
//! done that, so wrap the bus in [`Attached`]. On Linux, [`LinuxBus`] opens `/dev/i2c-N`.

use embedded_hal::i2c::{ErrorType, I2c};

/// Something that can open a connection to the device at `address` on bus `bus`.
///
/// `open` consumes the transport. The device it returns belongs to exactly one sensor session.
pub trait Transport {
    type Device: I2c;

    fn open(
        self,
        bus: u8,
        address: u8,
        flags: u32,
    ) -> Result<Self::Device, <Self::Device as ErrorType>::Error>;
}

/// A bus that was opened elsewhere. Opening it hands it straight back.
pub struct Attached<I>(I);

impl<I: I2c> Attached<I> {
    pub fn new(i2c: I) -> Self {
        Attached(i2c)
    }

    /// Give back the wrapped bus without opening it.
    pub fn into_inner(self) -> I {
        self.0
    }
}

impl<I: I2c> Transport for Attached<I> {
    type Device = I;

    fn open(self, _bus: u8, _address: u8, _flags: u32) -> Result<I, I::Error> {
        Ok(self.0)
    }
}

#[cfg(feature = "linux")]
pub use self::linux::LinuxBus;

#[cfg(feature = "linux")]
mod linux {
    use super::Transport;
    use linux_embedded_hal::{I2CError, I2cdev};
    use std::format;

    /// The Linux i2c-dev interface, `/dev/i2c-<bus>`.
    ///
    /// No open flags are defined; pass 0.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LinuxBus;

    impl Transport for LinuxBus {
        type Device = I2cdev;

        fn open(self, bus: u8, _address: u8, _flags: u32) -> Result<I2cdev, I2CError> {
            // The address is set on every transfer by linux-embedded-hal.
            let i2c = I2cdev::new(format!("/dev/i2c-{}", bus))?;
            Ok(i2c)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Attached, Transport};
    use crate::SENSOR_ADDRESS;
    use embedded_hal::i2c::I2c;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    /// Opening an attached bus gives back the same bus, whatever the bus index.
    #[test]
    fn attached_open() {
        let expectations = [Transaction::write(SENSOR_ADDRESS, vec![0xBA])];
        let transport = Attached::new(I2cMock::new(&expectations));

        let mut i2c = transport.open(7, SENSOR_ADDRESS, 0).unwrap();
        i2c.write(SENSOR_ADDRESS, &[0xBA]).unwrap();

        i2c.done(); // verify expectations
    }

    #[test]
    fn attached_into_inner() {
        let mut i2c = Attached::new(I2cMock::new(&[])).into_inner();
        i2c.done();
    }
}
