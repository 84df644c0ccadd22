#![cfg_attr(not(any(test, feature = "linux")), no_std)]
//! AHT20 driver with an explicit session lifecycle.
//!
//! Example:
//!
//! ```
//! # use embedded_hal_mock::eh1::delay::NoopDelay as MockDelay;
//! # use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};
//! # use aht20_session::{Aht20, Attached, Config, SENSOR_ADDRESS};
//! # let expectations = vec![
//! #     // Status read during init. Calibrated, so Initialize is not sent.
//! #     Transaction::read(SENSOR_ADDRESS, vec![0b0000_1000]),
//! #     // Trigger measurement.
//! #     Transaction::write(SENSOR_ADDRESS, vec![0xAC, 0x33, 0x00]),
//! #     // Status read, not busy.
//! #     Transaction::read(SENSOR_ADDRESS, vec![0b0000_1000]),
//! #     // 7 bytes taken from a run of the sensor.
//! #     Transaction::read(SENSOR_ADDRESS, vec![0x1c, 0x65, 0xb4, 0x25, 0xcd, 0x26, 0xc6]),
//! # ];
//! # let mock_i2c = I2cMock::new(&expectations);
//! # let mut mock_delay = MockDelay::new();
//! let mut aht20 = Aht20::new(Attached::new(mock_i2c), Config::default());
//! aht20.init(&mut mock_delay).unwrap();
//!
//! let reading = aht20.get_all(&mut mock_delay).unwrap();
//! if !reading.is_valid() {
//!     println!("CRC failed, values are not trustworthy");
//! }
//! println!("temperature (aht20): {:.2}C", reading.value.temperature);
//! println!("humidity (aht20): {:.2}%", reading.value.humidity);
//! # aht20.release().device().unwrap().done();
//! ```
//!
//! [AHT20 Datasheet](https://cdn-learn.adafruit.com/assets/assets/000/091/676/original/AHT20-datasheet-2020-4-16.pdf?1591047915)
//!
//! All section references in this crate are to version 1.1 of the datasheet.
//!
//! Status is read as a bare one byte read, without sending a command first. The sensor answers
//! a read with its status byte, and with the full 7-byte frame if you ask for 7 bytes.
//!
//! ```text
//!        Transport::open(bus, 0x38)
//!                  │
//!                  ▼
//!          Read 1 byte (status)
//!                  │
//!                  ▼
//!          Status::Calibrated ──► No ──► Command::Initialize (0xBE)
//!                  │                           │
//!                  ▼                           ▼
//!                 Yes ◄────────────────── Wait 10 ms
//!                  │
//!                  ▼
//! Command::TriggerMeasurement  (0xAC)
//!                  │
//!                  ▼
//!             Wait 80 ms
//!                  │
//!                  ▼
//!          Read 1 byte (status)  ◄──┐
//!                  │                │
//!                  ▼                │
//!             Status::Busy  ───►  Yes (bounded by Config::max_status_reads)
//!                  │
//!                  ▼
//!                 No
//!                  │
//!                  ▼
//!             Read 7 bytes
//!                  │
//!                  ▼
//!     Calc Humidity, Temp and CRC validity
//! ```
//!
//! A CRC failure does not abort a measurement. The decoded values are handed back together with
//! the validity flag, see [`Reading`].

macro_rules! trace {
    ($($arg:tt)*) => {
        #[cfg(feature = "use-defmt")]
        defmt::trace!($($arg)*);
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        #[cfg(feature = "use-defmt")]
        defmt::debug!($($arg)*);
    };
}

pub mod checksum;
mod config;
mod error;
pub mod frame;
pub mod transport;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c};

pub use crate::checksum::ChecksumPolicy;
pub use crate::config::{Config, DEFAULT_MAX_STATUS_READS};
pub use crate::error::Error;
pub use crate::frame::{celsius_to_fahrenheit, RawFrame, Rounding, SensorReading, FRAME_LEN};
pub use crate::transport::{Attached, Transport};
#[cfg(feature = "linux")]
pub use crate::transport::LinuxBus;

/// AHT20 sensor's I2C address.
pub const SENSOR_ADDRESS: u8 = 0b0011_1000; // This is I2C address 0x38;

/// Wait after sending Initialize, section 5.4.
const INITIALIZE_DELAY_MS: u32 = 10;
/// Wait after sending TriggerMeasurement before the first status read, section 5.4.
const MEASUREMENT_DELAY_MS: u32 = 80;
/// The datasheet in section 5.5 says the reset time does not exceed 20ms.
const SOFT_RESET_DELAY_MS: u32 = 20;

/// Commands that can be sent to the AHT20 sensor.
///
/// A few of these take parameters but the datasheet does not explain them. Consider the command
/// and its parameters to be one fixed command, see [`Command::bytes`]. Section 5.3, page 8,
/// Table 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Command {
    /// 0xBE 0x08 0x00. Load the calibration. Only needed when `Status::Calibrated` is clear.
    Initialize,
    /// 0xAC 0x33 0x00. Start one humidity and temperature conversion.
    TriggerMeasurement,
    /// 0xBA. Also see section 5.5. Takes 20ms or less to complete.
    SoftReset,
}

const INITIALIZE: [u8; 3] = [0b1011_1110, 0b0000_1000, 0b0000_0000];
const TRIGGER_MEASUREMENT: [u8; 3] = [0b1010_1100, 0b0011_0011, 0b0000_0000];
const SOFT_RESET: [u8; 1] = [0b1011_1010];

impl Command {
    /// The bytes written to the bus for this command.
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Command::Initialize => &INITIALIZE,
            Command::TriggerMeasurement => &TRIGGER_MEASUREMENT,
            Command::SoftReset => &SOFT_RESET,
        }
    }
}

/// Status byte meanings.
///
/// Table 10, page 8 of the datasheet.
pub enum Status {
    Busy = 0b1000_0000, // Status bit for busy - 8th bit enabled. 1<<7, 0x80
    // 1 is Busy measuring. 0 is "Free in dormant state" or "ready".
    Calibrated = 0b0000_1000, // Status bit for calibrated - 4th bit enabled. 1<<3, 0x08.
    // 1 is Calibrated, 0 is uncalibrated. If 0, send Command::Initialize.
}

/// SensorStatus is the sensor's status byte.
///
/// It's read on its own during `init` and while waiting for a measurement, and it also leads
/// every measurement frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct SensorStatus(pub u8);

impl SensorStatus {
    pub fn new(status: u8) -> Self {
        SensorStatus(status)
    }

    /// Check if the sensor is done with a conversion.
    pub fn is_ready(self) -> bool {
        // The busy bit should be 0 (not busy) for the sensor to report ready.
        (self.0 & Status::Busy as u8) == 0
    }

    /// Check if the sensor has loaded its calibration.
    pub fn is_calibrated(self) -> bool {
        (self.0 & Status::Calibrated as u8) != 0
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum State {
    /// Created, the bus has not been opened yet.
    Uninitialized,
    /// Open and calibrated.
    Ready,
    /// A measurement is in progress.
    Measuring,
    /// A bus error happened. Nothing more can be done with this session.
    Failed,
}

/// A decoded value together with the result of the frame's CRC check.
///
/// The value is decoded even when the CRC does not match. In that case it must not be trusted,
/// use [`Reading::verified`] to turn a mismatch into an error.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct Reading<T> {
    pub value: T,
    pub checksum_valid: bool,
}

impl<T> Reading<T> {
    pub fn is_valid(&self) -> bool {
        self.checksum_valid
    }

    /// The value, or `Error::ChecksumMismatch` if the frame failed its CRC check.
    pub fn verified<E>(self) -> Result<T, Error<E>> {
        if self.checksum_valid {
            Ok(self.value)
        } else {
            Err(Error::ChecksumMismatch)
        }
    }
}

/// What `Aht20::release` hands back.
pub enum Released<T: Transport> {
    /// The device opened by `init`.
    Opened(T::Device),
    /// `init` was never called, the transport is untouched.
    Unopened(T),
    /// Opening the transport failed, nothing is left to give back.
    Lost,
}

impl<T: Transport> Released<T> {
    /// The opened device, if there is one.
    pub fn device(self) -> Option<T::Device> {
        match self {
            Released::Opened(i2c) => Some(i2c),
            Released::Unopened(_) | Released::Lost => None,
        }
    }

    /// The transport, if it was never opened.
    pub fn transport(self) -> Option<T> {
        match self {
            Released::Unopened(transport) => Some(transport),
            Released::Opened(_) | Released::Lost => None,
        }
    }
}

enum Handle<T: Transport> {
    Closed(T),
    Open(T::Device),
    Gone,
}

type BusError<T> = <<T as Transport>::Device as ErrorType>::Error;

/// An AHT20 sensor reached through the transport `T`.
///
/// Create it with `new`, then call `init` once before taking measurements. Every measurement
/// call triggers a fresh conversion on the sensor and blocks for at least 80ms.
pub struct Aht20<T: Transport> {
    handle: Handle<T>,
    config: Config,
    state: State,
    last_frame: Option<RawFrame>,
}

impl<T: Transport> Aht20<T> {
    /// Create a session. Nothing is sent on the bus until `init`.
    pub fn new(transport: T, config: Config) -> Self {
        Aht20 {
            handle: Handle::Closed(transport),
            config,
            state: State::Uninitialized,
            last_frame: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The frame read by the most recent measurement, whether its CRC matched or not.
    pub fn last_frame(&self) -> Option<RawFrame> {
        self.last_frame
    }

    /// Open the bus and make sure the sensor is calibrated.
    ///
    /// Reads the status byte. If the calibration bit is clear, sends `Command::Initialize` and
    /// waits 10ms. Calling this again on a ready session repeats the calibration check on the
    /// device that is already open.
    ///
    /// ```text
    ///      Read 1 byte (status)
    ///              │
    ///              ▼
    ///     Status::Calibrated ──► No ──► Command::Initialize (0xBE) ──► Wait 10 ms
    ///              │
    ///              ▼
    ///             Yes
    /// ```
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<BusError<T>>> {
        if self.state == State::Failed {
            return Err(Error::Failed);
        }

        let result = self.open().and_then(|_| self.calibrate(delay));
        self.settle(result)?;

        debug!("aht20 ready on bus {=u8}", self.config.bus);
        Ok(())
    }

    /// Measure temperature in degrees Celsius.
    pub fn get_temperature(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<Reading<f32>, Error<BusError<T>>> {
        let frame = self.measure(delay)?;
        Ok(self.checked(&frame, frame.temperature()))
    }

    /// Measure relative humidity in percent.
    pub fn get_humidity(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<Reading<f32>, Error<BusError<T>>> {
        let frame = self.measure(delay)?;
        Ok(self.checked(&frame, frame.humidity()))
    }

    /// Measure temperature and humidity from the same conversion.
    pub fn get_all(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<Reading<SensorReading>, Error<BusError<T>>> {
        let frame = self.measure(delay)?;
        Ok(self.checked(&frame, frame.reading()))
    }

    /// Send the Soft Reset command to the sensor and wait the 20ms it takes.
    pub fn soft_reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<BusError<T>>> {
        self.ensure_ready()?;

        let address = self.config.address;
        let result = self.device().and_then(|i2c| {
            i2c.write(address, Command::SoftReset.bytes())
                .map_err(Error::I2c)
        });
        self.settle(result)?;

        // Wait the full 20ms so a measurement can be triggered straight after this returns.
        delay.delay_ms(SOFT_RESET_DELAY_MS);
        trace!("aht20 soft reset");
        Ok(())
    }

    /// Ends the session and gives back the opened I2C device, or the transport if `init` never
    /// opened it.
    pub fn release(self) -> Released<T> {
        match self.handle {
            Handle::Open(i2c) => Released::Opened(i2c),
            Handle::Closed(transport) => Released::Unopened(transport),
            Handle::Gone => Released::Lost,
        }
    }

    fn open(&mut self) -> Result<(), Error<BusError<T>>> {
        self.handle = match core::mem::replace(&mut self.handle, Handle::Gone) {
            Handle::Closed(transport) => {
                trace!("opening bus {=u8}", self.config.bus);
                let i2c = transport
                    .open(self.config.bus, self.config.address, self.config.flags)
                    .map_err(Error::I2c)?;
                Handle::Open(i2c)
            }
            handle => handle,
        };
        Ok(())
    }

    fn calibrate(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<BusError<T>>> {
        let address = self.config.address;
        let i2c = self.device()?;

        let status = read_status(i2c, address)?;
        if !status.is_calibrated() {
            trace!("not calibrated, sending initialize");
            i2c.write(address, Command::Initialize.bytes())
                .map_err(Error::I2c)?;
            delay.delay_ms(INITIALIZE_DELAY_MS);
        }

        Ok(())
    }

    /// Drive one trigger, wait, poll, read cycle and keep the frame it produced.
    fn measure(&mut self, delay: &mut impl DelayNs) -> Result<RawFrame, Error<BusError<T>>> {
        self.ensure_ready()?;

        self.state = State::Measuring;
        let result = self.measure_once(delay);
        let frame = self.settle(result)?;

        self.last_frame = Some(frame);
        Ok(frame)
    }

    /// Perform one measurement and return the sensor's full 7-byte frame.
    ///
    /// ```text
    /// Command::TriggerMeasurement (0xAC)
    ///                  │
    ///                  ▼
    ///             Wait 80 ms
    ///                  │
    ///                  ▼
    ///         Read 1 byte (status) ◄──┐
    ///                  │              │
    ///                  ▼              │
    ///             Status::Busy  ───► Yes
    ///                  │
    ///                  ▼
    ///                 No
    ///                  │
    ///                  ▼
    ///             Read 7 bytes
    /// ```
    fn measure_once(&mut self, delay: &mut impl DelayNs) -> Result<RawFrame, Error<BusError<T>>> {
        let address = self.config.address;
        let max_status_reads = self.config.max_status_reads;
        let i2c = self.device()?;

        i2c.write(address, Command::TriggerMeasurement.bytes())
            .map_err(Error::I2c)?;
        delay.delay_ms(MEASUREMENT_DELAY_MS);

        // Spin on the status byte, there is no wait between reads.
        let mut status_reads: u32 = 0;
        loop {
            let status = read_status(i2c, address)?;
            status_reads = status_reads.saturating_add(1);
            if status.is_ready() {
                break;
            }
            if let Some(limit) = max_status_reads {
                if status_reads >= limit {
                    debug!("still busy after {=u32} status reads", status_reads);
                    return Err(Error::Timeout);
                }
            }
        }
        trace!("ready after {=u32} status reads", status_reads);

        // 1 byte status, 20 bits humidity + 20 bits temperature, 1 byte CRC
        let mut read_buffer = [0u8; FRAME_LEN];
        i2c.read(address, &mut read_buffer).map_err(Error::I2c)?;

        Ok(RawFrame::new(read_buffer))
    }

    fn checked<V>(&self, frame: &RawFrame, value: V) -> Reading<V> {
        let checksum_valid = frame.is_valid(self.config.checksum);
        if !checksum_valid {
            debug!("CRC mismatch in frame {}", frame);
        }
        Reading {
            value,
            checksum_valid,
        }
    }

    fn ensure_ready(&self) -> Result<(), Error<BusError<T>>> {
        match self.state {
            State::Ready => Ok(()),
            // Only seen from inside a measurement call, never on entry.
            State::Measuring | State::Uninitialized => Err(Error::NotInitialized),
            State::Failed => Err(Error::Failed),
        }
    }

    fn device(&mut self) -> Result<&mut T::Device, Error<BusError<T>>> {
        match &mut self.handle {
            Handle::Open(i2c) => Ok(i2c),
            Handle::Closed(_) | Handle::Gone => Err(Error::NotInitialized),
        }
    }

    /// Move to `Failed` when the bus let us down, otherwise back to `Ready`.
    ///
    /// A timeout leaves the bus usable, so a soft reset can still be sent.
    fn settle<R>(&mut self, result: Result<R, Error<BusError<T>>>) -> Result<R, Error<BusError<T>>> {
        match &result {
            Ok(_) | Err(Error::Timeout) => self.state = State::Ready,
            Err(Error::I2c(_)) => self.state = State::Failed,
            Err(_) => {}
        }
        result
    }
}

/// Read the status byte. A bare 1-byte read, see the crate docs.
fn read_status<I: I2c>(i2c: &mut I, address: u8) -> Result<SensorStatus, Error<I::Error>> {
    let mut read_buffer = [0u8; 1];
    i2c.read(address, &mut read_buffer).map_err(Error::I2c)?;

    let status = SensorStatus::new(read_buffer[0]);
    trace!("status {=u8:#x}", status.0);
    Ok(status)
}
