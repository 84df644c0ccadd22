//! The 7-byte measurement frame and how to turn it into physical values.
//!
//! ```text
//!  XXXXXXXX XXXXXXXX XXXXXXXX XXXXXXXX XXXXXXXX XXXXXXXX XXXXXXXX
//!  -------- -------- -------- -------- -------- -------- --------
//!   Status  Humidity Humidity Humidity  Temp     Temp     CRC
//!                               & Temp
//! ```

use crate::checksum::{self, ChecksumPolicy};
use crate::SensorStatus;

/// Number of bytes read back from the sensor for a full measurement.
pub const FRAME_LEN: usize = 7;

/// Full scale of the 20-bit humidity and temperature values.
const FULL_SCALE: f32 = (1u32 << 20) as f32;

/// One raw measurement frame: status byte, 5 data bytes, CRC byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct RawFrame(pub [u8; FRAME_LEN]);

impl RawFrame {
    pub fn new(bytes: [u8; FRAME_LEN]) -> Self {
        RawFrame(bytes)
    }

    /// The status byte that leads the frame. It's the same byte a status read returns.
    pub fn status(&self) -> SensorStatus {
        SensorStatus::new(self.0[0])
    }

    /// The CRC byte the sensor sent.
    pub fn crc(&self) -> u8 {
        self.0[6]
    }

    /// Whether the CRC byte matches the rest of the frame under `policy`.
    pub fn is_valid(&self, policy: ChecksumPolicy) -> bool {
        checksum::validate_frame(&self.0, policy)
    }

    /// The 20 humidity bits: byte 1, byte 2 and the high nibble of byte 3.
    pub fn raw_humidity(&self) -> u32 {
        let b = &self.0;
        // In the final 32-bit value byte 1 lands here: 0x0000_0000_0000_1111_1111_0000_0000_0000
        (b[1] as u32) << 12
            // and byte 2 here:                      0x0000_0000_0000_0000_0000_1111_1111_0000
            | (b[2] as u32) << 4
            // with the split byte's top four bits at the very end.
            | ((b[3] & 0xF0) >> 4) as u32
    }

    /// The 20 temperature bits: the low nibble of byte 3, byte 4 and byte 5.
    pub fn raw_temperature(&self) -> u32 {
        let b = &self.0;
        ((b[3] & 0x0F) as u32) << 16 | (b[4] as u32) << 8 | b[5] as u32
    }

    /// Relative humidity in percent. Section 6.1 of the datasheet.
    pub fn humidity(&self) -> f32 {
        humidity_from_raw(self.raw_humidity())
    }

    /// Temperature in degrees Celsius. Section 6.2 of the datasheet.
    pub fn temperature(&self) -> f32 {
        temperature_from_raw(self.raw_temperature())
    }

    /// Both values at once.
    pub fn reading(&self) -> SensorReading {
        SensorReading {
            humidity: self.humidity(),
            temperature: self.temperature(),
        }
    }
}

impl From<[u8; FRAME_LEN]> for RawFrame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        RawFrame(bytes)
    }
}

/// Convert a 20-bit humidity value into % relative humidity.
pub fn humidity_from_raw(raw: u32) -> f32 {
    (raw as f32) * 100.0 / FULL_SCALE
}

/// Convert a 20-bit temperature value into degrees Celsius.
pub fn temperature_from_raw(raw: u32) -> f32 {
    (raw as f32) / FULL_SCALE * 200.0 - 50.0
}

/// SensorReading is a single reading from the AHT20 sensor.
///
/// This is returned from `get_all`. You get:
/// * humidity in % Relative Humidity
/// * temperature in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct SensorReading {
    pub humidity: f32,
    pub temperature: f32,
}

impl SensorReading {
    pub fn fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.temperature)
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// How to turn a fractional value into whole units for display.
///
/// Decoding always keeps the fraction, rounding is a presentation choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Rounding {
    /// Drop the fraction, rounding towards zero.
    #[default]
    Truncate,
    /// Round to the nearest whole number, halfway cases away from zero.
    Nearest,
}

impl Rounding {
    pub fn apply(self, value: f32) -> i32 {
        match self {
            Rounding::Truncate => value as i32,
            Rounding::Nearest => libm::roundf(value) as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{celsius_to_fahrenheit, RawFrame, Rounding};
    use crate::checksum::ChecksumPolicy;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    /// Frame taken from a run of the sensor, ~22.5C and ~40%.
    #[test]
    fn decode_captured_frame() {
        let frame = RawFrame::new([
            0b0001_1100, //  28, 0x1c - ready, calibrated, and some mystery flags.
            0b0110_0101, // 101, 0x65 - first byte of humidity value
            0b1011_0100, // 180, 0xb4 - second byte of humidity vaue
            0b0010_0101, //  37, 0x25 - split byte. 4 bits humidity, 4 bits temperature.
            0b1100_1101, // 205, 0xcd - first full byte of temperature.
            0b0010_0110, //  38, 0x26 - second full byte of temperature.
            0b1100_0110, // 198, 0xc6 - CRC
        ]);

        assert_eq!(frame.raw_humidity(), 0x65B42);
        assert_eq!(frame.raw_temperature(), 0x5CD26);
        assert!(close(frame.humidity(), 39.73));
        assert!(close(frame.temperature(), 22.52));
        assert!(frame.is_valid(ChecksumPolicy::Strict));
        assert!(frame.status().is_ready());
        assert!(frame.status().is_calibrated());
    }

    /// Half scale humidity, and a temperature value that lives entirely in byte 5, so the split
    /// byte is empty on both sides.
    #[test]
    fn decode_nibble_boundary() {
        let frame = RawFrame::new([0x08, 0x80, 0x00, 0x00, 0x00, 0x80, 0x79]);

        assert_eq!(frame.raw_humidity(), 0x80000);
        assert_eq!(frame.raw_temperature(), 0x00080);
        assert_eq!(frame.humidity(), 50.0);
        assert!(close(frame.temperature(), -49.98));
        assert!(frame.is_valid(ChecksumPolicy::Strict));
    }

    /// The split byte goes high nibble to humidity, low nibble to temperature.
    #[test]
    fn decode_split_byte() {
        let humidity_only = RawFrame::new([0x00, 0x00, 0x00, 0xF0, 0x00, 0x00, 0x00]);
        assert_eq!(humidity_only.raw_humidity(), 0x0000F);
        assert_eq!(humidity_only.raw_temperature(), 0);

        let temperature_only = RawFrame::new([0x00, 0x00, 0x00, 0x0F, 0x00, 0x00, 0x00]);
        assert_eq!(temperature_only.raw_humidity(), 0);
        assert_eq!(temperature_only.raw_temperature(), 0xF0000);
    }

    #[test]
    fn decode_extremes() {
        let zero = RawFrame::new([0x00; 7]);
        assert_eq!(zero.humidity(), 0.0);
        assert_eq!(zero.temperature(), -50.0);

        let full = RawFrame::new([0xFF; 7]);
        assert_eq!(full.raw_humidity(), 0xFFFFF);
        assert_eq!(full.raw_temperature(), 0xFFFFF);
        assert!(full.humidity() < 100.0 && full.humidity() > 99.99);
        assert!(full.temperature() < 150.0 && full.temperature() > 149.99);
    }

    #[test]
    fn fahrenheit() {
        assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
    }

    #[test]
    fn rounding() {
        assert_eq!(Rounding::Truncate.apply(22.9), 22);
        assert_eq!(Rounding::Truncate.apply(-49.98), -49);
        assert_eq!(Rounding::Nearest.apply(22.5), 23);
        assert_eq!(Rounding::Nearest.apply(-49.98), -50);
    }
}
