//! CRC8 over the AHT20 measurement frame.

use crc_any::CRCu8;

/// Value the sensor puts in the CRC position when it does not compute one.
pub const UNSUPPORTED_CRC: u8 = 0xFF;

/// How the trailing CRC byte of a frame is judged.
///
/// Sensors in the field differ: most send a real CRC, but some report `0xFF` in the CRC position
/// to say "no checksum". `Strict` treats that as an ordinary mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum ChecksumPolicy {
    /// The CRC byte must equal the CRC computed over the first six bytes.
    #[default]
    Strict,
    /// As `Strict`, but a CRC byte of `0xFF` is accepted unconditionally.
    AcceptUnsupported,
}

/// compute_crc uses the CRCu8 algorithm from crc-any.
///
/// Datasheet section 5.4.4:
///
/// > CRC initial vaue is 0xFF, crc8 check polynomial CRC[7:0]=1+x**4 + x**5 + x**8
///
/// Dropping the implicit x**8 leaves bits 0, 4 and 5 set, which is `0x31`. Input is processed
/// most significant bit first and there is no final XOR.
pub fn compute_crc(bytes: &[u8]) -> u8 {
    // Poly (0x31), bits (8), initial (0xff), final_xor (0x00), reflect (false).
    let mut crc = CRCu8::create_crc(0x31, 8, 0xff, 0x00, false);
    crc.digest(bytes);
    crc.get_crc()
}

/// Check a full 7-byte frame: the CRC of bytes 0..6 against byte 6.
///
/// Anything that is not exactly seven bytes long fails validation.
pub fn validate_frame(frame: &[u8], policy: ChecksumPolicy) -> bool {
    if frame.len() != crate::frame::FRAME_LEN {
        return false;
    }

    let received = frame[6];
    if policy == ChecksumPolicy::AcceptUnsupported && received == UNSUPPORTED_CRC {
        return true;
    }

    compute_crc(&frame[..6]) == received
}

#[cfg(test)]
mod tests {
    use super::{compute_crc, validate_frame, ChecksumPolicy};

    /// Test a valid CRC invocation.
    #[test]
    fn crc_correct() {
        // Example from the Interface Specification document.
        assert_eq!(compute_crc(&[0xBE, 0xEF]), 0x92);
    }

    /// Test a CRC call that does not match.
    #[test]
    fn crc_wrong() {
        assert_ne!(compute_crc(&[0xFF, 0xFF]), 0x92);
    }

    #[test]
    fn crc_of_nothing_is_the_seed() {
        assert_eq!(compute_crc(&[]), 0xFF);
    }

    /// Status byte followed by five zero data bytes.
    #[test]
    fn crc_status_only() {
        assert_eq!(compute_crc(&[0x1C, 0x00, 0x00, 0x00, 0x00, 0x00]), 0x58);
    }

    /// Frame captured from a sensor at roughly 22.5C and 40%.
    #[test]
    fn crc_captured_frame() {
        assert_eq!(compute_crc(&[0x1C, 0x65, 0xB4, 0x25, 0xCD, 0x26]), 0xC6);
        assert_eq!(compute_crc(&[0x08, 0x80, 0x00, 0x00, 0x00, 0x80]), 0x79);
    }

    #[test]
    fn crc_is_repeatable() {
        let data = [0x9C, 0x65, 0xB4, 0x25, 0xCD, 0x26];
        assert_eq!(compute_crc(&data), compute_crc(&data));
        assert_eq!(compute_crc(&data), 0x2A);
    }

    #[test]
    fn validate_good_frame() {
        let frame = [0x1C, 0x65, 0xB4, 0x25, 0xCD, 0x26, 0xC6];
        assert!(validate_frame(&frame, ChecksumPolicy::Strict));
        assert!(validate_frame(&frame, ChecksumPolicy::AcceptUnsupported));
    }

    #[test]
    fn validate_corrupted_frame() {
        // Last data bit flipped, CRC left as it was.
        let frame = [0x1C, 0x65, 0xB4, 0x25, 0xCD, 0x27, 0xC6];
        assert!(!validate_frame(&frame, ChecksumPolicy::Strict));
        assert!(!validate_frame(&frame, ChecksumPolicy::AcceptUnsupported));
    }

    #[test]
    fn validate_wrong_length() {
        assert!(!validate_frame(&[], ChecksumPolicy::Strict));
        assert!(!validate_frame(&[0x1C, 0x65, 0xB4, 0x25, 0xCD, 0x26], ChecksumPolicy::Strict));
        assert!(!validate_frame(
            &[0x1C, 0x65, 0xB4, 0x25, 0xCD, 0x26, 0xC6, 0x00],
            ChecksumPolicy::AcceptUnsupported
        ));
    }

    /// 0xFF in the CRC position only passes when the policy allows it.
    #[test]
    fn validate_unsupported_marker() {
        let frame = [0x1C, 0x65, 0xB4, 0x25, 0xCD, 0x26, 0xFF];
        assert!(!validate_frame(&frame, ChecksumPolicy::Strict));
        assert!(validate_frame(&frame, ChecksumPolicy::AcceptUnsupported));
    }
}
