//! Single-wire probe bus seam and scratchpad handling.
//!
//! The probe exposes a 9-byte scratchpad: temperature LSB/MSB, alarm
//! registers, configuration register, three reserved bytes and a CRC-8 over
//! the first eight bytes. Temperatures are two's complement sixteenths of a
//! degree; the lowest bits are undefined at reduced resolution.

use serde::{Deserialize, Serialize};
use tk_core::{Millis, Real};

/// 64-bit device address: family code, 48-bit serial, CRC.
pub type RomCode = [u8; 8];

pub const SCRATCHPAD_LEN: usize = 9;

/// Raw scratchpad as read from the bus, checksum byte last.
pub type Scratchpad = [u8; SCRATCHPAD_LEN];

/// Value reported for a probe that did not answer.
pub const DISCONNECTED_C: Real = -127.0;

/// Lower physical bound of the probe (exclusive).
pub const MIN_VALID_C: Real = -55.0;

/// Upper physical bound of the probe (exclusive).
pub const MAX_VALID_C: Real = 125.0;

/// Conversion resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    #[default]
    Bits12,
}

impl Resolution {
    /// Resolution for a bit count, clamped to 9..=12.
    pub fn from_bits(bits: u8) -> Self {
        match bits {
            0..=9 => Self::Bits9,
            10 => Self::Bits10,
            11 => Self::Bits11,
            _ => Self::Bits12,
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::Bits9 => 9,
            Self::Bits10 => 10,
            Self::Bits11 => 11,
            Self::Bits12 => 12,
        }
    }

    /// Configuration register value written to the probe.
    pub fn config_register(self) -> u8 {
        match self {
            Self::Bits9 => 0x1F,
            Self::Bits10 => 0x3F,
            Self::Bits11 => 0x5F,
            Self::Bits12 => 0x7F,
        }
    }

    /// Nominal worst-case conversion time.
    pub fn conversion_ms(self) -> Millis {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }

    fn defined_bits_mask(self) -> i16 {
        match self {
            Self::Bits9 => !0b111,
            Self::Bits10 => !0b11,
            Self::Bits11 => !0b1,
            Self::Bits12 => !0,
        }
    }
}

/// Access to one probe on a single-wire bus.
///
/// Implementations must not block: `begin_conversion` only issues the
/// command and `conversion_complete` only samples the bus.
pub trait ProbeBus {
    /// Address of the first device on the bus, if any answers.
    fn search(&mut self) -> Option<RomCode>;

    /// Write the resolution to the device's configuration register.
    fn set_resolution(&mut self, address: &RomCode, resolution: Resolution);

    /// Issue "convert T" to the device.
    fn begin_conversion(&mut self, address: &RomCode);

    /// Whether the last conversion has finished.
    fn conversion_complete(&mut self) -> bool;

    /// Read the full scratchpad including its checksum byte.
    fn read_scratchpad(&mut self, address: &RomCode) -> Scratchpad;
}

impl<B: ProbeBus + ?Sized> ProbeBus for &mut B {
    fn search(&mut self) -> Option<RomCode> {
        (**self).search()
    }

    fn set_resolution(&mut self, address: &RomCode, resolution: Resolution) {
        (**self).set_resolution(address, resolution)
    }

    fn begin_conversion(&mut self, address: &RomCode) {
        (**self).begin_conversion(address)
    }

    fn conversion_complete(&mut self) -> bool {
        (**self).conversion_complete()
    }

    fn read_scratchpad(&mut self, address: &RomCode) -> Scratchpad {
        (**self).read_scratchpad(address)
    }
}

/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Whether the checksum byte matches the CRC of the data bytes.
pub fn checksum_ok(pad: &Scratchpad) -> bool {
    crc8(&pad[..SCRATCHPAD_LEN - 1]) == pad[SCRATCHPAD_LEN - 1]
}

/// Decode the temperature registers to °C.
///
/// An all-zero scratchpad (which passes the checksum) is what a bus with no
/// pulled-up device returns, and decodes to [`DISCONNECTED_C`].
pub fn decode_temp_c(pad: &Scratchpad, resolution: Resolution) -> Real {
    if pad.iter().all(|&b| b == 0) {
        return DISCONNECTED_C;
    }
    let raw = i16::from_le_bytes([pad[0], pad[1]]) & resolution.defined_bits_mask();
    Real::from(raw) / 16.0
}

/// Whether a decoded value is a physically plausible reading.
pub fn in_valid_range(value_c: Real) -> bool {
    value_c != DISCONNECTED_C && value_c > MIN_VALID_C && value_c < MAX_VALID_C
}

/// Build the scratchpad a healthy probe would return for `value_c`.
pub fn encode_scratchpad(value_c: Real, resolution: Resolution) -> Scratchpad {
    let raw = ((value_c * 16.0).round() as i16) & resolution.defined_bits_mask();
    let [lsb, msb] = raw.to_le_bytes();
    let config = resolution.config_register();
    let mut pad = [lsb, msb, 0x4B, 0x46, config, 0xFF, 0x0C, 0x10, 0];
    pad[SCRATCHPAD_LEN - 1] = crc8(&pad[..SCRATCHPAD_LEN - 1]);
    pad
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc8_known_rom() {
        // Maxim application note 27 example ROM.
        let rom = [0x02, 0x1C, 0xB8, 0x01, 0x00, 0x00, 0x00];
        assert_eq!(crc8(&rom), 0xA2);
    }

    #[test]
    fn crc_over_data_and_checksum_is_zero() {
        let pad = encode_scratchpad(21.5, Resolution::Bits12);
        assert!(checksum_ok(&pad));
        assert_eq!(crc8(&pad), 0);
    }

    #[test]
    fn decode_positive_and_negative() {
        let pad = encode_scratchpad(25.0625, Resolution::Bits12);
        assert_eq!(decode_temp_c(&pad, Resolution::Bits12), 25.0625);

        let pad = encode_scratchpad(-10.125, Resolution::Bits12);
        assert_eq!(decode_temp_c(&pad, Resolution::Bits12), -10.125);
    }

    #[test]
    fn decode_masks_undefined_bits() {
        // 0x0191 = 25.0625 at 12 bits; at 9 bits the low three bits are noise.
        let mut pad = [0u8; SCRATCHPAD_LEN];
        pad[0] = 0x91;
        pad[1] = 0x01;
        pad[4] = Resolution::Bits9.config_register();
        assert_eq!(decode_temp_c(&pad, Resolution::Bits12), 25.0625);
        assert_eq!(decode_temp_c(&pad, Resolution::Bits9), 25.0);
    }

    #[test]
    fn all_zero_scratchpad_is_disconnected() {
        let pad = [0u8; SCRATCHPAD_LEN];
        assert!(checksum_ok(&pad));
        assert_eq!(decode_temp_c(&pad, Resolution::Bits12), DISCONNECTED_C);
        assert!(!in_valid_range(DISCONNECTED_C));
    }

    #[test]
    fn valid_range_is_exclusive() {
        assert!(in_valid_range(0.0));
        assert!(in_valid_range(124.9375));
        assert!(!in_valid_range(125.0));
        assert!(!in_valid_range(-55.0));
    }

    #[test]
    fn resolution_from_bits_clamps() {
        assert_eq!(Resolution::from_bits(3), Resolution::Bits9);
        assert_eq!(Resolution::from_bits(11), Resolution::Bits11);
        assert_eq!(Resolution::from_bits(40), Resolution::Bits12);
        assert_eq!(Resolution::from_bits(10).bits(), 10);
        assert_eq!(Resolution::default(), Resolution::Bits12);
    }
}
