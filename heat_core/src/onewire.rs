//! Single-wire bus addressing and device discovery.
//!
//! Devices on the bus carry no fixed addressing; a 64-bit ROM is resolved
//! bit by bit through a binary-tree collision search. One `advance` call is
//! a complete, bounded unit of work: one reset plus a full 64-bit walk.
//! The session state is two scalars, so a multi-session enumeration can be
//! suspended and resumed at will.

use std::fmt;
use std::str::FromStr;

use heat_traits::WireBus;

use crate::error::{AddressParseError, BusError};

/// DS18B20 family code.
pub const FAMILY_DS18B20: u8 = 0x28;
/// DS18S20 family code (half-degree resolution).
pub const FAMILY_DS18S20: u8 = 0x10;

/// ROM and function command bytes.
pub mod commands {
    pub const SEARCH_ROM: u8 = 0xF0;
    pub const READ_ROM: u8 = 0x33;
    pub const MATCH_ROM: u8 = 0x55;
    pub const SKIP_ROM: u8 = 0xCC;
    pub const CONVERT_T: u8 = 0x44;
    pub const READ_SCRATCHPAD: u8 = 0xBE;
}

/// Dallas CRC8 (reflected polynomial 0x8C), one byte at a time.
#[inline]
pub fn crc8_update(mut crc: u8, mut data: u8) -> u8 {
    for _ in 0..8 {
        let mix = (crc ^ data) & 0x01 != 0;
        crc >>= 1;
        if mix {
            crc ^= 0x8C;
        }
        data >>= 1;
    }
    crc
}

/// Dallas CRC8 over a whole slice.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0, |crc, &b| crc8_update(crc, b))
}

/// 64-bit device ROM: family byte, six serial bytes, CRC8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceAddress([u8; 8]);

impl DeviceAddress {
    pub const LEN: usize = 8;

    pub const fn new(bytes: [u8; 8]) -> Self {
        DeviceAddress(bytes)
    }

    /// Build an address from the seven payload bytes, filling in the CRC.
    pub fn with_valid_crc(payload: [u8; 7]) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..7].copy_from_slice(&payload);
        bytes[7] = crc8(&payload);
        DeviceAddress(bytes)
    }

    pub const fn bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub const fn family(&self) -> u8 {
        self.0[0]
    }

    pub const fn crc(&self) -> u8 {
        self.0[7]
    }

    pub fn is_crc_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.0[7]
    }

    /// ROM bit at `index` (0 = LSB of the family byte).
    pub(crate) fn bit(&self, index: usize) -> bool {
        self.0[index / 8] & (1 << (index % 8)) != 0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressParseError;

    /// Parse `"28:D9:F8:D5:03:00:00:B0"`-style text, validating the CRC.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != Self::LEN {
            return Err(AddressParseError::BadLength(parts.len()));
        }
        let mut bytes = [0u8; 8];
        for (pos, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(AddressParseError::BadByte { pos });
            }
            bytes[pos] =
                u8::from_str_radix(part, 16).map_err(|_| AddressParseError::BadByte { pos })?;
        }
        let addr = DeviceAddress(bytes);
        if !addr.is_crc_valid() {
            return Err(AddressParseError::CrcMismatch {
                expected: crc8(&bytes[..7]),
                found: bytes[7],
            });
        }
        Ok(addr)
    }
}

/// Resumable discovery session over the bus.
///
/// `visited` is a bitmask over collision points: a set bit means "this
/// point was resolved toward 1 in an earlier session". After each session
/// the deepest zero-taken point flips to 1 and everything deeper is
/// cleared, so successive sessions enumerate the population exactly once
/// and `visited` reaches 0 within device-count calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchState {
    visited: u64,
    failed: bool,
    exhausted: bool,
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the enumeration has covered the bus, or after any error.
    pub fn is_done(&self) -> bool {
        self.failed || self.exhausted
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Remaining collision-point mask (diagnostics).
    pub fn visited(&self) -> u64 {
        self.visited
    }

    /// Run one discovery session: one reset, then a full 64-bit walk.
    ///
    /// Per bit position the devices answer two complementary samples:
    /// both set is a protocol violation, both clear is a genuine collision
    /// resolved through `visited`, and a single set line is a forced bit.
    /// The chosen bit is written back, silencing devices that disagree.
    pub fn advance<B: WireBus + ?Sized>(
        &mut self,
        bus: &mut B,
    ) -> Result<DeviceAddress, BusError> {
        if !bus.reset().map_err(line_fault)? {
            self.failed = true;
            return Err(BusError::ResetFailed);
        }
        bus.write_byte(commands::SEARCH_ROM).map_err(line_fault)?;

        let mut rom = [0u8; 8];
        let mut crc = 0u8;
        let mut cur_mask: u64 = 1;
        let mut next: u64 = 0;
        let mut last_written = false;

        for byte_pos in 0..8usize {
            let mut bit_mask = 1u8;
            loop {
                let sample = bus.read_bit().map_err(line_fault)?;
                let complement = bus.read_bit().map_err(line_fault)?;
                let bit = match (sample, complement) {
                    (true, true) => {
                        self.failed = true;
                        return Err(BusError::Conflict {
                            byte_pos: byte_pos as u8,
                            bit_mask,
                            polarity: last_written,
                        });
                    }
                    (false, false) => {
                        let take_one = self.visited & cur_mask != 0;
                        if !take_one {
                            next = (self.visited & (cur_mask - 1)) | cur_mask;
                        }
                        cur_mask <<= 1;
                        take_one
                    }
                    (forced, _) => forced,
                };
                if bit {
                    rom[byte_pos] |= bit_mask;
                }
                bus.write_bit(bit).map_err(line_fault)?;
                last_written = bit;
                bit_mask <<= 1;
                if bit_mask == 0 {
                    break;
                }
            }
            if byte_pos != 7 {
                crc = crc8_update(crc, rom[byte_pos]);
            }
        }

        if rom[7] != crc {
            self.failed = true;
            return Err(BusError::CrcMismatch {
                expected: crc,
                found: rom[7],
            });
        }

        self.visited = next;
        if self.visited == 0 {
            self.exhausted = true;
        }
        Ok(DeviceAddress(rom))
    }
}

fn line_fault(e: Box<dyn std::error::Error + Send + Sync>) -> BusError {
    BusError::Line(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc8_matches_a_factory_rom() {
        // ROM transcribed from a real DS18B20.
        let payload = [0x28, 0xD9, 0xF8, 0xD5, 0x03, 0x00, 0x00];
        assert_eq!(crc8(&payload), 0xB0);
    }

    #[test]
    fn with_valid_crc_round_trips() {
        let addr = DeviceAddress::with_valid_crc([0x28, 0x0A, 0xFB, 0xD5, 0x03, 0x00, 0x00]);
        assert!(addr.is_crc_valid());
        assert_eq!(addr.crc(), 0x63);
    }

    #[test]
    fn display_and_parse_round_trip() {
        let addr = DeviceAddress::with_valid_crc([0x28, 0xC3, 0xE0, 0xD5, 0x03, 0x00, 0x00]);
        let text = addr.to_string();
        assert_eq!(text, "28:C3:E0:D5:03:00:00:66");
        assert_eq!(text.parse::<DeviceAddress>().unwrap(), addr);
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert!(matches!(
            "28:D9".parse::<DeviceAddress>(),
            Err(AddressParseError::BadLength(2))
        ));
        assert!(matches!(
            "28:D9:F8:D5:03:00:zz:B0".parse::<DeviceAddress>(),
            Err(AddressParseError::BadByte { pos: 6 })
        ));
        assert!(matches!(
            "28:D9:F8:D5:03:00:00:B1".parse::<DeviceAddress>(),
            Err(AddressParseError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn bit_indexing_is_lsb_first_per_byte() {
        let addr = DeviceAddress::new([0x01, 0x80, 0, 0, 0, 0, 0, 0]);
        assert!(addr.bit(0));
        assert!(!addr.bit(1));
        assert!(addr.bit(15));
    }
}
