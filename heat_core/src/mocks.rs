//! Test and simulation doubles: a device-level bus emulation, a virtual
//! clock, and trivial probe/port stand-ins. No real hardware required.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use heat_traits::{Clock, RelayPort, ThermocoupleProbe, WireBus};

use crate::onewire::{commands, crc8, DeviceAddress};
use crate::temperature::Temperature;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One emulated DS18x20 on the simulated bus.
#[derive(Debug, Clone)]
pub struct SimDevice {
    rom: DeviceAddress,
    temp: i16,
}

impl SimDevice {
    pub fn new(rom: DeviceAddress, temp: Temperature) -> Self {
        Self {
            rom,
            temp: temp.sixteenths(),
        }
    }

    pub fn rom(&self) -> DeviceAddress {
        self.rom
    }

    pub fn set_temperature(&mut self, temp: Temperature) {
        self.temp = temp.sixteenths();
    }

    fn scratchpad(&self) -> [u8; 9] {
        let mut pad = [0u8; 9];
        if self.rom.family() == crate::onewire::FAMILY_DS18S20 {
            let raw = self.temp / 8;
            pad[0] = (raw & 0xFF) as u8;
            pad[1] = ((raw >> 8) & 0xFF) as u8;
        } else {
            pad[0] = (self.temp & 0xFF) as u8;
            pad[1] = ((self.temp >> 8) & 0xFF) as u8;
        }
        // Alarm registers, config, reserved bytes as a real part powers up.
        pad[2] = 0x4B;
        pad[3] = 0x46;
        pad[4] = 0x7F;
        pad[5] = 0xFF;
        pad[6] = 0x0C;
        pad[7] = 0x10;
        pad[8] = crc8(&pad[..8]);
        pad
    }
}

#[derive(Debug)]
enum Phase {
    Idle,
    RomCommand,
    Search {
        bit: usize,
        active: Vec<usize>,
        sent_sample: bool,
        sent_complement: bool,
    },
    MatchRom {
        collected: Vec<u8>,
    },
    FunctionCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    None,
    All,
    One(usize),
}

/// Wired-AND emulation of a population of single-wire devices.
///
/// Supports the command subset the core uses (search, match, skip,
/// convert, read scratchpad) plus fault injection for the discovery and
/// read paths.
pub struct SimBus {
    devices: Vec<SimDevice>,
    phase: Phase,
    selection: Selection,
    read_queue: VecDeque<u8>,
    converted: bool,
    fail_reset: bool,
    conflict_at_bit: Option<usize>,
    corrupt_next_scratchpad: bool,
}

impl SimBus {
    pub fn new(devices: Vec<SimDevice>) -> Self {
        Self {
            devices,
            phase: Phase::Idle,
            selection: Selection::None,
            read_queue: VecDeque::new(),
            converted: false,
            fail_reset: false,
            conflict_at_bit: None,
            corrupt_next_scratchpad: false,
        }
    }

    pub fn devices_mut(&mut self) -> &mut [SimDevice] {
        &mut self.devices
    }

    /// Make every subsequent reset fail (no presence pulse).
    pub fn fail_resets(&mut self, fail: bool) {
        self.fail_reset = fail;
    }

    /// Force both complementary samples high at the given absolute ROM bit
    /// index (0..64) of the next search sessions.
    pub fn inject_conflict_at(&mut self, bit: usize) {
        self.conflict_at_bit = Some(bit);
    }

    /// Corrupt one byte of the next scratchpad transfer.
    pub fn corrupt_next_scratchpad(&mut self) {
        self.corrupt_next_scratchpad = true;
    }

    fn sample_lines(&self, active: &[usize], bit: usize) -> (bool, bool) {
        if let Some(inject) = self.conflict_at_bit
            && inject == bit
        {
            return (true, true);
        }
        // Open-drain wired-AND: any participant with a 0 pulls the sample
        // low; the complement slot inverts each participant's bit.
        let sample = active.iter().all(|&i| self.devices[i].rom.bytes()[bit / 8] & (1 << (bit % 8)) != 0);
        let complement = active
            .iter()
            .all(|&i| self.devices[i].rom.bytes()[bit / 8] & (1 << (bit % 8)) == 0);
        (sample, complement)
    }
}

impl WireBus for SimBus {
    fn reset(&mut self) -> Result<bool, BoxError> {
        self.read_queue.clear();
        self.selection = Selection::None;
        if self.fail_reset || self.devices.is_empty() {
            self.phase = Phase::Idle;
            return Ok(false);
        }
        self.phase = Phase::RomCommand;
        Ok(true)
    }

    fn read_bit(&mut self) -> Result<bool, BoxError> {
        let query = match &mut self.phase {
            Phase::Search {
                bit,
                active,
                sent_sample,
                sent_complement,
            } => {
                if !*sent_sample {
                    *sent_sample = true;
                    Some((*bit, active.clone(), false))
                } else if !*sent_complement {
                    *sent_complement = true;
                    Some((*bit, active.clone(), true))
                } else {
                    // Out-of-protocol read; an idle line floats high.
                    return Ok(true);
                }
            }
            // Conversion-done polling.
            _ => None,
        };
        match query {
            Some((bit, active, complement_slot)) => {
                let (sample, complement) = self.sample_lines(&active, bit);
                Ok(if complement_slot { complement } else { sample })
            }
            None => Ok(self.converted),
        }
    }

    fn write_bit(&mut self, written: bool) -> Result<(), BoxError> {
        let devices = &self.devices;
        let mut finished = false;
        if let Phase::Search {
            bit,
            active,
            sent_sample,
            sent_complement,
        } = &mut self.phase
        {
            let index = *bit;
            // Devices disagreeing with the written bit drop out.
            active.retain(|&i| {
                (devices[i].rom.bytes()[index / 8] & (1 << (index % 8)) != 0) == written
            });
            *bit += 1;
            *sent_sample = false;
            *sent_complement = false;
            finished = *bit == 64;
        }
        if finished {
            self.phase = Phase::Idle;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, BoxError> {
        Ok(self.read_queue.pop_front().unwrap_or(0xFF))
    }

    fn write_byte(&mut self, value: u8) -> Result<(), BoxError> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::RomCommand => match value {
                commands::SEARCH_ROM => {
                    self.phase = Phase::Search {
                        bit: 0,
                        active: (0..self.devices.len()).collect(),
                        sent_sample: false,
                        sent_complement: false,
                    };
                }
                commands::MATCH_ROM => {
                    self.phase = Phase::MatchRom {
                        collected: Vec::with_capacity(8),
                    };
                }
                commands::SKIP_ROM => {
                    self.selection = Selection::All;
                    self.phase = Phase::FunctionCommand;
                }
                _ => {}
            },
            Phase::MatchRom { mut collected } => {
                collected.push(value);
                if collected.len() == 8 {
                    self.selection = self
                        .devices
                        .iter()
                        .position(|d| d.rom.bytes()[..] == collected[..])
                        .map_or(Selection::None, Selection::One);
                    self.phase = Phase::FunctionCommand;
                } else {
                    self.phase = Phase::MatchRom { collected };
                }
            }
            Phase::FunctionCommand => match value {
                commands::CONVERT_T => {
                    self.converted = true;
                }
                commands::READ_SCRATCHPAD => {
                    if let Selection::One(i) = self.selection {
                        let mut pad = self.devices[i].scratchpad();
                        if self.corrupt_next_scratchpad {
                            self.corrupt_next_scratchpad = false;
                            pad[0] ^= 0x01;
                        }
                        self.read_queue.extend(pad);
                    } else {
                        self.read_queue.extend([0xFF; 9]);
                    }
                }
                _ => {}
            },
            other => {
                // Writes outside a transaction are legal noise on a real
                // bus; keep whatever state we were in.
                self.phase = other;
            }
        }
        Ok(())
    }
}

/// Deterministic clock whose `sleep` advances virtual time instantly.
#[derive(Debug, Clone)]
pub struct SimClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Total virtual milliseconds since construction.
    pub fn elapsed_ms(&self) -> u64 {
        self.offset
            .lock()
            .map(|g| g.as_millis() as u64)
            .unwrap_or(0)
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
        self.origin + off
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

/// Relay port that records every byte written to the wire.
#[derive(Debug, Default)]
pub struct RecordingPort {
    pub writes: Vec<u8>,
}

impl RelayPort for RecordingPort {
    fn write(&mut self, bits: u8) -> Result<(), BoxError> {
        self.writes.push(bits);
        Ok(())
    }
}

/// Thermocouple probe returning a fixed raw frame.
///
/// A frame for T °C is `(T * 4) << 3`; set bit 2 to emulate an open
/// thermocouple.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub u16);

impl ThermocoupleProbe for FixedProbe {
    fn sample(&mut self) -> Result<u16, BoxError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratchpad_crc_is_self_consistent() {
        let dev = SimDevice::new(
            DeviceAddress::with_valid_crc([0x28, 1, 2, 3, 4, 5, 6]),
            Temperature::from_celsius(25),
        );
        let pad = dev.scratchpad();
        assert_eq!(crc8(&pad[..8]), pad[8]);
        assert_eq!(Temperature::from_scratchpad(pad[0], pad[1], false).sixteenths(), 400);
    }

    #[test]
    fn empty_bus_has_no_presence() {
        let mut bus = SimBus::new(vec![]);
        assert!(!bus.reset().unwrap());
    }

    #[test]
    fn sim_clock_sleep_is_virtual() {
        let clock = SimClock::new();
        clock.sleep(Duration::from_millis(1234));
        assert_eq!(clock.elapsed_ms(), 1234);
    }
}
