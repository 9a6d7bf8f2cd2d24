//! Relay-byte ownership and the two-actuator drive schedule.
//!
//! One `ActuatorBank` owns the shared relay byte; circuits never touch it
//! directly. The byte goes out to the driver peripheral as its bitwise
//! complement (active-low), which the attached relay board requires.

use std::time::Duration;

use eyre::WrapErr;
use heat_traits::{Clock, RelayPort};

use crate::error::Result;

/// Drive direction for a motorized valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Stop,
}

/// One cascade's actuator request: a direction held for a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub direction: Direction,
    pub hold_ms: u32,
}

impl ActuatorCommand {
    pub const STOP: ActuatorCommand = ActuatorCommand {
        direction: Direction::Stop,
        hold_ms: 0,
    };

    /// Translate a signed regulator output: negative opens (Up), positive
    /// closes (Down), zero stops.
    pub fn from_output(out: i32) -> Self {
        match out {
            0 => Self::STOP,
            o if o < 0 => Self {
                direction: Direction::Up,
                hold_ms: o.unsigned_abs(),
            },
            o => Self {
                direction: Direction::Down,
                hold_ms: o as u32,
            },
        }
    }

    fn effective(self) -> (Direction, u32) {
        if self.hold_ms == 0 || self.direction == Direction::Stop {
            (Direction::Stop, 0)
        } else {
            (self.direction, self.hold_ms)
        }
    }
}

/// The two time-sliced valve channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Radiator,
    Boiler,
}

/// Relay-byte bit assignments.
#[derive(Debug, Clone, Copy)]
pub struct RelayMap {
    pub pump_bit: u8,
    pub boiler_up_bit: u8,
    pub boiler_down_bit: u8,
    pub radiator_up_bit: u8,
    pub radiator_down_bit: u8,
}

impl Default for RelayMap {
    fn default() -> Self {
        Self {
            pump_bit: 3,
            boiler_up_bit: 4,
            boiler_down_bit: 5,
            radiator_up_bit: 6,
            radiator_down_bit: 7,
        }
    }
}

/// Sole owner of the shared relay byte.
#[derive(Debug, Clone)]
pub struct ActuatorBank {
    map: RelayMap,
    bits: u8,
}

impl ActuatorBank {
    pub fn new(map: RelayMap) -> Self {
        Self { map, bits: 0 }
    }

    pub fn set_valve(&mut self, channel: Channel, direction: Direction) {
        let (up, down) = match channel {
            Channel::Radiator => (self.map.radiator_up_bit, self.map.radiator_down_bit),
            Channel::Boiler => (self.map.boiler_up_bit, self.map.boiler_down_bit),
        };
        match direction {
            Direction::Up => {
                self.bits &= !(1 << down);
                self.bits |= 1 << up;
            }
            Direction::Down => {
                self.bits &= !(1 << up);
                self.bits |= 1 << down;
            }
            Direction::Stop => {
                self.bits &= !((1 << up) | (1 << down));
            }
        }
    }

    pub fn set_pump(&mut self, on: bool) {
        if on {
            self.bits |= 1 << self.map.pump_bit;
        } else {
            self.bits &= !(1 << self.map.pump_bit);
        }
    }

    pub fn pump_on(&self) -> bool {
        self.bits & (1 << self.map.pump_bit) != 0
    }

    /// Logical state, active-high.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Wire state for the driver peripheral, active-low.
    pub fn line_state(&self) -> u8 {
        !self.bits
    }
}

/// How two hold times interleave: both actuators run together for
/// `joint_ms`, then the longer one alone for `remainder_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapPlan {
    pub joint_ms: u32,
    pub remainder_ms: u32,
    pub longer: Option<Channel>,
}

/// Pure schedule computation; `a` is the radiator channel, `b` the boiler.
pub fn overlap_plan(a: ActuatorCommand, b: ActuatorCommand) -> OverlapPlan {
    let (_, a_ms) = a.effective();
    let (_, b_ms) = b.effective();
    OverlapPlan {
        joint_ms: a_ms.min(b_ms),
        remainder_ms: a_ms.abs_diff(b_ms),
        longer: if a_ms > b_ms {
            Some(Channel::Radiator)
        } else if b_ms > a_ms {
            Some(Channel::Boiler)
        } else {
            None
        },
    }
}

/// Execute one cycle's drive: overlap the two windows maximally so total
/// relay-on time is `max(a, b)` rather than `a + b`, and stop each
/// actuator exactly once, at its computed duration.
pub fn drive<P, C>(
    bank: &mut ActuatorBank,
    port: &mut P,
    clock: &C,
    radiator: ActuatorCommand,
    boiler: ActuatorCommand,
) -> Result<()>
where
    P: RelayPort + ?Sized,
    C: Clock + ?Sized,
{
    let (rad_dir, _) = radiator.effective();
    let (boil_dir, _) = boiler.effective();
    bank.set_valve(Channel::Radiator, rad_dir);
    bank.set_valve(Channel::Boiler, boil_dir);
    write_port(bank, port)?;

    let plan = overlap_plan(radiator, boiler);
    if plan.joint_ms > 0 {
        clock.sleep(Duration::from_millis(u64::from(plan.joint_ms)));
    }

    let Some(longer) = plan.longer else {
        // Equal windows: one joint stop, or nothing ever ran.
        if plan.joint_ms > 0 {
            bank.set_valve(Channel::Radiator, Direction::Stop);
            bank.set_valve(Channel::Boiler, Direction::Stop);
            write_port(bank, port)?;
        }
        return Ok(());
    };

    let shorter = match longer {
        Channel::Radiator => Channel::Boiler,
        Channel::Boiler => Channel::Radiator,
    };
    if plan.joint_ms > 0 {
        // The shorter window actually ran; end it now. A zero-length
        // window was never asserted, so its stop was the initial write.
        bank.set_valve(shorter, Direction::Stop);
        write_port(bank, port)?;
    }
    clock.sleep(Duration::from_millis(u64::from(plan.remainder_ms)));
    bank.set_valve(longer, Direction::Stop);
    write_port(bank, port)?;
    Ok(())
}

fn write_port<P: RelayPort + ?Sized>(bank: &ActuatorBank, port: &mut P) -> Result<()> {
    port.write(bank.line_state())
        .map_err(|e| eyre::eyre!(e.to_string()))
        .wrap_err("relay port write")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_from_output_maps_sign_to_direction() {
        assert_eq!(ActuatorCommand::from_output(0), ActuatorCommand::STOP);
        let up = ActuatorCommand::from_output(-250);
        assert_eq!((up.direction, up.hold_ms), (Direction::Up, 250));
        let down = ActuatorCommand::from_output(4000);
        assert_eq!((down.direction, down.hold_ms), (Direction::Down, 4000));
    }

    #[test]
    fn overlap_plan_conserves_total_drive() {
        let a = ActuatorCommand::from_output(-1000);
        let b = ActuatorCommand::from_output(3000);
        let plan = overlap_plan(a, b);
        assert_eq!(plan.joint_ms, 1000);
        assert_eq!(plan.remainder_ms, 2000);
        assert_eq!(plan.longer, Some(Channel::Boiler));
    }

    #[test]
    fn overlap_plan_equal_windows_have_no_remainder() {
        let a = ActuatorCommand::from_output(500);
        let b = ActuatorCommand::from_output(-500);
        let plan = overlap_plan(a, b);
        assert_eq!(plan.joint_ms, 500);
        assert_eq!(plan.remainder_ms, 0);
        assert_eq!(plan.longer, None);
    }

    #[test]
    fn bank_keeps_valve_bits_exclusive() {
        let mut bank = ActuatorBank::new(RelayMap::default());
        bank.set_valve(Channel::Radiator, Direction::Up);
        assert_eq!(bank.bits(), 0b0100_0000);
        bank.set_valve(Channel::Radiator, Direction::Down);
        assert_eq!(bank.bits(), 0b1000_0000);
        bank.set_valve(Channel::Radiator, Direction::Stop);
        assert_eq!(bank.bits(), 0);
    }

    #[test]
    fn line_state_is_active_low() {
        let mut bank = ActuatorBank::new(RelayMap::default());
        assert_eq!(bank.line_state(), 0xFF);
        bank.set_pump(true);
        assert_eq!(bank.line_state(), !0b0000_1000);
    }
}
