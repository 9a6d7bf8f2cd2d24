//! Shared cascade frame: fail accounting, regulator invocation, and
//! actuator-command derivation.
//!
//! Per-circuit behavior (target computation, sensor fan-in, fault policy)
//! lives in the owning policy structs; this frame is composed into them,
//! not inherited from.

use crate::actuator::{ActuatorCommand, Direction};
use crate::regulator::Regulator;

/// Circuit-independent cascade state.
///
/// The fail counter saturates, resets only when the circuit reports its
/// expected inputs fresh, and once past the threshold forces a full-stroke
/// close until fresh readings resume.
#[derive(Debug, Clone)]
pub struct CascadeCore {
    name: &'static str,
    fail_count: u8,
    fail_threshold: u8,
    current: i32,
    regulator: Regulator,
    last_command: ActuatorCommand,
}

impl CascadeCore {
    pub fn new(name: &'static str, fail_threshold: u8, regulator: Regulator, current: i32) -> Self {
        Self {
            name,
            fail_count: 0,
            fail_threshold,
            current,
            regulator,
            last_command: ActuatorCommand::STOP,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn set_current(&mut self, value: i32) {
        self.current = value;
    }

    pub fn fail_count(&self) -> u8 {
        self.fail_count
    }

    pub fn clear_faults(&mut self) {
        self.fail_count = 0;
    }

    pub fn add_fault(&mut self, ticks: u8) {
        self.fail_count = self.fail_count.saturating_add(ticks);
    }

    /// One-shot fail accounting: reset on a fully fresh cycle, otherwise
    /// penalize.
    pub fn register_freshness(&mut self, all_fresh: bool, penalty: u8) {
        if all_fresh {
            self.clear_faults();
        } else {
            self.add_fault(penalty);
        }
    }

    pub fn tripped(&self) -> bool {
        self.fail_count > self.fail_threshold
    }

    pub fn regulator(&self) -> &Regulator {
        &self.regulator
    }

    pub fn regulator_mut(&mut self) -> &mut Regulator {
        &mut self.regulator
    }

    /// Advance the regulator and derive the actuator command.
    ///
    /// Returns `false` while tripped; the command is then a full-stroke
    /// close regardless of regulator state.
    pub fn drive(&mut self) -> bool {
        if self.tripped() {
            self.last_command = ActuatorCommand {
                direction: Direction::Down,
                hold_ms: self.regulator.cfg().output_max.unsigned_abs(),
            };
            return false;
        }
        let out = self.regulator.step(self.current);
        self.last_command = ActuatorCommand::from_output(out);
        true
    }

    pub fn command(&self) -> ActuatorCommand {
        self.last_command
    }

    pub fn target(&self) -> i32 {
        self.regulator.target()
    }

    pub fn output(&self) -> i32 {
        self.regulator.output()
    }

    pub fn abs_output(&self) -> i32 {
        self.regulator.output().abs()
    }
}
