//! Hosted stand-ins for demo runs without plant hardware.
//!
//! The simulated sensor bus itself lives in `heat_core::mocks`; these
//! cover the two remaining peripherals, the thermocouple converter and
//! the relay driver.

use heat_traits::{RelayPort, ThermocoupleProbe};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Simulated thermocouple: warms by a fixed step per sample up to a
/// ceiling, like a flue heating toward steady state.
pub struct SimulatedProbe {
    quarter_deg: u16,
    ceiling: u16,
    step: u16,
}

impl SimulatedProbe {
    pub fn new(start_c: u16, ceiling_c: u16, step_quarters: u16) -> Self {
        Self {
            quarter_deg: start_c * 4,
            ceiling: ceiling_c * 4,
            step: step_quarters,
        }
    }
}

impl ThermocoupleProbe for SimulatedProbe {
    fn sample(&mut self) -> Result<u16, BoxError> {
        let frame = self.quarter_deg << 3;
        self.quarter_deg = (self.quarter_deg + self.step).min(self.ceiling);
        Ok(frame)
    }
}

/// Relay port that logs each byte instead of driving a peripheral.
#[derive(Debug, Default)]
pub struct LoggingRelayPort;

impl RelayPort for LoggingRelayPort {
    fn write(&mut self, bits: u8) -> Result<(), BoxError> {
        tracing::info!("relay write (simulated): {bits:08b}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_probe_warms_to_its_ceiling() {
        let mut probe = SimulatedProbe::new(20, 21, 4);
        assert_eq!(probe.sample().unwrap(), (20 * 4) << 3);
        assert_eq!(probe.sample().unwrap(), (21 * 4) << 3);
        // Holds at the ceiling.
        assert_eq!(probe.sample().unwrap(), (21 * 4) << 3);
    }
}
