//! Radiator-loop policy: weather-compensated feed temperature.
//!
//! Target follows the outdoor temperature and the indoor deviation from
//! its setpoint. Auxiliary inputs revert to nominal defaults every cycle,
//! so a silent sensor degrades toward a safe assumption instead of
//! freezing a skewed target.

use crate::cascade::CascadeCore;
use crate::config::RadiatorCfg;
use crate::onewire::DeviceAddress;
use crate::regulator::Regulator;
use crate::temperature::Temperature;

#[derive(Debug, Clone)]
pub struct RadiatorCircuit {
    cfg: RadiatorCfg,
    core: CascadeCore,
    indoor: i32,
    outdoor: i32,
    feed_fresh: bool,
}

impl RadiatorCircuit {
    pub fn new(cfg: RadiatorCfg) -> Self {
        let regulator = Regulator::new(cfg.regulator.clone(), cfg.base_zero);
        let core = CascadeCore::new("radiator", cfg.fail_threshold, regulator, 0);
        Self {
            indoor: cfg.indoor_target,
            outdoor: cfg.outdoor_default,
            feed_fresh: false,
            core,
            cfg,
        }
    }

    /// Route a reading into this circuit; a no-op for unknown addresses
    /// and for the invalid sentinel.
    pub fn process_sensor(&mut self, addr: &DeviceAddress, value: Temperature) {
        if !value.is_valid() {
            return;
        }
        let v = i32::from(value.sixteenths());
        if *addr == self.cfg.feed_sensor {
            if v == self.cfg.fault_signature && self.core.current() < self.cfg.fault_plausible_above
            {
                // Known power-delivery quirk: the sensor answers its
                // power-on value. Only believable once the feed is already
                // running hot.
                tracing::debug!(%addr, "ignoring power-on signature from feed sensor");
                return;
            }
            self.feed_fresh = true;
            self.core.set_current(v);
        } else if *addr == self.cfg.indoor_sensor {
            self.indoor = v;
        } else if *addr == self.cfg.outdoor_sensor {
            self.outdoor = v;
        }
    }

    /// One control cycle. Returns `false` while the feed sensor is stale
    /// past the fail threshold; the command is then a forced close.
    pub fn step(&mut self) -> bool {
        let target = (self.cfg.base_zero - self.outdoor / self.cfg.outdoor_div
            + (self.cfg.indoor_target - self.indoor) * self.cfg.indoor_gain)
            .clamp(self.cfg.target_min, self.cfg.target_max);
        self.core.regulator_mut().set_target(target);

        // Revert to assumed conditions; fresh readings re-arrive next cycle.
        self.indoor = self.cfg.indoor_target;
        self.outdoor = self.cfg.outdoor_default;

        self.core.register_freshness(self.feed_fresh, 1);
        self.feed_fresh = false;
        self.core.drive()
    }

    pub fn command(&self) -> crate::actuator::ActuatorCommand {
        self.core.command()
    }

    /// Last accepted feed temperature, 1/16 °C.
    pub fn current(&self) -> i32 {
        self.core.current()
    }

    pub fn target(&self) -> i32 {
        self.core.target()
    }

    pub fn output(&self) -> i32 {
        self.core.output()
    }

    pub fn abs_output(&self) -> i32 {
        self.core.abs_output()
    }

    pub fn fail_count(&self) -> u8 {
        self.core.fail_count()
    }

    /// Human-readable one-liner for the cycle log.
    pub fn status_line(&self) -> String {
        format!(
            "radiator: current={} target={} output={} fails={}",
            Temperature::from_sixteenths(self.core.current() as i16),
            Temperature::from_sixteenths(self.core.target() as i16),
            self.core.output(),
            self.core.fail_count(),
        )
    }
}
