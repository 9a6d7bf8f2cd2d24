//! Boiler-loop policy: inlet regulation with pump interlock.
//!
//! The pump is stopped (boiler hydraulically disconnected) only when every
//! sign says the burner is out: flue cold, outlet below the idle bound, no
//! faults this cycle, outlet at or below its rolling average, and no
//! inlet/outlet spread. Everything else keeps water moving.

use crate::actuator::ActuatorCommand;
use crate::cascade::CascadeCore;
use crate::config::BoilerCfg;
use crate::onewire::DeviceAddress;
use crate::regulator::Regulator;
use crate::temperature::Temperature;

#[derive(Debug, Clone)]
pub struct BoilerCircuit {
    cfg: BoilerCfg,
    core: CascadeCore,
    inlet: i32,
    outlet: i32,
    outlet_avg: i32,
    flue: i32,
    inlet_fresh: bool,
    outlet_fresh: bool,
    pump_running: bool,
}

impl BoilerCircuit {
    pub fn new(cfg: BoilerCfg) -> Self {
        let regulator = Regulator::new(cfg.regulator.clone(), cfg.base_target);
        let core = CascadeCore::new("boiler", cfg.fail_threshold, regulator, cfg.cold_sentinel);
        Self {
            inlet: cfg.cold_sentinel,
            outlet: 0,
            outlet_avg: 0,
            flue: 0,
            inlet_fresh: false,
            outlet_fresh: false,
            pump_running: true,
            core,
            cfg,
        }
    }

    pub fn process_sensor(&mut self, addr: &DeviceAddress, value: Temperature) {
        if !value.is_valid() {
            return;
        }
        let v = i32::from(value.sixteenths());
        if *addr == self.cfg.inlet_sensor {
            self.inlet = v;
            self.inlet_fresh = true;
        } else if *addr == self.cfg.outlet_sensor {
            self.outlet = v;
            self.outlet_fresh = true;
            // Exponentially decayed rolling average of the outlet.
            self.outlet_avg = (self.outlet_avg + self.outlet + 1) / 2;
        }
    }

    /// Route a flue (thermocouple) reading; an invalid frame keeps the
    /// last value rather than pretending the flue went cold.
    pub fn process_thermocouple(&mut self, value: Temperature) {
        if !value.is_valid() {
            tracing::debug!("invalid thermocouple frame, keeping last flue value");
            return;
        }
        self.flue = i32::from(value.sixteenths());
    }

    /// One control cycle. Returns `false` while sensor faults exceed the
    /// threshold; the valve command is then a forced close.
    pub fn step(&mut self) -> bool {
        if self.inlet_fresh && self.outlet_fresh {
            self.core.clear_faults();
        }
        if !self.inlet_fresh {
            self.core.add_fault(self.cfg.inlet_penalty);
        }
        if !self.outlet_fresh {
            self.core.add_fault(self.cfg.outlet_penalty);
        }
        self.inlet_fresh = false;
        self.outlet_fresh = false;

        if self.inlet + self.cfg.gap_limit < self.outlet {
            // Gap beyond physical plausibility: inlet sensor (or its
            // reading) is wrong. Regulate on the outlet instead.
            tracing::warn!(
                inlet = %Temperature::from_sixteenths(self.inlet as i16),
                outlet = %Temperature::from_sixteenths(self.outlet as i16),
                "implausible inlet/outlet gap, substituting outlet"
            );
            self.inlet = self.outlet;
            self.core.add_fault(1);
        }

        let target = if self.flue < self.cfg.flue_firing
            && self.outlet < self.cfg.outlet_idle_max
            && self.core.fail_count() == 0
            && self.outlet <= self.outlet_avg
            && self.inlet + self.cfg.min_delta > self.outlet
        {
            // Boiler is out and cooling: disconnect it from the pipes.
            self.pump_running = false;
            (self.outlet - self.cfg.min_delta).max(self.inlet + self.cfg.min_delta)
        } else {
            self.pump_running = true;
            (self.outlet - self.cfg.max_delta).max(self.cfg.base_target)
        };
        self.core.regulator_mut().set_target(target);
        self.core.set_current(self.inlet);

        let ok = self.core.drive();

        // A missing reading next cycle must be unmistakable, not a stale
        // plausible value.
        self.inlet = self.cfg.cold_sentinel;
        ok
    }

    pub fn pump_running(&self) -> bool {
        self.pump_running
    }

    pub fn command(&self) -> ActuatorCommand {
        self.core.command()
    }

    /// Regulator input of the last step (inlet, possibly substituted).
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

    pub fn outlet_average(&self) -> i32 {
        self.outlet_avg
    }

    pub fn status_line(&self) -> String {
        format!(
            "boiler: current={} target={} output={} pump={} delta={} fails={}",
            Temperature::from_sixteenths(self.core.current() as i16),
            Temperature::from_sixteenths(self.core.target() as i16),
            self.core.output(),
            u8::from(self.pump_running),
            Temperature::from_sixteenths((self.outlet - self.core.current()) as i16),
            self.core.fail_count(),
        )
    }
}
