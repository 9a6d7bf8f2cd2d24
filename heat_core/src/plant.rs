//! The per-cycle orchestrator: discovery, conversion, sensor routing,
//! cascade stepping, actuator drive, period pacing.
//!
//! Protocol errors never abort the plant; they are logged and retried on
//! the next cycle. Only transport faults (a broken line driver) bubble up.

use std::time::Duration;

use heat_traits::{Clock, RelayPort, ThermocoupleProbe, WireBus};

use crate::actuator::{self, ActuatorBank};
use crate::boiler::BoilerCircuit;
use crate::config::PlantCfg;
use crate::error::{BusError, Result};
use crate::onewire::{DeviceAddress, SearchState};
use crate::radiator::RadiatorCircuit;
use crate::sensor;
use crate::temperature::Temperature;

/// What one cycle accomplished.
#[derive(Debug, Clone, Copy)]
pub struct CycleSummary {
    pub devices: usize,
    pub radiator_ok: bool,
    pub boiler_ok: bool,
}

pub struct PlantController<C: Clock> {
    cfg: PlantCfg,
    clock: C,
    radiator: RadiatorCircuit,
    boiler: BoilerCircuit,
    bank: ActuatorBank,
}

impl<C: Clock> PlantController<C> {
    pub fn new(cfg: PlantCfg, clock: C) -> Self {
        let radiator = RadiatorCircuit::new(cfg.radiator.clone());
        let boiler = BoilerCircuit::new(cfg.boiler.clone());
        let bank = ActuatorBank::new(cfg.relay_map);
        Self {
            cfg,
            clock,
            radiator,
            boiler,
            bank,
        }
    }

    pub fn radiator(&self) -> &RadiatorCircuit {
        &self.radiator
    }

    pub fn boiler(&self) -> &BoilerCircuit {
        &self.boiler
    }

    /// Enumerate the bus population, bounded by `max_devices`.
    ///
    /// Protocol errors end the enumeration early with whatever was found;
    /// the next cycle retries from scratch.
    pub fn discover<B: WireBus + ?Sized>(&self, bus: &mut B) -> Result<Vec<DeviceAddress>> {
        let mut found = Vec::with_capacity(self.cfg.max_devices);
        let mut search = SearchState::new();
        while found.len() < self.cfg.max_devices {
            match search.advance(bus) {
                Ok(addr) => found.push(addr),
                Err(e) if e.is_transport() => {
                    return Err(crate::error::Report::new(e).wrap_err("bus transport"));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "device discovery aborted");
                    break;
                }
            }
            if search.is_done() {
                break;
            }
        }
        Ok(found)
    }

    /// Run one complete control cycle and sleep out the remaining period.
    pub fn run_cycle<B, T, P>(
        &mut self,
        bus: &mut B,
        probe: &mut T,
        port: &mut P,
    ) -> Result<CycleSummary>
    where
        B: WireBus + ?Sized,
        T: ThermocoupleProbe + ?Sized,
        P: RelayPort + ?Sized,
    {
        let cycle_start = self.clock.now();

        let found = self.discover(bus)?;
        tracing::debug!(devices = found.len(), "discovery finished");

        if !found.is_empty() {
            match sensor::convert_all(bus) {
                Ok(()) => {
                    if !sensor::wait_conversion(bus, self.cfg.convert_poll_limit)
                        .map_err(transport)?
                    {
                        tracing::warn!("temperature conversion did not finish in time");
                    }
                    for addr in &found {
                        let t = sensor::read_temperature(bus, addr, self.cfg.read_retries)
                            .map_err(transport)?;
                        tracing::debug!(%addr, temp = %t, "sensor reading");
                        self.radiator.process_sensor(addr, t);
                        self.boiler.process_sensor(addr, t);
                    }
                }
                Err(e) if e.is_transport() => {
                    return Err(crate::error::Report::new(e).wrap_err("bus transport"));
                }
                Err(e) => tracing::warn!(error = %e, "conversion broadcast failed"),
            }
        }

        match probe.sample() {
            Ok(frame) => {
                self.boiler
                    .process_thermocouple(Temperature::from_max6675(frame));
            }
            Err(e) => tracing::warn!(error = %e, "thermocouple read failed"),
        }

        let radiator_ok = self.radiator.step();
        let boiler_ok = self.boiler.step();
        if !radiator_ok {
            tracing::warn!("radiator sensors stale, valve forced closed");
        }
        if !boiler_ok {
            tracing::warn!("boiler sensors stale, valve forced closed");
        }
        tracing::info!("{}", self.radiator.status_line());
        tracing::info!("{}", self.boiler.status_line());

        self.bank.set_pump(self.boiler.pump_running());
        actuator::drive(
            &mut self.bank,
            port,
            &self.clock,
            self.radiator.command(),
            self.boiler.command(),
        )?;

        // Pace to the nominal period; an overrun means no sleep, never a
        // catch-up.
        let elapsed = self.clock.ms_since(cycle_start);
        if elapsed < self.cfg.cycle_ms {
            self.clock
                .sleep(Duration::from_millis(self.cfg.cycle_ms - elapsed));
        }

        Ok(CycleSummary {
            devices: found.len(),
            radiator_ok,
            boiler_ok,
        })
    }
}

fn transport(e: BusError) -> crate::error::Report {
    crate::error::Report::new(e).wrap_err("bus transport")
}
