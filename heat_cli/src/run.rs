//! Subcommand bodies: bus scan and the control loop, against simulated
//! or real plant hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use eyre::Result;
use heat_core::mocks::{SimBus, SimClock, SimDevice};
use heat_core::{PlantCfg, PlantController, SearchState, Temperature};
use heat_hardware::{LoggingRelayPort, SimulatedProbe};
use heat_traits::{Clock, RelayPort, ThermocoupleProbe, WireBus};

/// One simulated device per configured sensor, at plausible standing
/// temperatures for a plant that has been running.
fn sim_bus(plant: &PlantCfg) -> SimBus {
    SimBus::new(vec![
        SimDevice::new(plant.radiator.feed_sensor, Temperature::from_celsius(45)),
        SimDevice::new(plant.radiator.indoor_sensor, Temperature::from_celsius(21)),
        SimDevice::new(plant.radiator.outdoor_sensor, Temperature::from_celsius(-3)),
        SimDevice::new(plant.boiler.inlet_sensor, Temperature::from_celsius(45)),
        SimDevice::new(plant.boiler.outlet_sensor, Temperature::from_celsius(48)),
    ])
}

pub fn scan(cfg: &heat_config::Config, plant: &PlantCfg, sim: bool, json: bool) -> Result<()> {
    if sim {
        return scan_bus(&mut sim_bus(plant), plant.max_devices, json);
    }
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let line = heat_hardware::GpioWireLine::new(cfg.pins.bus)?;
        let mut bus = heat_hardware::BitBangWire::new(line, heat_traits::MonotonicClock::new());
        scan_bus(&mut bus, plant.max_devices, json)
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = cfg;
        eyre::bail!("built without plant hardware support; rerun with --sim");
    }
}

fn scan_bus<B: WireBus + ?Sized>(bus: &mut B, max_devices: usize, json: bool) -> Result<()> {
    let mut search = SearchState::new();
    let mut found = Vec::new();
    while found.len() < max_devices {
        match search.advance(bus) {
            Ok(addr) => found.push(addr),
            Err(e) => {
                tracing::warn!(error = %e, "scan aborted");
                break;
            }
        }
        if search.is_done() {
            break;
        }
    }
    if json {
        let devices: Vec<String> = found.iter().map(ToString::to_string).collect();
        println!("{}", serde_json::json!({ "devices": devices }));
    } else {
        for addr in &found {
            println!("{addr}");
        }
        println!("{} device(s)", found.len());
    }
    Ok(())
}

pub fn run(
    cfg: &heat_config::Config,
    plant: PlantCfg,
    cycles: Option<u64>,
    sim: bool,
    stop: Arc<AtomicBool>,
) -> Result<()> {
    if sim {
        let mut bus = sim_bus(&plant);
        // Flue warms from ambient toward a firing boiler.
        let mut probe = SimulatedProbe::new(20, 90, 2);
        let mut port = LoggingRelayPort;
        let controller = PlantController::new(plant, SimClock::new());
        return run_loop(controller, &mut bus, &mut probe, &mut port, cycles, &stop);
    }
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let clock = heat_traits::MonotonicClock::new();
        let line = heat_hardware::GpioWireLine::new(cfg.pins.bus)?;
        let mut bus = heat_hardware::BitBangWire::new(line, clock);
        let spi =
            heat_hardware::GpioSpiLine::new(cfg.pins.tc_clk, cfg.pins.tc_cs, cfg.pins.tc_miso)?;
        let mut probe = heat_hardware::Max6675::new(spi, clock);
        let mut port = heat_hardware::I2cRelayPort::new(cfg.pins.relay_i2c_addr)?;
        let controller = PlantController::new(plant, clock);
        run_loop(controller, &mut bus, &mut probe, &mut port, cycles, &stop)
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    {
        let _ = cfg;
        eyre::bail!("built without plant hardware support; rerun with --sim");
    }
}

fn run_loop<C, B, T, P>(
    mut controller: PlantController<C>,
    bus: &mut B,
    probe: &mut T,
    port: &mut P,
    cycles: Option<u64>,
    stop: &AtomicBool,
) -> Result<()>
where
    C: Clock,
    B: WireBus + ?Sized,
    T: ThermocoupleProbe + ?Sized,
    P: RelayPort + ?Sized,
{
    let mut completed: u64 = 0;
    while !stop.load(Ordering::Relaxed) {
        let summary = controller.run_cycle(bus, probe, port)?;
        tracing::debug!(
            devices = summary.devices,
            radiator_ok = summary.radiator_ok,
            boiler_ok = summary.boiler_ok,
            "cycle complete"
        );
        completed += 1;
        if let Some(limit) = cycles
            && completed >= limit
        {
            break;
        }
    }
    tracing::info!(completed, "control loop stopped");
    Ok(())
}
