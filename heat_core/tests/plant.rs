use heat_core::mocks::{FixedProbe, RecordingPort, SimBus, SimClock, SimDevice};
use heat_core::temperature::Temperature;
use heat_core::{PlantCfg, PlantController};

fn t(deg: i8) -> Temperature {
    Temperature::from_celsius(deg)
}

/// A bus populated with all five plant sensors at plausible temperatures.
fn plant_bus(cfg: &PlantCfg) -> SimBus {
    SimBus::new(vec![
        SimDevice::new(cfg.radiator.feed_sensor, t(45)),
        SimDevice::new(cfg.radiator.indoor_sensor, t(21)),
        SimDevice::new(cfg.radiator.outdoor_sensor, t(-3)),
        SimDevice::new(cfg.boiler.inlet_sensor, t(45)),
        SimDevice::new(cfg.boiler.outlet_sensor, t(48)),
    ])
}

#[test]
fn one_cycle_reads_routes_regulates_and_paces() {
    let cfg = PlantCfg::default();
    let mut bus = plant_bus(&cfg);
    // 20 °C flue: 80 quarter-degrees.
    let mut probe = FixedProbe(80 << 3);
    let mut port = RecordingPort::default();
    let clock = SimClock::new();
    let mut plant = PlantController::new(cfg, clock.clone());

    let summary = plant.run_cycle(&mut bus, &mut probe, &mut port).unwrap();

    assert_eq!(summary.devices, 5);
    assert!(summary.radiator_ok);
    assert!(summary.boiler_ok);

    // Radiator target: 40 - (-3)/2 + (22 - 21)*4 = 45.5 °C = 728.
    assert_eq!(plant.radiator().target(), 728);
    assert_eq!(plant.radiator().current(), 45 * 16);
    // err = -8 with P gain 2: nudge the valve open 16 ms.
    assert_eq!(plant.radiator().output(), -16);

    // Boiler just seeded its rolling average, so it reads as warming:
    // pump on, target at the 50 °C floor, valve opening.
    assert!(plant.boiler().pump_running());
    assert_eq!(plant.boiler().target(), 50 * 16);
    assert_eq!(plant.boiler().output(), -325);

    // Relay writes: both valves up + pump; radiator stops first, boiler
    // later; all bytes complemented for the active-low driver.
    assert_eq!(port.writes, vec![!0x58, !0x18, !0x08]);

    // Valve drive took 325 ms; the cycle sleeps out the full 5 s period.
    assert_eq!(clock.elapsed_ms(), 5000);
}

#[test]
fn discovery_failure_degrades_into_fail_counting() {
    let cfg = PlantCfg::default();
    let mut bus = plant_bus(&cfg);
    let mut probe = FixedProbe(80 << 3);
    let mut port = RecordingPort::default();
    let clock = SimClock::new();
    let mut plant = PlantController::new(cfg, clock.clone());

    // One healthy cycle, then the bus goes dead.
    let summary = plant.run_cycle(&mut bus, &mut probe, &mut port).unwrap();
    assert!(summary.radiator_ok && summary.boiler_ok);
    bus.fail_resets(true);

    let mut last = None;
    for _ in 0..6 {
        last = Some(plant.run_cycle(&mut bus, &mut probe, &mut port).unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.devices, 0);
    // Boiler loses two sensors per cycle (plus the gap-guard tick) and
    // trips well before the radiator; after six dead cycles both are out.
    assert!(!last.radiator_ok);
    assert!(!last.boiler_ok);

    // Recovery: the bus comes back and both circuits self-heal.
    bus.fail_resets(false);
    let healed = plant.run_cycle(&mut bus, &mut probe, &mut port).unwrap();
    assert_eq!(healed.devices, 5);
    assert!(healed.radiator_ok);
    assert!(healed.boiler_ok);
}

#[test]
fn cycles_are_paced_to_the_configured_period() {
    let cfg = PlantCfg {
        cycle_ms: 1000,
        ..PlantCfg::default()
    };
    let mut bus = plant_bus(&cfg);
    let mut probe = FixedProbe(80 << 3);
    let mut port = RecordingPort::default();
    let clock = SimClock::new();
    let mut plant = PlantController::new(cfg, clock.clone());

    for _ in 0..3 {
        plant.run_cycle(&mut bus, &mut probe, &mut port).unwrap();
    }
    assert_eq!(clock.elapsed_ms(), 3000);
}

#[test]
fn overrunning_cycle_is_not_compensated() {
    // Valve strokes longer than the period: the cycle must not sleep a
    // negative remainder or try to catch up.
    let mut cfg = PlantCfg::default();
    cfg.cycle_ms = 100;
    cfg.radiator.regulator.gain_p = 100;
    let mut bus = plant_bus(&cfg);
    let mut probe = FixedProbe(80 << 3);
    let mut port = RecordingPort::default();
    let clock = SimClock::new();
    let mut plant = PlantController::new(cfg, clock.clone());

    plant.run_cycle(&mut bus, &mut probe, &mut port).unwrap();

    // Radiator drive: err -8 * gain 100 = -800 ms, beyond the 100 ms
    // period; elapsed time is the drive itself, no added sleep.
    assert_eq!(clock.elapsed_ms(), 800);
}
