use heat_core::temperature::Temperature;
use heat_core::{BoilerCfg, BoilerCircuit, Direction};

fn t(deg: i8) -> Temperature {
    Temperature::from_celsius(deg)
}

/// Feed identical inlet/outlet/flue readings until the outlet rolling
/// average converges onto the outlet value.
fn settle(circuit: &mut BoilerCircuit, cfg: &BoilerCfg, inlet: i8, outlet: i8, flue: i8) {
    for _ in 0..12 {
        circuit.process_sensor(&cfg.inlet_sensor, t(inlet));
        circuit.process_sensor(&cfg.outlet_sensor, t(outlet));
        circuit.process_thermocouple(t(flue));
        circuit.step();
    }
}

#[test]
fn pump_stops_when_boiler_is_out_and_cooling() {
    let cfg = BoilerCfg::default();
    let mut circuit = BoilerCircuit::new(cfg.clone());

    settle(&mut circuit, &cfg, 45, 50, 20);
    assert_eq!(circuit.outlet_average(), 50 * 16);
    assert!(circuit.pump_running(), "boiler at idle bound keeps the pump on");

    // Outlet eases to 48 °C: below the idle bound, below its average,
    // within min_delta of the inlet, flue cold, no faults.
    circuit.process_sensor(&cfg.inlet_sensor, t(45));
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    circuit.process_thermocouple(t(20));
    assert!(circuit.step());

    assert!(!circuit.pump_running());
    // max(outlet - min_delta, inlet + min_delta) = max(44, 49) = 49 °C
    assert_eq!(circuit.target(), 49 * 16);
}

#[test]
fn hot_flue_keeps_the_pump_running() {
    let cfg = BoilerCfg::default();
    let mut circuit = BoilerCircuit::new(cfg.clone());

    settle(&mut circuit, &cfg, 45, 50, 20);
    circuit.process_sensor(&cfg.inlet_sensor, t(45));
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    // Burner firing: flue above the ignition threshold.
    circuit.process_thermocouple(t(70));
    assert!(circuit.step());

    assert!(circuit.pump_running());
    // max(outlet - max_delta, base_target) = max(13, 50) = 50 °C
    assert_eq!(circuit.target(), 50 * 16);
}

#[test]
fn active_heat_production_keeps_the_pump_running() {
    let cfg = BoilerCfg::default();
    let mut circuit = BoilerCircuit::new(cfg.clone());

    settle(&mut circuit, &cfg, 45, 48, 20);
    // Inlet far below outlet: the boiler is actively making heat.
    circuit.process_sensor(&cfg.inlet_sensor, t(40));
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    circuit.process_thermocouple(t(20));
    assert!(circuit.step());
    assert!(circuit.pump_running());
}

#[test]
fn implausible_gap_substitutes_outlet_for_inlet() {
    let cfg = BoilerCfg::default();
    let mut circuit = BoilerCircuit::new(cfg.clone());

    circuit.process_sensor(&cfg.inlet_sensor, t(10));
    circuit.process_sensor(&cfg.outlet_sensor, t(80));
    assert!(circuit.step());

    // 10 + 64 < 80: the inlet reading is not physical.
    assert_eq!(circuit.current(), 80 * 16);
    assert_eq!(circuit.fail_count(), 1);
    assert!(circuit.pump_running(), "faulted cycle may not stop the pump");
}

#[test]
fn missing_inlet_reverts_to_sentinel_and_counts_faults() {
    let cfg = BoilerCfg::default();
    let mut circuit = BoilerCircuit::new(cfg.clone());

    circuit.process_sensor(&cfg.inlet_sensor, t(45));
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    assert!(circuit.step());
    assert_eq!(circuit.fail_count(), 0);

    // Next cycle the inlet stays silent: the end-of-cycle sentinel trips
    // the gap guard, so the regulator sees the outlet, never the sentinel.
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    assert!(circuit.step());
    assert_eq!(circuit.current(), 48 * 16);
    assert_eq!(circuit.fail_count(), 2);
}

#[test]
fn configurable_penalties_change_fault_accounting() {
    let cfg = BoilerCfg {
        inlet_penalty: 2,
        outlet_penalty: 0,
        ..BoilerCfg::default()
    };
    let mut circuit = BoilerCircuit::new(cfg.clone());

    // Only the outlet reports; inlet misses cost 2 ticks each, plus one
    // for the sentinel-triggered gap guard.
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    assert!(circuit.step());
    assert_eq!(circuit.fail_count(), 3);
}

#[test]
fn stale_sensors_trip_the_fail_safe_and_recover() {
    let cfg = BoilerCfg::default();
    let mut circuit = BoilerCircuit::new(cfg.clone());

    circuit.process_sensor(&cfg.inlet_sensor, t(45));
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    assert!(circuit.step());

    // Two penalty ticks per silent cycle plus the gap-guard tick: the
    // third silent cycle crosses the threshold of 5.
    assert!(circuit.step());
    assert!(!circuit.step());
    assert_eq!(circuit.command().direction, Direction::Down);

    circuit.process_sensor(&cfg.inlet_sensor, t(45));
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    assert!(circuit.step());
    assert_eq!(circuit.fail_count(), 0);
}

#[test]
fn invalid_thermocouple_frame_keeps_last_flue_value() {
    let cfg = BoilerCfg::default();
    let mut circuit = BoilerCircuit::new(cfg.clone());

    settle(&mut circuit, &cfg, 45, 50, 70);
    circuit.process_sensor(&cfg.inlet_sensor, t(45));
    circuit.process_sensor(&cfg.outlet_sensor, t(48));
    // Open thermocouple: the hot flue value must be retained, keeping the
    // pump on, rather than decaying to "cold".
    circuit.process_thermocouple(Temperature::INVALID);
    assert!(circuit.step());
    assert!(circuit.pump_running());
}
