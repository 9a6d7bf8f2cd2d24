//! Runtime configuration for the control core.
//!
//! These structs carry fixed-point values (1/16 °C, signed milliseconds)
//! and parsed device addresses. They are built once from the
//! TOML-deserialized `heat_config::Config`, which keeps human units.

use eyre::WrapErr;

use crate::actuator::RelayMap;
use crate::error::Result;
use crate::fixed_point::quantize_to_t16;
use crate::onewire::DeviceAddress;
use crate::temperature::Temperature;

/// Regulator tuning in core units. See `heat_config::RegulatorCfg` for
/// the human-facing fields; the divisors stay configuration because the
/// deployed plants never agreed on them.
#[derive(Debug, Clone)]
pub struct RegulatorCfg {
    pub gain_p: i32,
    pub gain_i: i32,
    pub gain_d: i32,
    /// Output bounds, signed milliseconds of valve drive.
    pub output_max: i32,
    pub output_min: i32,
    /// Large-error bypass threshold, 1/16 °C.
    pub large_error: i32,
    pub integral_div: i32,
    pub integral_limit_div: i32,
    pub derivative_div: i32,
    pub smooth_output: bool,
}

impl Default for RegulatorCfg {
    fn default() -> Self {
        Self::from_toml(&heat_config::RegulatorCfg::default())
    }
}

impl RegulatorCfg {
    pub fn from_toml(r: &heat_config::RegulatorCfg) -> Self {
        Self {
            gain_p: r.gain_p,
            gain_i: r.gain_i,
            gain_d: r.gain_d,
            output_max: r.output_max_ms,
            output_min: r.output_min_ms,
            large_error: quantize_to_t16(r.large_error_c),
            integral_div: r.integral_div,
            integral_limit_div: r.integral_limit_div,
            derivative_div: r.derivative_div,
            smooth_output: r.smooth_output,
        }
    }
}

/// Radiator-circuit policy parameters, fixed point.
#[derive(Debug, Clone)]
pub struct RadiatorCfg {
    pub feed_sensor: DeviceAddress,
    pub indoor_sensor: DeviceAddress,
    pub outdoor_sensor: DeviceAddress,
    pub base_zero: i32,
    pub outdoor_div: i32,
    pub indoor_gain: i32,
    pub target_min: i32,
    pub target_max: i32,
    pub indoor_target: i32,
    pub outdoor_default: i32,
    pub fault_signature: i32,
    pub fault_plausible_above: i32,
    pub fail_threshold: u8,
    pub regulator: RegulatorCfg,
}

impl Default for RadiatorCfg {
    fn default() -> Self {
        Self {
            feed_sensor: DeviceAddress::with_valid_crc([0x28, 0xD9, 0xF8, 0xD5, 0x03, 0x00, 0x00]),
            indoor_sensor: DeviceAddress::with_valid_crc([
                0x28, 0xC3, 0xE0, 0xD5, 0x03, 0x00, 0x00,
            ]),
            outdoor_sensor: DeviceAddress::with_valid_crc([
                0x28, 0x0A, 0xFB, 0xD5, 0x03, 0x00, 0x00,
            ]),
            base_zero: quantize_to_t16(40.0),
            outdoor_div: 2,
            indoor_gain: 4,
            target_min: quantize_to_t16(22.0),
            target_max: quantize_to_t16(70.0),
            indoor_target: quantize_to_t16(22.0),
            outdoor_default: quantize_to_t16(-5.0),
            fault_signature: quantize_to_t16(85.0),
            fault_plausible_above: quantize_to_t16(60.0),
            fail_threshold: 5,
            regulator: RegulatorCfg::default(),
        }
    }
}

/// Boiler-circuit policy parameters, fixed point.
#[derive(Debug, Clone)]
pub struct BoilerCfg {
    pub inlet_sensor: DeviceAddress,
    pub outlet_sensor: DeviceAddress,
    pub base_target: i32,
    pub outlet_idle_max: i32,
    pub max_delta: i32,
    pub min_delta: i32,
    pub flue_firing: i32,
    pub gap_limit: i32,
    /// Inlet value restored at end of cycle; trips the gap guard if no
    /// fresh reading arrives, so the regulator never sees it directly.
    pub cold_sentinel: i32,
    pub inlet_penalty: u8,
    pub outlet_penalty: u8,
    pub fail_threshold: u8,
    pub regulator: RegulatorCfg,
}

impl Default for BoilerCfg {
    fn default() -> Self {
        Self {
            inlet_sensor: DeviceAddress::with_valid_crc([0x28, 0x50, 0x05, 0xD6, 0x03, 0x00, 0x00]),
            outlet_sensor: DeviceAddress::with_valid_crc([
                0x28, 0x8D, 0x2E, 0x8E, 0x05, 0x00, 0x00,
            ]),
            base_target: quantize_to_t16(50.0),
            outlet_idle_max: quantize_to_t16(50.0),
            max_delta: quantize_to_t16(35.0),
            min_delta: quantize_to_t16(4.0),
            flue_firing: quantize_to_t16(60.0),
            gap_limit: quantize_to_t16(64.0),
            cold_sentinel: i32::from(Temperature::INVALID.sixteenths()),
            inlet_penalty: 1,
            outlet_penalty: 1,
            fail_threshold: 5,
            regulator: RegulatorCfg {
                gain_p: 4,
                ..RegulatorCfg::default()
            },
        }
    }
}

/// Whole-plant runtime configuration.
#[derive(Debug, Clone)]
pub struct PlantCfg {
    pub cycle_ms: u64,
    pub max_devices: usize,
    pub read_retries: u32,
    pub convert_poll_limit: u32,
    pub relay_map: RelayMap,
    pub radiator: RadiatorCfg,
    pub boiler: BoilerCfg,
}

impl Default for PlantCfg {
    fn default() -> Self {
        Self {
            cycle_ms: 5000,
            max_devices: 8,
            read_retries: 5,
            convert_poll_limit: 1000,
            relay_map: RelayMap::default(),
            radiator: RadiatorCfg::default(),
            boiler: BoilerCfg::default(),
        }
    }
}

impl PlantCfg {
    /// Build the runtime config from a validated TOML config, parsing and
    /// CRC-checking the sensor addresses.
    pub fn from_toml(cfg: &heat_config::Config) -> Result<Self> {
        let radiator = RadiatorCfg {
            feed_sensor: parse_addr(&cfg.radiator.feed_sensor)
                .wrap_err("radiator.feed_sensor")?,
            indoor_sensor: parse_addr(&cfg.radiator.indoor_sensor)
                .wrap_err("radiator.indoor_sensor")?,
            outdoor_sensor: parse_addr(&cfg.radiator.outdoor_sensor)
                .wrap_err("radiator.outdoor_sensor")?,
            base_zero: quantize_to_t16(cfg.radiator.base_zero_c),
            outdoor_div: cfg.radiator.outdoor_div,
            indoor_gain: cfg.radiator.indoor_gain,
            target_min: quantize_to_t16(cfg.radiator.target_min_c),
            target_max: quantize_to_t16(cfg.radiator.target_max_c),
            indoor_target: quantize_to_t16(cfg.radiator.indoor_target_c),
            outdoor_default: quantize_to_t16(cfg.radiator.outdoor_default_c),
            fault_signature: quantize_to_t16(cfg.radiator.fault_signature_c),
            fault_plausible_above: quantize_to_t16(cfg.radiator.fault_plausible_above_c),
            fail_threshold: cfg.radiator.fail_threshold,
            regulator: RegulatorCfg::from_toml(&cfg.radiator.regulator),
        };
        let boiler = BoilerCfg {
            inlet_sensor: parse_addr(&cfg.boiler.inlet_sensor).wrap_err("boiler.inlet_sensor")?,
            outlet_sensor: parse_addr(&cfg.boiler.outlet_sensor)
                .wrap_err("boiler.outlet_sensor")?,
            base_target: quantize_to_t16(cfg.boiler.base_target_c),
            outlet_idle_max: quantize_to_t16(cfg.boiler.outlet_idle_max_c),
            max_delta: quantize_to_t16(cfg.boiler.max_delta_c),
            min_delta: quantize_to_t16(cfg.boiler.min_delta_c),
            flue_firing: quantize_to_t16(cfg.boiler.flue_firing_c),
            gap_limit: quantize_to_t16(cfg.boiler.gap_limit_c),
            cold_sentinel: i32::from(Temperature::INVALID.sixteenths()),
            inlet_penalty: cfg.boiler.inlet_penalty,
            outlet_penalty: cfg.boiler.outlet_penalty,
            fail_threshold: cfg.boiler.fail_threshold,
            regulator: RegulatorCfg::from_toml(&cfg.boiler.regulator),
        };
        Ok(Self {
            cycle_ms: cfg.cycle_ms,
            max_devices: cfg.bus.max_devices,
            read_retries: cfg.bus.read_retries,
            convert_poll_limit: cfg.bus.convert_poll_limit,
            relay_map: RelayMap {
                pump_bit: cfg.relay.pump_bit,
                boiler_up_bit: cfg.relay.boiler_up_bit,
                boiler_down_bit: cfg.relay.boiler_down_bit,
                radiator_up_bit: cfg.relay.radiator_up_bit,
                radiator_down_bit: cfg.relay.radiator_down_bit,
            },
            radiator,
            boiler,
        })
    }
}

fn parse_addr(s: &str) -> Result<DeviceAddress> {
    s.parse::<DeviceAddress>()
        .map_err(|e| eyre::Report::new(e))
}
