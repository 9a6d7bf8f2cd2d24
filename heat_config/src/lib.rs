#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the heating-plant controller.
//!
//! Deserialized from TOML and validated here; unit conversion to the
//! core's fixed-point representation (and device-address CRC checking)
//! happens in `heat_core::config` when the runtime config is built.
//! Temperatures are plain °C floats, valve drive bounds are milliseconds,
//! sensor addresses are colon-separated hex strings.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Nominal control cycle period in milliseconds.
    #[serde(default = "default_cycle_ms")]
    pub cycle_ms: u64,
    #[serde(default)]
    pub bus: BusCfg,
    #[serde(default)]
    pub relay: RelayCfg,
    #[serde(default)]
    pub pins: Pins,
    pub radiator: RadiatorCfg,
    pub boiler: BoilerCfg,
    #[serde(default)]
    pub logging: Logging,
}

fn default_cycle_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusCfg {
    /// Upper bound on devices enumerated per cycle.
    pub max_devices: usize,
    /// Scratchpad read attempts per sensor per cycle.
    pub read_retries: u32,
    /// Upper bound on conversion-done polls.
    pub convert_poll_limit: u32,
}

impl Default for BusCfg {
    fn default() -> Self {
        Self {
            max_devices: 8,
            read_retries: 5,
            convert_poll_limit: 1000,
        }
    }
}

/// Relay-byte bit assignments. The byte is shared by both circuits and
/// written to the driver peripheral as its bitwise complement.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayCfg {
    pub pump_bit: u8,
    pub boiler_up_bit: u8,
    pub boiler_down_bit: u8,
    pub radiator_up_bit: u8,
    pub radiator_down_bit: u8,
}

impl Default for RelayCfg {
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

/// BCM pin numbers and bus wiring for the hardware backends. Ignored by
/// simulated runs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    /// Single-wire sensor bus data line.
    pub bus: u8,
    /// Thermocouple converter clock, chip-select and data-out pins.
    pub tc_clk: u8,
    pub tc_cs: u8,
    pub tc_miso: u8,
    /// I2C address of the relay-driver port expander.
    pub relay_i2c_addr: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            bus: 4,
            tc_clk: 11,
            tc_cs: 8,
            tc_miso: 9,
            relay_i2c_addr: 0x20,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RadiatorCfg {
    /// Feed, indoor and outdoor sensor ROMs ("28:D9:F8:D5:03:00:00:B0").
    pub feed_sensor: String,
    pub indoor_sensor: String,
    pub outdoor_sensor: String,

    /// Base feed target at 0 °C outdoors.
    #[serde(default = "default_base_zero_c")]
    pub base_zero_c: f32,
    /// Outdoor contribution divisor (target rises by 1/div per degree of frost).
    #[serde(default = "default_outdoor_div")]
    pub outdoor_div: i32,
    /// Gain on the indoor target/actual difference.
    #[serde(default = "default_indoor_gain")]
    pub indoor_gain: i32,
    #[serde(default = "default_target_min_c")]
    pub target_min_c: f32,
    #[serde(default = "default_target_max_c")]
    pub target_max_c: f32,
    #[serde(default = "default_indoor_target_c")]
    pub indoor_target_c: f32,
    /// Assumed outdoor temperature when the sensor is silent (winter average).
    #[serde(default = "default_outdoor_default_c")]
    pub outdoor_default_c: f32,
    /// Power-on reset signature the feed sensor emits under marginal supply.
    #[serde(default = "default_fault_signature_c")]
    pub fault_signature_c: f32,
    /// Above this tracked value the signature is treated as a real reading.
    #[serde(default = "default_fault_plausible_above_c")]
    pub fault_plausible_above_c: f32,
    #[serde(default = "default_fail_threshold")]
    pub fail_threshold: u8,
    #[serde(default = "RegulatorCfg::radiator_preset")]
    pub regulator: RegulatorCfg,
}

fn default_base_zero_c() -> f32 {
    40.0
}
fn default_outdoor_div() -> i32 {
    2
}
fn default_indoor_gain() -> i32 {
    4
}
fn default_target_min_c() -> f32 {
    22.0
}
fn default_target_max_c() -> f32 {
    70.0
}
fn default_indoor_target_c() -> f32 {
    22.0
}
fn default_outdoor_default_c() -> f32 {
    -5.0
}
fn default_fault_signature_c() -> f32 {
    85.0
}
fn default_fault_plausible_above_c() -> f32 {
    60.0
}
fn default_fail_threshold() -> u8 {
    5
}

#[derive(Debug, Deserialize)]
pub struct BoilerCfg {
    /// Inlet and outlet sensor ROMs.
    pub inlet_sensor: String,
    pub outlet_sensor: String,

    /// Inlet target floor while the boiler runs.
    #[serde(default = "default_boiler_target_c")]
    pub base_target_c: f32,
    /// Outlet bound below which the boiler counts as idle.
    #[serde(default = "default_outlet_idle_max_c")]
    pub outlet_idle_max_c: f32,
    #[serde(default = "default_max_delta_c")]
    pub max_delta_c: f32,
    #[serde(default = "default_min_delta_c")]
    pub min_delta_c: f32,
    /// Flue temperature at or above which the burner counts as firing.
    #[serde(default = "default_flue_firing_c")]
    pub flue_firing_c: f32,
    /// Largest physically plausible inlet/outlet gap.
    #[serde(default = "default_gap_limit_c")]
    pub gap_limit_c: f32,
    /// Fault ticks for a cycle with no fresh inlet reading.
    #[serde(default = "default_penalty")]
    pub inlet_penalty: u8,
    /// Fault ticks for a cycle with no fresh outlet reading.
    #[serde(default = "default_penalty")]
    pub outlet_penalty: u8,
    #[serde(default = "default_fail_threshold")]
    pub fail_threshold: u8,
    #[serde(default = "RegulatorCfg::boiler_preset")]
    pub regulator: RegulatorCfg,
}

fn default_boiler_target_c() -> f32 {
    50.0
}
fn default_outlet_idle_max_c() -> f32 {
    50.0
}
fn default_max_delta_c() -> f32 {
    35.0
}
fn default_min_delta_c() -> f32 {
    4.0
}
fn default_flue_firing_c() -> f32 {
    60.0
}
fn default_gap_limit_c() -> f32 {
    64.0
}
fn default_penalty() -> u8 {
    1
}

/// Regulator tuning. The divisors are deliberately configuration, not
/// constants: the deployed plants disagreed on them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegulatorCfg {
    pub gain_p: i32,
    pub gain_i: i32,
    pub gain_d: i32,
    /// Valve drive bounds in signed milliseconds per cycle.
    pub output_max_ms: i32,
    pub output_min_ms: i32,
    /// Error beyond this (°C) bypasses the law and slams the bound.
    pub large_error_c: f32,
    /// Scale-down applied when accumulating the integral term.
    pub integral_div: i32,
    /// Integral clamp is `[output_min, output_max] / integral_limit_div`.
    pub integral_limit_div: i32,
    /// Exponential smoothing divisor for the derivative term; 1 disables.
    pub derivative_div: i32,
    /// Average each output with the previous one.
    pub smooth_output: bool,
}

impl Default for RegulatorCfg {
    fn default() -> Self {
        Self {
            gain_p: 2,
            gain_i: 1,
            gain_d: 0,
            output_max_ms: 4000,
            output_min_ms: -4000,
            large_error_c: 8.0,
            integral_div: 16,
            integral_limit_div: 4,
            derivative_div: 2,
            smooth_output: false,
        }
    }
}

impl RegulatorCfg {
    fn radiator_preset() -> Self {
        Self::default()
    }

    fn boiler_preset() -> Self {
        Self {
            gain_p: 4,
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    /// Path to a JSON-lines log file.
    pub file: Option<String>,
    /// "info", "debug", ...
    pub level: Option<String>,
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never).
    pub rotation: Option<String>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Shape check for an address string: 8 colon-separated hex byte pairs.
/// CRC validation happens in the core where the CRC lives.
fn address_shape_ok(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    parts.len() == 8
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        if self.cycle_ms == 0 {
            eyre::bail!("cycle_ms must be >= 1");
        }
        if self.cycle_ms > 60 * 60 * 1000 {
            eyre::bail!("cycle_ms is unreasonably large (>1h)");
        }

        // Bus
        if self.bus.max_devices == 0 || self.bus.max_devices > 64 {
            eyre::bail!("bus.max_devices must be in [1, 64]");
        }
        if self.bus.read_retries == 0 {
            eyre::bail!("bus.read_retries must be >= 1");
        }
        if self.bus.convert_poll_limit == 0 {
            eyre::bail!("bus.convert_poll_limit must be >= 1");
        }

        // Relay bits: all in one byte, no sharing
        let bits = [
            self.relay.pump_bit,
            self.relay.boiler_up_bit,
            self.relay.boiler_down_bit,
            self.relay.radiator_up_bit,
            self.relay.radiator_down_bit,
        ];
        for b in bits {
            if b > 7 {
                eyre::bail!("relay bit assignments must be in [0, 7]");
            }
        }
        for i in 0..bits.len() {
            for j in (i + 1)..bits.len() {
                if bits[i] == bits[j] {
                    eyre::bail!("relay bit {} is assigned twice", bits[i]);
                }
            }
        }

        if self.pins.relay_i2c_addr > 0x7F {
            eyre::bail!("pins.relay_i2c_addr must be a 7-bit address");
        }

        // Addresses (shape only)
        for (name, addr) in [
            ("radiator.feed_sensor", &self.radiator.feed_sensor),
            ("radiator.indoor_sensor", &self.radiator.indoor_sensor),
            ("radiator.outdoor_sensor", &self.radiator.outdoor_sensor),
            ("boiler.inlet_sensor", &self.boiler.inlet_sensor),
            ("boiler.outlet_sensor", &self.boiler.outlet_sensor),
        ] {
            if !address_shape_ok(addr) {
                eyre::bail!("{name} must be 8 colon-separated hex bytes, got {addr:?}");
            }
        }

        // Radiator
        if self.radiator.outdoor_div == 0 {
            eyre::bail!("radiator.outdoor_div must be non-zero");
        }
        if self.radiator.target_min_c >= self.radiator.target_max_c {
            eyre::bail!("radiator.target_min_c must be below target_max_c");
        }
        if self.radiator.fail_threshold == 0 {
            eyre::bail!("radiator.fail_threshold must be >= 1");
        }
        validate_regulator("radiator.regulator", &self.radiator.regulator)?;

        // Boiler
        if self.boiler.min_delta_c <= 0.0 {
            eyre::bail!("boiler.min_delta_c must be > 0");
        }
        if self.boiler.max_delta_c <= self.boiler.min_delta_c {
            eyre::bail!("boiler.max_delta_c must exceed min_delta_c");
        }
        if self.boiler.gap_limit_c <= 0.0 {
            eyre::bail!("boiler.gap_limit_c must be > 0");
        }
        if self.boiler.inlet_penalty == 0 && self.boiler.outlet_penalty == 0 {
            eyre::bail!("at least one of boiler.inlet_penalty/outlet_penalty must be >= 1");
        }
        if self.boiler.fail_threshold == 0 {
            eyre::bail!("boiler.fail_threshold must be >= 1");
        }
        validate_regulator("boiler.regulator", &self.boiler.regulator)?;

        // Temperatures must be representable
        for (name, v) in [
            ("radiator.base_zero_c", self.radiator.base_zero_c),
            ("radiator.target_min_c", self.radiator.target_min_c),
            ("radiator.target_max_c", self.radiator.target_max_c),
            ("radiator.indoor_target_c", self.radiator.indoor_target_c),
            ("radiator.outdoor_default_c", self.radiator.outdoor_default_c),
            ("radiator.fault_signature_c", self.radiator.fault_signature_c),
            (
                "radiator.fault_plausible_above_c",
                self.radiator.fault_plausible_above_c,
            ),
            ("boiler.base_target_c", self.boiler.base_target_c),
            ("boiler.outlet_idle_max_c", self.boiler.outlet_idle_max_c),
            ("boiler.max_delta_c", self.boiler.max_delta_c),
            ("boiler.min_delta_c", self.boiler.min_delta_c),
            ("boiler.flue_firing_c", self.boiler.flue_firing_c),
            ("boiler.gap_limit_c", self.boiler.gap_limit_c),
        ] {
            if !v.is_finite() || !(-200.0..=1200.0).contains(&v) {
                eyre::bail!("{name} is out of range: {v}");
            }
        }

        Ok(())
    }
}

fn validate_regulator(name: &str, r: &RegulatorCfg) -> eyre::Result<()> {
    if r.output_min_ms >= r.output_max_ms {
        eyre::bail!("{name}.output_min_ms must be below output_max_ms");
    }
    if r.output_max_ms <= 0 || r.output_min_ms >= 0 {
        eyre::bail!("{name} output bounds must straddle zero");
    }
    if !r.large_error_c.is_finite() || r.large_error_c <= 0.0 {
        eyre::bail!("{name}.large_error_c must be > 0");
    }
    if r.integral_div < 1 {
        eyre::bail!("{name}.integral_div must be >= 1");
    }
    if r.integral_limit_div < 1 {
        eyre::bail!("{name}.integral_limit_div must be >= 1");
    }
    if r.derivative_div < 1 {
        eyre::bail!("{name}.derivative_div must be >= 1");
    }
    if r.gain_p < 0 || r.gain_i < 0 || r.gain_d < 0 {
        eyre::bail!("{name} gains must be non-negative");
    }
    Ok(())
}
