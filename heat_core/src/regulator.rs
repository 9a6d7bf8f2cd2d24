//! The shared control law: error in 1/16 °C to bounded valve drive in
//! signed milliseconds.
//!
//! One parameterized implementation covers both circuits; the historical
//! tuning variants differ only in the `RegulatorCfg` values.

use crate::config::RegulatorCfg;
use crate::fixed_point::avg2_round_nearest_i32;

/// Proportional/integral/derivative law with output saturation, integral
/// anti-windup, optional derivative smoothing and a large-error bypass.
///
/// Sign convention: positive error (too hot) drives a positive output
/// (close the valve); negative error drives negative output (open it).
#[derive(Debug, Clone)]
pub struct Regulator {
    cfg: RegulatorCfg,
    target: i32,
    prev_err: Option<i32>,
    integral: i32,
    derivative: i32,
    last_output: i32,
}

impl Regulator {
    pub fn new(cfg: RegulatorCfg, target: i32) -> Self {
        Self {
            cfg,
            target,
            prev_err: None,
            integral: 0,
            derivative: 0,
            last_output: 0,
        }
    }

    pub fn set_target(&mut self, target: i32) {
        self.target = target;
    }

    pub fn target(&self) -> i32 {
        self.target
    }

    pub fn cfg(&self) -> &RegulatorCfg {
        &self.cfg
    }

    /// Telemetry: current integral accumulator.
    pub fn integral(&self) -> i32 {
        self.integral
    }

    /// Telemetry: output of the most recent step.
    pub fn output(&self) -> i32 {
        self.last_output
    }

    /// Clear accumulated state; target and gains survive.
    pub fn reset(&mut self) {
        self.prev_err = None;
        self.integral = 0;
        self.derivative = 0;
        self.last_output = 0;
    }

    /// One control step.
    ///
    /// A gross deviation beyond `large_error` snaps straight to the bound,
    /// skipping P/I/D entirely; the same short-circuit applies when the
    /// smoothed derivative term alone would exceed half the output span.
    pub fn step(&mut self, current: i32) -> i32 {
        let err = current - self.target;

        if err > self.cfg.large_error {
            return self.snap(err, self.cfg.output_max);
        }
        if err < -self.cfg.large_error {
            return self.snap(err, self.cfg.output_min);
        }

        let i_div = self.cfg.integral_div.max(1);
        let i_limit = self.cfg.integral_limit_div.max(1);
        self.integral = (self.integral + self.cfg.gain_i * err / i_div).clamp(
            self.cfg.output_min / i_limit,
            self.cfg.output_max / i_limit,
        );

        let delta = err - self.prev_err.unwrap_or(err);
        let d_raw = self.cfg.gain_d * delta;
        let d_div = self.cfg.derivative_div.max(1);
        self.derivative += (d_raw - self.derivative) / d_div;

        let half_span = (self.cfg.output_max - self.cfg.output_min) / 2;
        if self.derivative > half_span {
            return self.snap(err, self.cfg.output_max);
        }
        if self.derivative < -half_span {
            return self.snap(err, self.cfg.output_min);
        }

        let mut out = (self.cfg.gain_p * err + self.integral + self.derivative)
            .clamp(self.cfg.output_min, self.cfg.output_max);
        if self.cfg.smooth_output {
            out = avg2_round_nearest_i32(out, self.last_output);
        }

        self.prev_err = Some(err);
        self.last_output = out;
        out
    }

    fn snap(&mut self, err: i32, bound: i32) -> i32 {
        self.prev_err = Some(err);
        self.last_output = bound;
        bound
    }
}
