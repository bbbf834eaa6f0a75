//! Per-axis torque/fault monitor.
//!
//! Decodes the drive's PWM feedback into a torque percentage and a fault
//! bit. Duty inside the informative band maps piecewise to torque (below
//! 0.5 the drive is loaded in the negative direction, above in the
//! positive); duty pinned outside the band or a carrier frequency far from
//! nominal means the drive is flagging a fault on its feedback line, not
//! reporting torque. The fault bit is debounced so a single noisy sample
//! never trips the interlock.

use kestrel_common::torque::TorqueConfig;
use tracing::warn;

use crate::primitives::Timer;

/// One decoded feedback sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueSample {
    /// Normalized torque magnitude, scaled by the configured ratio.
    pub torque: f64,
    /// Debounced drive-fault bit. Consumed by the interlock as raw input.
    pub fault: bool,
}

/// Per-axis monitor state.
#[derive(Debug, Clone)]
pub struct TorqueMonitor {
    label: char,
    config: TorqueConfig,
    /// Consecutive out-of-band / off-carrier samples.
    saturated: Timer,
    fault: bool,
}

impl TorqueMonitor {
    pub fn new(label: char, config: TorqueConfig) -> Self {
        Self {
            label,
            config,
            // Debounce counter only needs to reach the threshold; clamp there.
            saturated: Timer::new(config.fault_debounce),
            fault: false,
        }
    }

    /// Axis label this monitor reports under.
    #[inline]
    pub const fn label(&self) -> char {
        self.label
    }

    /// Current debounced fault state.
    #[inline]
    pub const fn faulted(&self) -> bool {
        self.fault
    }

    /// Feed one duty-cycle/frequency sample. Called once per tick.
    pub fn update(&mut self, duty_cycle: f64, frequency: f64) -> TorqueSample {
        let cfg = &self.config;

        let in_band = duty_cycle >= cfg.band_low && duty_cycle <= cfg.band_high;
        let carrier_ok =
            (frequency - cfg.nominal_frequency).abs() <= cfg.nominal_frequency * cfg.frequency_tolerance;

        if in_band && carrier_ok {
            self.saturated.reset();
        } else {
            self.saturated.tick(true);
        }

        let was_faulted = self.fault;
        self.fault = self.saturated.value() >= cfg.fault_debounce;
        if self.fault && !was_faulted {
            warn!(
                "torque: axis {} feedback saturated (duty {:.3}, carrier {:.1} Hz)",
                self.label, duty_cycle, frequency
            );
        }

        let torque = if in_band {
            let t = if duty_cycle < 0.5 {
                1.0 - (duty_cycle - cfg.band_low) / (0.5 - cfg.band_low)
            } else {
                (duty_cycle - 0.5) / (cfg.band_high - 0.5)
            };
            cfg.ratio * t
        } else {
            0.0
        };

        TorqueSample {
            torque,
            fault: self.fault,
        }
    }
}
