//! Torque/fault monitor parameters.
//!
//! The servo drives report torque as a PWM duty cycle on their feedback
//! line. Duty inside the informative band maps to a torque percentage;
//! duty pinned outside the band, or a dead/off-nominal carrier frequency,
//! means the drive is signalling a fault rather than a torque.

use serde::{Deserialize, Serialize};

/// Torque section of the configuration file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TorqueConfig {
    /// Lower edge of the informative duty band.
    #[serde(default = "default_band_low")]
    pub band_low: f64,
    /// Upper edge of the informative duty band.
    #[serde(default = "default_band_high")]
    pub band_high: f64,
    /// Nominal PWM carrier frequency [Hz].
    #[serde(default = "default_nominal_frequency")]
    pub nominal_frequency: f64,
    /// Allowed carrier deviation as a fraction of nominal.
    #[serde(default = "default_frequency_tolerance")]
    pub frequency_tolerance: f64,
    /// Consecutive out-of-band samples before the fault bit asserts [ticks].
    #[serde(default = "default_fault_debounce")]
    pub fault_debounce: u32,
    /// Output scale applied to the normalized torque.
    #[serde(default = "default_ratio")]
    pub ratio: f64,
}

fn default_band_low() -> f64 {
    0.05
}
fn default_band_high() -> f64 {
    0.95
}
fn default_nominal_frequency() -> f64 {
    45.0
}
fn default_frequency_tolerance() -> f64 {
    0.2
}
fn default_fault_debounce() -> u32 {
    10
}
fn default_ratio() -> f64 {
    1.0
}

impl Default for TorqueConfig {
    fn default() -> Self {
        Self {
            band_low: default_band_low(),
            band_high: default_band_high(),
            nominal_frequency: default_nominal_frequency(),
            frequency_tolerance: default_frequency_tolerance(),
            fault_debounce: default_fault_debounce(),
            ratio: default_ratio(),
        }
    }
}

impl TorqueConfig {
    /// Validate band and carrier parameters.
    pub fn validate(&self) -> Result<(), String> {
        // The torque map pivots at 0.5, so the band must straddle it.
        if !(0.0..0.5).contains(&self.band_low) || !(self.band_high > 0.5 && self.band_high <= 1.0)
        {
            return Err(format!(
                "duty band [{}, {}] must satisfy 0 <= low < 0.5 < high <= 1",
                self.band_low, self.band_high
            ));
        }
        if self.nominal_frequency <= 0.0 {
            return Err("nominal_frequency must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.frequency_tolerance) {
            return Err("frequency_tolerance must be in [0, 1)".to_string());
        }
        if self.fault_debounce == 0 {
            return Err("fault_debounce must be non-zero".to_string());
        }
        Ok(())
    }
}
