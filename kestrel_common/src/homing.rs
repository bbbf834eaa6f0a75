//! Homing sequencer types and parameters.
//!
//! Defines `HomingType` and `HomingConfig`. The hard-stop sequence jogs the
//! axis into its mechanical stop and detects standstill from the drive's
//! feedback signal; the switch-then-offset `Angle` variant is declared but
//! not yet supported and is rejected at configuration time.

use serde::{Deserialize, Serialize};

/// Homing sequence variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HomingType {
    /// Jog into the mechanical hard stop, detect standstill.
    HardStop = 0,
    /// Home to a switch, then move to a specific angle. Reserved.
    Angle = 1,
}

impl HomingType {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::HardStop),
            1 => Some(Self::Angle),
            _ => None,
        }
    }

    /// Whether this variant has a sequencer implementation.
    #[inline]
    pub const fn is_supported(&self) -> bool {
        matches!(self, Self::HardStop)
    }
}

impl Default for HomingType {
    fn default() -> Self {
        Self::HardStop
    }
}

/// Homing section of the configuration file.
///
/// Dwells and debounce windows are in control ticks; one config applies to
/// every axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomingConfig {
    /// Homing variant.
    #[serde(default, rename = "type")]
    pub homing_type: HomingType,
    /// Dwell in each power-cycle state (off, then on) [ticks].
    #[serde(default = "default_power_cycle_dwell")]
    pub power_cycle_dwell: u32,
    /// Dwell in the stop-moving state before declaring homed [ticks].
    #[serde(default = "default_stop_dwell")]
    pub stop_dwell: u32,
    /// Consecutive zero-feedback samples required to call the axis
    /// stationary [ticks].
    #[serde(default = "default_stopped_debounce")]
    pub stopped_debounce: u32,
    /// Dwell in the homed state, holding the trigger-home pulse [ticks].
    #[serde(default = "default_homed_dwell")]
    pub homed_dwell: u32,
    /// Jog speed commanded while driving toward the hard stop.
    #[serde(default = "default_jog_speed")]
    pub jog_speed: f64,
}

fn default_power_cycle_dwell() -> u32 {
    10
}
fn default_stop_dwell() -> u32 {
    10
}
fn default_stopped_debounce() -> u32 {
    1000
}
fn default_homed_dwell() -> u32 {
    500
}
fn default_jog_speed() -> f64 {
    5.0
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            homing_type: HomingType::HardStop,
            power_cycle_dwell: default_power_cycle_dwell(),
            stop_dwell: default_stop_dwell(),
            stopped_debounce: default_stopped_debounce(),
            homed_dwell: default_homed_dwell(),
            jog_speed: default_jog_speed(),
        }
    }
}

impl HomingConfig {
    /// Reject unsupported variants and nonsensical parameters at setup.
    pub fn validate(&self) -> Result<(), String> {
        if !self.homing_type.is_supported() {
            return Err(format!(
                "homing type {:?} is not supported yet",
                self.homing_type
            ));
        }
        if self.power_cycle_dwell == 0 || self.stop_dwell == 0 || self.homed_dwell == 0 {
            return Err("homing dwells must be non-zero".to_string());
        }
        if self.stopped_debounce == 0 {
            return Err("stopped_debounce must be non-zero".to_string());
        }
        if self.jog_speed <= 0.0 {
            return Err(format!("jog_speed must be positive, got {}", self.jog_speed));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homing_type_roundtrip() {
        for v in 0..=1u8 {
            let t = HomingType::from_u8(v).unwrap();
            assert_eq!(t as u8, v);
        }
        assert!(HomingType::from_u8(2).is_none());
    }

    #[test]
    fn defaults_validate() {
        assert!(HomingConfig::default().validate().is_ok());
    }

    #[test]
    fn angle_rejected_at_setup() {
        let cfg = HomingConfig {
            homing_type: HomingType::Angle,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_dwell_rejected() {
        let cfg = HomingConfig {
            power_cycle_dwell: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_jog_speed_rejected() {
        let cfg = HomingConfig {
            jog_speed: -1.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn type_field_parses_from_toml() {
        let cfg: HomingConfig = toml::from_str("type = \"hard_stop\"").unwrap();
        assert_eq!(cfg.homing_type, HomingType::HardStop);
        let cfg: HomingConfig = toml::from_str("type = \"angle\"").unwrap();
        assert_eq!(cfg.homing_type, HomingType::Angle);
    }
}
