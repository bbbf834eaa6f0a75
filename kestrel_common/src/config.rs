//! Machine-level configuration: axis label set and cycle timing.
//!
//! The axis label set is an ordered list of single-character identifiers,
//! one per physical axis. All per-axis signals and diagnostics are named
//! after these labels.

use serde::{Deserialize, Serialize};

use crate::consts::{CYCLE_TIME_US, DEFAULT_AXES, MAX_AXES};

/// Machine section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineConfig {
    /// One character per axis, e.g. `"xyzbc"` for a 5-axis machine.
    #[serde(default = "default_axes")]
    pub axes: String,
    /// Control cycle period [µs]. Informational to the logic — timers
    /// count ticks, not wall time.
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u64,
}

fn default_axes() -> String {
    DEFAULT_AXES.to_string()
}

fn default_cycle_time_us() -> u64 {
    CYCLE_TIME_US
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            axes: default_axes(),
            cycle_time_us: default_cycle_time_us(),
        }
    }
}

impl MachineConfig {
    /// Axis labels as an ordered char list.
    pub fn axis_labels(&self) -> Vec<char> {
        self.axes.chars().collect()
    }

    /// Number of configured axes.
    #[inline]
    pub fn axis_count(&self) -> usize {
        self.axes.chars().count()
    }

    /// Validate axis count bounds and label uniqueness.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.axis_count();
        if n == 0 || n > MAX_AXES {
            return Err(format!(
                "axis count {n} out of bounds (expected 1..={MAX_AXES})"
            ));
        }
        let labels = self.axis_labels();
        for (i, a) in labels.iter().enumerate() {
            if !a.is_ascii_alphabetic() {
                return Err(format!("axis label '{a}' is not ASCII alphabetic"));
            }
            if labels[..i].contains(a) {
                return Err(format!("duplicate axis label '{a}'"));
            }
        }
        if self.cycle_time_us == 0 {
            return Err("cycle_time_us must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_five_axis() {
        let cfg = MachineConfig::default();
        assert_eq!(cfg.axis_count(), 5);
        assert_eq!(cfg.axis_labels(), vec!['x', 'y', 'z', 'b', 'c']);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn empty_axes_rejected() {
        let cfg = MachineConfig {
            axes: String::new(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn too_many_axes_rejected() {
        let cfg = MachineConfig {
            axes: "abcdefghij".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn duplicate_label_rejected() {
        let cfg = MachineConfig {
            axes: "xyx".to_string(),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_cycle_time_rejected() {
        let cfg = MachineConfig {
            cycle_time_us: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
