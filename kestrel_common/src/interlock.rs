//! Interlock thresholds and fault classification for the E-Stop controller.
//!
//! All thresholds are expressed in control ticks. `timer_max` is the
//! saturation bound shared by every interlock timer; it must stay strictly
//! above every threshold it gates so a saturated timer can never falsely
//! re-arm a comparison.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Interlock section of the configuration file (ticks).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InterlockConfig {
    /// Saturation bound for all interlock timers.
    #[serde(default = "default_timer_max")]
    pub timer_max: u32,
    /// Dwell in E-Stop before axes are forced to lose home status.
    #[serde(default = "default_unhome_time")]
    pub unhome_time: u32,
    /// Delay after a reset before `machine_on` may go high.
    #[serde(default = "default_machine_on_time")]
    pub machine_on_time: u32,
    /// Settle window after startup / button release during which drive
    /// faults are treated as expected power-loss side effects.
    #[serde(default = "default_startup_time")]
    pub startup_time: u32,
    /// How long motor enables are held low at the start of a reset
    /// (forces a drive power cycle).
    #[serde(default = "default_disable_motor_time")]
    pub disable_motor_time: u32,
    /// Dwell after a reset request before latches are actually cleared.
    #[serde(default = "default_reset_time")]
    pub reset_time: u32,
}

fn default_timer_max() -> u32 {
    6000
}
fn default_unhome_time() -> u32 {
    100
}
fn default_machine_on_time() -> u32 {
    1100
}
fn default_startup_time() -> u32 {
    3000
}
fn default_disable_motor_time() -> u32 {
    100
}
fn default_reset_time() -> u32 {
    1000
}

impl Default for InterlockConfig {
    fn default() -> Self {
        Self {
            timer_max: default_timer_max(),
            unhome_time: default_unhome_time(),
            machine_on_time: default_machine_on_time(),
            startup_time: default_startup_time(),
            disable_motor_time: default_disable_motor_time(),
            reset_time: default_reset_time(),
        }
    }
}

impl InterlockConfig {
    /// Validate that the saturation bound dominates every threshold.
    pub fn validate(&self) -> Result<(), String> {
        let thresholds = [
            ("unhome_time", self.unhome_time),
            ("machine_on_time", self.machine_on_time),
            ("startup_time", self.startup_time),
            ("disable_motor_time", self.disable_motor_time),
            ("reset_time", self.reset_time),
        ];
        for (name, value) in thresholds {
            if value >= self.timer_max {
                return Err(format!(
                    "{name} ({value}) must be strictly below timer_max ({})",
                    self.timer_max
                ));
            }
        }
        if self.disable_motor_time >= self.reset_time {
            return Err(format!(
                "disable_motor_time ({}) must be below reset_time ({})",
                self.disable_motor_time, self.reset_time
            ));
        }
        if self.reset_time >= self.machine_on_time {
            return Err(format!(
                "reset_time ({}) must be below machine_on_time ({})",
                self.reset_time, self.machine_on_time
            ));
        }
        Ok(())
    }
}

bitflags! {
    /// Latched fault classes exposed by the interlock snapshot.
    ///
    /// Per-axis detail (which axis faulted) lives in the controller state;
    /// this is the class-level summary used for status reporting and tests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultClass: u8 {
        /// One or more motor-drive faults latched.
        const MOTOR_FAULT     = 0x01;
        /// One or more following errors latched.
        const FOLLOWING_ERROR = 0x02;
        /// Spindle drive reported a non-zero error code.
        const SPINDLE_CODE    = 0x04;
        /// Spindle modbus link unhealthy.
        const SPINDLE_MODBUS  = 0x08;
        /// Physical E-Stop button press latched.
        const BUTTON          = 0x10;
    }
}

impl Default for FaultClass {
    fn default() -> Self {
        Self::empty()
    }
}
