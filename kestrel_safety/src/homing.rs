//! Per-axis hard-stop homing sequencer.
//!
//! The servo drives home by jogging into a mechanical stop: power-cycle
//! the drive, jog until the feedback signal reads stationary long enough,
//! then hand the result to the downstream motion layer via a trigger-home
//! pulse. One `AxisSequencer` per configured axis, advanced once per tick.
//!
//! The new state is computed first; outputs are a pure function of the new
//! state, never the old one. Loss of the machine-on precondition forces
//! `Unpowered` from any state on the same tick — that is the safety
//! property this automaton exists for.

use kestrel_common::homing::HomingConfig;
use tracing::debug;

use crate::primitives::Timer;

/// Hard-stop homing states, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingState {
    /// Machine power absent. Every output held low.
    Unpowered,
    /// Powered, idle, waiting for a start request.
    Powered,
    /// Drive de-energizing before the homing run.
    CyclePowerOff,
    /// Drive re-energizing.
    CyclePowerOn,
    /// One-tick ramp into the homing jog.
    BeginHoming,
    /// Jogging into the hard stop, watching for standstill.
    Homing,
    /// Standstill confirmed, letting the axis settle.
    StopMoving,
    /// Holding the trigger-home pulse for the motion layer.
    Homed,
    /// Homing complete.
    Ready,
}

/// Per-axis homing signal block.
///
/// Inputs are host-written; outputs are sequencer-written. `start_homing`
/// is in/out — the sequencer clears it when the request is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomingIo {
    // ── Inputs ──
    /// Machine power gate (from the interlock's previous tick).
    pub machine_on: bool,
    /// Begin a homing cycle. Cleared by the sequencer.
    pub start_homing: bool,
    /// Drive feedback; exactly zero means the axis is stationary.
    pub feedback: f64,
    /// Reserved for the switch-then-offset homing variant.
    pub home_switch: bool,
    // ── Outputs ──
    /// Pulse to the downstream homing consumer.
    pub trigger_home: bool,
    /// Axis has a valid home position.
    pub homed: bool,
    /// A homing cycle is in progress.
    pub homing: bool,
    /// Axis is being jogged by the sequencer.
    pub moving: bool,
    /// Commanded jog speed.
    pub speed: f64,
    /// Axis drive enable.
    pub enable: bool,
}

/// Per-axis homing sequencer.
#[derive(Debug, Clone)]
pub struct AxisSequencer {
    label: char,
    config: HomingConfig,
    state: HomingState,
    /// Ticks spent in the current state.
    dwell: Timer,
    /// Consecutive stationary feedback samples while homing.
    stopped: Timer,
}

impl AxisSequencer {
    /// Create a sequencer in `Unpowered`.
    ///
    /// The config must have passed validation: only the hard-stop variant
    /// reaches here.
    pub fn new(label: char, config: HomingConfig) -> Self {
        let max_dwell = config
            .power_cycle_dwell
            .max(config.stop_dwell)
            .max(config.homed_dwell);
        Self {
            label,
            state: HomingState::Unpowered,
            dwell: Timer::new(max_dwell),
            stopped: Timer::new(config.stopped_debounce),
            config,
        }
    }

    /// Axis label.
    #[inline]
    pub const fn label(&self) -> char {
        self.label
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> HomingState {
        self.state
    }

    /// Advance one control tick.
    pub fn update(&mut self, io: &mut HomingIo) {
        use HomingState::*;

        let cfg = &self.config;
        let prev = self.state;
        let mut next = prev;

        if io.machine_on {
            match prev {
                Unpowered => next = Powered,
                Powered => {
                    if io.start_homing {
                        next = CyclePowerOff;
                    }
                }
                CyclePowerOff => {
                    if self.dwell.value() >= cfg.power_cycle_dwell {
                        next = CyclePowerOn;
                    }
                }
                CyclePowerOn => {
                    if self.dwell.value() >= cfg.power_cycle_dwell {
                        next = BeginHoming;
                        self.stopped.reset();
                    }
                }
                BeginHoming => next = Homing,
                Homing => {
                    // Debounced standstill: this tick's sample counts, and
                    // any motion restarts the window.
                    if io.feedback == 0.0 {
                        self.stopped.tick(true);
                    } else {
                        self.stopped.reset();
                    }
                    if self.stopped.value() >= cfg.stopped_debounce {
                        next = StopMoving;
                    }
                }
                StopMoving => {
                    if self.dwell.value() >= cfg.stop_dwell {
                        next = Homed;
                    }
                }
                Homed => {
                    if self.dwell.value() >= cfg.homed_dwell {
                        next = Ready;
                    }
                }
                Ready => {
                    if io.start_homing {
                        next = CyclePowerOff;
                    }
                }
            }
        } else {
            // Power loss always wins, mid-dwell or not.
            next = Unpowered;
        }

        if next != prev {
            self.dwell.reset();
            debug!("homing {}: {:?} -> {:?}", self.label, prev, next);
        } else {
            self.dwell.tick(true);
        }
        self.state = next;

        // Outputs are a pure function of the new state.
        io.trigger_home = false;
        io.homed = false;
        io.homing = false;
        io.moving = false;
        io.speed = 0.0;
        io.enable = false;
        match next {
            Unpowered => {}
            Powered => io.enable = true,
            CyclePowerOff => {
                io.homing = true;
                // Request accepted; the in/out bit clears itself.
                io.start_homing = false;
            }
            CyclePowerOn => {
                io.homing = true;
                io.enable = true;
            }
            BeginHoming | Homing => {
                io.homing = true;
                io.moving = true;
                io.speed = cfg.jog_speed;
                io.enable = true;
            }
            StopMoving => {
                io.homing = true;
                io.enable = true;
            }
            Homed => {
                io.trigger_home = true;
                io.enable = true;
            }
            Ready => {
                io.homed = true;
                io.enable = true;
            }
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
