//! Safety interlock (E-Stop) controller.
//!
//! Aggregates per-axis drive faults, following errors, spindle health and
//! the physical E-Stop button into one global emergency-stop decision,
//! and sequences the time-gated reset that is the only way out of it.
//!
//! This is not a classical state machine: `estop` is re-derived every tick
//! from latched memory, while three concurrent strands share the tick —
//! fault aggregation into latches, button edge tracking, and the staged
//! reset sequence. The drives report faults whenever their power is cut,
//! so expected power-loss windows (button pressed, startup, mid-reset)
//! mask the motor and spindle fault paths. Following errors and the
//! button itself are never masked.
//!
//! Timers are read before being advanced; all four advance at the end of
//! the tick, saturating at `timer_max`.

use heapless::Vec;
use kestrel_common::consts::MAX_AXES;
use kestrel_common::interlock::{FaultClass, InterlockConfig};
use tracing::{error, info};

use crate::primitives::{Latch, Timer};

// ─── I/O Structs ────────────────────────────────────────────────────

/// Raw interlock inputs, sampled once per tick.
#[derive(Debug, Clone, Copy)]
pub struct InterlockInputs {
    /// Per-axis drive fault (from the torque monitors).
    pub motor_fault: [bool; MAX_AXES],
    /// Per-axis following error (from the motion controller).
    pub following_error: [bool; MAX_AXES],
    /// Spindle drive error code, 0 = healthy.
    pub spindle_error_code: i32,
    /// Spindle modbus link health.
    pub spindle_modbus_ok: bool,
    /// Physical E-Stop button (true = pressed).
    pub estop_button: bool,
    /// Suppress motor/spindle communication faults (commissioning aid).
    pub ignore_com_errors: bool,
    /// Host-side enable permission.
    pub user_enable: bool,
    /// User clicked the E-Stop reset control.
    pub user_request_enable: bool,
}

impl Default for InterlockInputs {
    fn default() -> Self {
        Self {
            motor_fault: [false; MAX_AXES],
            following_error: [false; MAX_AXES],
            spindle_error_code: 0,
            spindle_modbus_ok: true,
            estop_button: false,
            ignore_com_errors: false,
            user_enable: false,
            user_request_enable: false,
        }
    }
}

/// Interlock outputs, published once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterlockOutputs {
    /// False while in E-Stop. Drives the host's enable chain.
    pub emc_enable: bool,
    /// Latched echo of the reset request; high while a reset is in flight.
    pub user_requested_enable: bool,
    /// Machine-on, delayed after reset so the host registers the edge.
    pub machine_on: bool,
    /// Per-axis motor enable. Cycled low/high during reset to clear
    /// drive-side fault states.
    pub motor_enable: [bool; MAX_AXES],
    /// Power relay output. Reserved, held high.
    pub power: bool,
    /// Force axes to lose home status after a sustained E-Stop.
    pub unhome: bool,
}

// ─── Controller ─────────────────────────────────────────────────────

/// Safety interlock controller state. One instance per machine,
/// caller-allocated, mutated only by its own `update`.
#[derive(Debug)]
pub struct Interlock {
    config: InterlockConfig,
    labels: Vec<char, MAX_AXES>,

    // Latched fault memory. Cleared only by the reset sequence.
    motor_faulted: [Latch; MAX_AXES],
    following_errored: [Latch; MAX_AXES],
    /// First non-zero spindle error code seen, 0 while clear.
    spindle_code: i32,
    spindle_modbus_bad: Latch,
    button_pushed: Latch,
    button_released: Latch,

    /// Re-derived estop decision and its latched companion.
    estop: bool,
    estopped: bool,
    /// Sticky reset-in-flight flag; self-clears when the dwell elapses.
    reset_requested: bool,

    since_enable_request: Timer,
    since_estop_entry: Timer,
    since_startup: Timer,
    since_button_release: Timer,

    /// Motor enables hold their last commanded value outside a reset.
    motor_enable: [bool; MAX_AXES],
}

impl Interlock {
    /// Create a controller for the given axis label set.
    pub fn new(labels: &[char], config: InterlockConfig) -> Self {
        let mut set = Vec::new();
        for &l in labels.iter().take(MAX_AXES) {
            let _ = set.push(l);
        }
        Self {
            config,
            labels: set,
            motor_faulted: [Latch::new(); MAX_AXES],
            following_errored: [Latch::new(); MAX_AXES],
            spindle_code: 0,
            spindle_modbus_bad: Latch::new(),
            button_pushed: Latch::new(),
            button_released: Latch::new(),
            estop: false,
            estopped: false,
            reset_requested: false,
            since_enable_request: Timer::new(config.timer_max),
            since_estop_entry: Timer::new(config.timer_max),
            since_startup: Timer::new(config.timer_max),
            since_button_release: Timer::new(config.timer_max),
            // Drives boot enabled; the first reset cycles them.
            motor_enable: [true; MAX_AXES],
        }
    }

    /// Number of configured axes.
    #[inline]
    pub fn axis_count(&self) -> usize {
        self.labels.len()
    }

    /// Current estop decision.
    #[inline]
    pub const fn estop(&self) -> bool {
        self.estop
    }

    /// Latched estop state (survives the transient decision).
    #[inline]
    pub const fn estopped(&self) -> bool {
        self.estopped
    }

    /// Whether a reset sequence is in flight.
    #[inline]
    pub const fn reset_in_flight(&self) -> bool {
        self.reset_requested
    }

    /// Class-level summary of the latched faults.
    pub fn fault_classes(&self) -> FaultClass {
        let n = self.axis_count();
        let mut classes = FaultClass::empty();
        if self.motor_faulted[..n].iter().any(|l| l.latched()) {
            classes |= FaultClass::MOTOR_FAULT;
        }
        if self.following_errored[..n].iter().any(|l| l.latched()) {
            classes |= FaultClass::FOLLOWING_ERROR;
        }
        if self.spindle_code != 0 {
            classes |= FaultClass::SPINDLE_CODE;
        }
        if self.spindle_modbus_bad.latched() {
            classes |= FaultClass::SPINDLE_MODBUS;
        }
        if self.button_pushed.latched() {
            classes |= FaultClass::BUTTON;
        }
        classes
    }

    /// Advance one control tick.
    pub fn update(&mut self, inputs: &InterlockInputs) -> InterlockOutputs {
        let cfg = self.config;
        let n = self.axis_count();

        // Communication-fault suppression gates the motor and spindle
        // paths only; following errors and the button always count.
        let ignore_com = inputs.ignore_com_errors;
        let button = inputs.estop_button;
        let spindle_code = if ignore_com { 0 } else { inputs.spindle_error_code };
        let spindle_modbus_ok = inputs.spindle_modbus_ok || ignore_com;

        let mut motor_fault = [false; MAX_AXES];
        for i in 0..n {
            motor_fault[i] = inputs.motor_fault[i] && !ignore_com;
        }

        // Unpowered drives report faults. Don't latch motor/spindle faults
        // while the button is down (or was, unreset), right after startup,
        // mid-reset, or shortly after the button came back up.
        let plausible = !button
            && !self.button_pushed.latched()
            && self.since_startup.value() > cfg.startup_time
            && self.since_enable_request.value() > cfg.reset_time
            && self.since_button_release.value() > cfg.startup_time;

        // ── Fault aggregation ──
        for i in 0..n {
            let label = self.labels[i].to_ascii_uppercase();
            if motor_fault[i] && plausible && self.motor_faulted[i].update(true) {
                error!("e-stop: motor {label} fault");
            }
            if inputs.following_error[i] && self.following_errored[i].update(true) {
                error!("e-stop: {label} following error");
            }
        }

        if spindle_code != 0 && plausible {
            if self.spindle_code == 0 {
                error!("e-stop: spindle error code {spindle_code}");
            }
            self.spindle_code = spindle_code;
        }
        if !spindle_modbus_ok && plausible && self.spindle_modbus_bad.update(true) {
            error!("e-stop: spindle communication lost");
        }

        // ── Button edge tracking ──
        if self.button_pushed.update(button) {
            error!("e-stop button pressed");
        }
        if self.button_pushed.latched() && !button && self.button_released.update(true) {
            self.since_button_release.reset();
        }

        // ── Reset trigger ──
        // Either the user asked, or the physical button came back up and
        // the drives have had time to power on and report valid status.
        let auto_reset = self.button_released.latched()
            && self.since_button_release.value() > cfg.startup_time;
        if !self.reset_requested && (inputs.user_request_enable || auto_reset) {
            self.reset_requested = true;
            self.since_enable_request.reset();
        }

        // ── Reset sequencing ──
        let mut reset_complete = false;
        if self.reset_requested {
            // Cycle motor power: hold the enables low first so faulted
            // drives drop out, then bring them back.
            let enable = self.since_enable_request.value() >= cfg.disable_motor_time;
            for e in self.motor_enable[..n].iter_mut() {
                *e = enable;
            }

            if self.since_enable_request.value() >= cfg.reset_time {
                // Unlatch everything. A persisting fault re-latches on the
                // next tick and is reported again.
                for l in self.motor_faulted[..n].iter_mut() {
                    l.clear();
                }
                for l in self.following_errored[..n].iter_mut() {
                    l.clear();
                }
                self.spindle_code = 0;
                self.spindle_modbus_bad.clear();
                self.button_pushed.clear();
                self.button_released.clear();
                self.estopped = false;
                self.reset_requested = false;
                reset_complete = true;
                info!("e-stop reset complete");
            }
        }

        // ── Estop decision ──
        let fault = motor_fault[..n].iter().any(|&f| f)
            || inputs.following_error[..n].iter().any(|&f| f)
            || !spindle_modbus_ok
            || spindle_code != 0
            || button;

        let faulted = !self.fault_classes().is_empty();

        self.estop = !(!fault && inputs.user_enable && (!faulted || reset_complete));

        if self.estop && !self.estopped {
            self.since_estop_entry.reset();
            self.estopped = true;
        }

        let emc_enable = !self.estop;
        // A stop mid-motion invalidates home positions; give the debounce
        // window a chance to pass before forcing re-homing.
        let unhome = self.estopped && self.since_estop_entry.value() > cfg.unhome_time;
        // The host doesn't reliably register machine-on when it toggles
        // together with emc-enable, so it trails the reset by a margin.
        let machine_on =
            emc_enable && self.since_enable_request.value() > cfg.machine_on_time;

        self.since_enable_request.tick(true);
        self.since_estop_entry.tick(true);
        self.since_startup.tick(true);
        self.since_button_release.tick(true);

        InterlockOutputs {
            emc_enable,
            user_requested_enable: self.reset_requested,
            machine_on,
            motor_enable: self.motor_enable,
            power: true,
            unhome,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
