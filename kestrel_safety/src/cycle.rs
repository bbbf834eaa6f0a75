//! Signal bus and fixed-period cycle runner.
//!
//! All cross-component communication goes through [`SignalBus`]: one plain
//! struct of named signals, each with exactly one writer — host-written
//! inputs, component-written outputs. Every tick the runner snapshots the
//! bus and feeds each component from the snapshot, so components always
//! read the previous tick's published values and there is no same-tick
//! read-after-write across components. The interlock's `machine_on`
//! therefore reaches the homing sequencers one tick after it changes.
//!
//! Per-tick work is O(axes) with zero heap allocation: component storage
//! is `heapless::Vec` bounded by `MAX_AXES`, pre-filled at startup.
//!
//! The `rt` feature enables mlockall / CPU affinity / SCHED_FIFO and
//! absolute-time pacing; without it the loop paces with
//! `std::thread::sleep` for bench and simulation use.

use std::sync::atomic::{AtomicBool, Ordering};

use heapless::Vec;
use kestrel_common::consts::MAX_AXES;

use crate::config::KestrelConfig;
use crate::estop::{Interlock, InterlockInputs};
use crate::homing::{AxisSequencer, HomingIo};
use crate::probe::ProbeGuard;
use crate::torque::TorqueMonitor;

// ─── Signal Bus ─────────────────────────────────────────────────────

/// Every externally linkable signal of the safety loop.
///
/// Per-axis arrays are indexed by configured axis position; entries past
/// the configured axis count stay at their initial values.
#[derive(Debug, Clone, Copy)]
pub struct SignalBus {
    // ── Host-written inputs ──
    /// Raw PWM duty cycle per axis (torque monitor input).
    pub duty_cycle: [f64; MAX_AXES],
    /// Measured PWM carrier frequency per axis [Hz].
    pub pwm_frequency: [f64; MAX_AXES],
    /// Per-axis following error flag.
    pub following_error: [bool; MAX_AXES],
    /// Spindle drive error code, 0 = healthy.
    pub spindle_error_code: i32,
    /// Spindle modbus link health.
    pub spindle_modbus_ok: bool,
    /// Physical E-Stop button.
    pub estop_button: bool,
    /// Suppress communication faults (commissioning aid).
    pub ignore_com_errors: bool,
    /// Host-side enable permission.
    pub user_enable: bool,
    /// User clicked the E-Stop reset control.
    pub user_request_enable: bool,
    /// Per-axis homing request. Cleared by the sequencer when accepted.
    pub start_homing: [bool; MAX_AXES],
    /// Per-axis drive feedback for standstill detection.
    pub feedback: [f64; MAX_AXES],
    /// Per-axis home switch. Reserved for the switch-then-offset variant.
    pub home_switch: [bool; MAX_AXES],
    /// Host motion-type code (probe guard input).
    pub motion_type: i32,
    /// Probe power state.
    pub probe_on: bool,
    /// Probe error state.
    pub probe_error: bool,

    // ── Torque monitor outputs ──
    /// Decoded torque per axis.
    pub torque: [f64; MAX_AXES],
    /// Debounced drive fault per axis (interlock input).
    pub motor_fault: [bool; MAX_AXES],

    // ── Interlock outputs ──
    pub emc_enable: bool,
    pub user_requested_enable: bool,
    pub machine_on: bool,
    pub motor_enable: [bool; MAX_AXES],
    pub machine_power: bool,
    pub unhome: bool,

    // ── Homing sequencer outputs ──
    pub homed: [bool; MAX_AXES],
    pub trigger_home: [bool; MAX_AXES],
    pub homing: [bool; MAX_AXES],
    pub axis_moving: [bool; MAX_AXES],
    pub jog_speed: [f64; MAX_AXES],
    pub axis_enable: [bool; MAX_AXES],

    // ── Probe guard output ──
    pub probe_abort: bool,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self {
            duty_cycle: [0.0; MAX_AXES],
            pwm_frequency: [0.0; MAX_AXES],
            following_error: [false; MAX_AXES],
            spindle_error_code: 0,
            spindle_modbus_ok: true,
            estop_button: false,
            ignore_com_errors: false,
            user_enable: false,
            user_request_enable: false,
            start_homing: [false; MAX_AXES],
            feedback: [0.0; MAX_AXES],
            home_switch: [false; MAX_AXES],
            motion_type: 0,
            probe_on: false,
            probe_error: false,
            torque: [0.0; MAX_AXES],
            motor_fault: [false; MAX_AXES],
            emc_enable: false,
            user_requested_enable: false,
            machine_on: false,
            // Drives boot enabled; the first reset cycles them.
            motor_enable: [true; MAX_AXES],
            machine_power: true,
            unhome: false,
            homed: [false; MAX_AXES],
            trigger_home: [false; MAX_AXES],
            homing: [false; MAX_AXES],
            axis_moving: [false; MAX_AXES],
            jog_speed: [0.0; MAX_AXES],
            axis_enable: [false; MAX_AXES],
            probe_abort: false,
        }
    }
}

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone, Copy)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of budget overruns observed.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns += duration_ns;
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Cycle loop / RT setup error.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("RT setup error: {0}")]
    RtSetup(String),
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Lock all current and future memory pages (prevent page faults in the
/// RT loop). No-op without the `rt` feature.
#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{mlockall, MlockallFlags};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(()) // No-op in simulation mode
}

/// Prefault stack pages so the RT loop never page-faults.
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

/// Pin the current thread to a specific CPU core.
/// No-op without the `rt` feature.
#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))?;
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

/// Set SCHED_FIFO with the given RT priority.
/// No-op without the `rt` feature.
#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Perform the full RT setup sequence. Call before entering the loop.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns every component state and the signal bus; advances the whole
/// safety loop one tick at a time.
#[derive(Debug)]
pub struct CycleRunner {
    /// The published signal surface. Host code writes inputs here between
    /// ticks and reads outputs after each tick.
    pub bus: SignalBus,
    monitors: Vec<TorqueMonitor, MAX_AXES>,
    interlock: Interlock,
    sequencers: Vec<AxisSequencer, MAX_AXES>,
    probe: ProbeGuard,
    /// Timing statistics maintained by `run`.
    pub stats: CycleStats,
    cycle_time_ns: i64,
}

impl CycleRunner {
    /// Build the runner from a validated configuration.
    pub fn new(config: &KestrelConfig) -> Self {
        let labels = config.machine.axis_labels();
        let mut monitors = Vec::new();
        let mut sequencers = Vec::new();
        for &label in &labels {
            let _ = monitors.push(TorqueMonitor::new(label, config.torque));
            let _ = sequencers.push(AxisSequencer::new(label, config.homing.clone()));
        }
        Self {
            bus: SignalBus::default(),
            monitors,
            interlock: Interlock::new(&labels, config.interlock),
            sequencers,
            probe: ProbeGuard::new(),
            stats: CycleStats::new(),
            cycle_time_ns: config.machine.cycle_time_us as i64 * 1000,
        }
    }

    /// Number of configured axes.
    #[inline]
    pub fn axis_count(&self) -> usize {
        self.sequencers.len()
    }

    /// Interlock state, for status reporting.
    #[inline]
    pub fn interlock(&self) -> &Interlock {
        &self.interlock
    }

    /// Homing sequencers, for status reporting.
    #[inline]
    pub fn sequencers(&self) -> &[AxisSequencer] {
        &self.sequencers
    }

    /// Advance the whole loop one tick.
    ///
    /// Components read the snapshot taken at entry (the previous tick's
    /// published values) and write fresh outputs to the live bus.
    pub fn tick(&mut self) {
        let snap = self.bus;

        // Torque monitors: duty/frequency → torque + drive fault.
        for (i, monitor) in self.monitors.iter_mut().enumerate() {
            let sample = monitor.update(snap.duty_cycle[i], snap.pwm_frequency[i]);
            self.bus.torque[i] = sample.torque;
            self.bus.motor_fault[i] = sample.fault;
        }

        // Interlock: faults + button + spindle → estop decision.
        let inputs = InterlockInputs {
            motor_fault: snap.motor_fault,
            following_error: snap.following_error,
            spindle_error_code: snap.spindle_error_code,
            spindle_modbus_ok: snap.spindle_modbus_ok,
            estop_button: snap.estop_button,
            ignore_com_errors: snap.ignore_com_errors,
            user_enable: snap.user_enable,
            user_request_enable: snap.user_request_enable,
        };
        let out = self.interlock.update(&inputs);
        self.bus.emc_enable = out.emc_enable;
        self.bus.user_requested_enable = out.user_requested_enable;
        self.bus.machine_on = out.machine_on;
        self.bus.motor_enable = out.motor_enable;
        self.bus.machine_power = out.power;
        self.bus.unhome = out.unhome;

        // Homing sequencers, gated on the interlock's previous tick.
        for (i, sequencer) in self.sequencers.iter_mut().enumerate() {
            let mut io = HomingIo {
                machine_on: snap.machine_on,
                start_homing: snap.start_homing[i],
                feedback: snap.feedback[i],
                home_switch: snap.home_switch[i],
                ..Default::default()
            };
            sequencer.update(&mut io);
            if snap.start_homing[i] && !io.start_homing {
                // Request consumed this tick.
                self.bus.start_homing[i] = false;
            }
            self.bus.homed[i] = io.homed;
            self.bus.trigger_home[i] = io.trigger_home;
            self.bus.homing[i] = io.homing;
            self.bus.axis_moving[i] = io.moving;
            self.bus.jog_speed[i] = io.speed;
            self.bus.axis_enable[i] = io.enable;
        }

        // Probe guard.
        self.bus.probe_abort =
            self.probe
                .update(snap.motion_type, snap.probe_on, snap.probe_error);
    }

    /// Enter the fixed-period loop until `running` goes false.
    ///
    /// With the `rt` feature this paces with
    /// `clock_nanosleep(TIMER_ABSTIME)` on `CLOCK_MONOTONIC` for
    /// drift-free timing; otherwise `std::thread::sleep`.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(running)
        }
        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(running);
            Ok(())
        }
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, running: &AtomicBool) -> Result<(), CycleError> {
        use nix::time::{clock_gettime, clock_nanosleep, ClockId, ClockNanosleepFlags};

        let clock = ClockId::CLOCK_MONOTONIC;
        let mut next_wake = clock_gettime(clock)
            .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;

        while running.load(Ordering::Relaxed) {
            next_wake = timespec_add_ns(next_wake, self.cycle_time_ns);

            let start = clock_gettime(clock)
                .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;

            self.tick();

            let end = clock_gettime(clock)
                .map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")))?;
            let duration_ns = timespec_diff_ns(&end, &start);
            self.stats.record(duration_ns);
            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, running: &AtomicBool) {
        use std::time::Instant;

        let cycle_duration = std::time::Duration::from_nanos(self.cycle_time_ns as u64);

        while running.load(Ordering::Relaxed) {
            let start = Instant::now();

            self.tick();

            let elapsed = start.elapsed();
            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns);
            if duration_ns > self.cycle_time_ns {
                self.stats.overruns += 1;
            }

            if let Some(remaining) = cycle_duration.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    }
}

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let total = ts.tv_sec() as i64 * 1_000_000_000 + ts.tv_nsec() as i64 + ns;
    TimeSpec::new(total / 1_000_000_000, total % 1_000_000_000)
}

#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() as i64 - b.tv_sec() as i64) * 1_000_000_000
        + (a.tv_nsec() as i64 - b.tv_nsec() as i64)
}

// ─── Tests ──────────────────────────────────────────────────────────
