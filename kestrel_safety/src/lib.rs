//! # Kestrel Safety Library
//!
//! Fault-latching safety interlock and per-axis homing sequencing for the
//! Kestrel CNC. Every component is a fixed-period automaton advanced once
//! per control tick: debounce/dwell timers gate transitions, sticky
//! latches hold faults across ticks, and the only way out of an E-Stop is
//! an explicit, time-gated reset sequence.
//!
//! ## Components
//!
//! 1. **Timer / Latch** — saturating tick counter and sticky fault memory
//! 2. **TorqueMonitor** — PWM feedback → torque + debounced drive fault
//! 3. **Interlock** — global emergency-stop decision and reset sequencing
//! 4. **AxisSequencer** — per-axis hard-stop homing automaton
//! 5. **CycleRunner** — signal bus and fixed-period driver
//!
//! ## Determinism
//!
//! All runtime state is pre-allocated at startup in fixed-size storage.
//! A tick performs zero heap allocations and O(axes) work; components
//! communicate only through the previous tick's published signals.

pub mod config;
pub mod cycle;
pub mod estop;
pub mod homing;
pub mod primitives;
pub mod probe;
pub mod torque;
