//! Integration tests for the Kestrel safety loop.
//!
//! These tests exercise multiple modules together through the signal bus,
//! testing realistic workflows that span the torque monitors, the
//! interlock, and the homing sequencers.

mod integration;
