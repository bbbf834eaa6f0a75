//! Integration test: drive fault → latched E-Stop → timed reset recovery.
//!
//! Drives the full loop through the signal bus: a saturated torque
//! feedback trips the monitor, the interlock latches the fault and drops
//! the machine, and a user reset walks the 100/1000/1100-tick schedule
//! back to machine-on.

use kestrel_common::interlock::FaultClass;
use kestrel_safety::config::KestrelConfig;
use kestrel_safety::cycle::CycleRunner;

const NOMINAL_HZ: f64 = 45.0;

/// Runner with healthy feedback on every axis and the user enable held.
fn healthy_runner() -> CycleRunner {
    let mut r = CycleRunner::new(&KestrelConfig::default());
    r.bus.user_enable = true;
    for i in 0..r.axis_count() {
        r.bus.duty_cycle[i] = 0.5;
        r.bus.pwm_frequency[i] = NOMINAL_HZ;
    }
    r
}

/// Run past the startup settle window so drive faults are trusted.
fn settle(r: &mut CycleRunner) {
    for _ in 0..3200 {
        r.tick();
    }
    assert!(r.bus.machine_on, "machine did not come on after startup");
}

#[test]
fn fault_latch_and_timed_recovery() {
    let mut r = healthy_runner();
    settle(&mut r);

    // ── Saturate axis y's feedback ──
    r.bus.duty_cycle[1] = 1.0;
    // Monitor debounce (10) + one tick for the interlock to see it.
    for _ in 0..10 {
        r.tick();
    }
    assert!(r.bus.motor_fault[1]);
    assert!(r.bus.machine_on, "interlock reacted before the published fault");
    r.tick();
    assert!(r.interlock().estopped());
    assert!(!r.bus.emc_enable);
    assert!(!r.bus.machine_on);
    assert!(
        r.interlock().fault_classes().contains(FaultClass::MOTOR_FAULT)
    );

    // ── Feedback recovers; the latch must not ──
    r.bus.duty_cycle[1] = 0.5;
    for _ in 0..200 {
        r.tick();
    }
    assert!(!r.bus.motor_fault[1], "monitor fault did not clear");
    assert!(r.interlock().estopped(), "latch cleared without a reset");
    assert!(!r.bus.emc_enable);
    // E-Stop has been held longer than the unhome dwell.
    assert!(r.bus.unhome);

    // ── User reset: tick R ──
    r.bus.user_request_enable = true;
    r.tick();
    r.bus.user_request_enable = false;
    assert!(r.bus.user_requested_enable);
    assert!(!r.bus.motor_enable[0], "motors not power-cycled");

    // Ticks R+1..R+99: motors held off.
    for _ in 1..100 {
        r.tick();
        assert!(!r.bus.motor_enable[0]);
    }
    // Tick R+100: motors re-enabled, still stopped.
    r.tick();
    assert!(r.bus.motor_enable[0]);
    assert!(!r.bus.emc_enable);

    // Ticks R+101..R+999: reset dwell, still latched and stopped.
    for _ in 101..1000 {
        r.tick();
        assert!(!r.bus.emc_enable);
    }

    // Tick R+1000: latches clear, estop drops, machine still off.
    r.tick();
    assert!(r.bus.emc_enable);
    assert!(!r.bus.machine_on);
    assert!(!r.bus.unhome);
    assert!(!r.bus.user_requested_enable);
    assert!(r.interlock().fault_classes().is_empty());

    // Ticks R+1001..R+1100: machine-on settle margin.
    for _ in 1001..=1100 {
        r.tick();
        assert!(r.bus.emc_enable);
        assert!(!r.bus.machine_on);
    }
    // Tick R+1101: machine on.
    r.tick();
    assert!(r.bus.machine_on);
}

#[test]
fn estop_holds_while_condition_persists_through_reset() {
    let mut r = healthy_runner();
    settle(&mut r);

    // A following error that never goes away.
    r.bus.following_error[0] = true;
    r.tick();
    assert!(r.interlock().estopped());

    // Reset and run the full schedule; the live condition re-latches.
    r.bus.user_request_enable = true;
    r.tick();
    r.bus.user_request_enable = false;
    for _ in 0..1300 {
        r.tick();
    }
    assert!(r.interlock().estopped());
    assert!(!r.bus.emc_enable);
    assert!(!r.bus.machine_on);
    assert!(
        r.interlock()
            .fault_classes()
            .contains(FaultClass::FOLLOWING_ERROR)
    );
}

#[test]
fn spindle_fault_latches_like_a_drive_fault() {
    let mut r = healthy_runner();
    settle(&mut r);

    r.bus.spindle_error_code = 12;
    r.tick();
    assert!(r.interlock().fault_classes().contains(FaultClass::SPINDLE_CODE));
    assert!(!r.bus.emc_enable);

    // Code clears on the wire, latch holds.
    r.bus.spindle_error_code = 0;
    for _ in 0..50 {
        r.tick();
    }
    assert!(r.interlock().fault_classes().contains(FaultClass::SPINDLE_CODE));
}

#[test]
fn steady_state_bus_is_idempotent() {
    let mut r = healthy_runner();
    settle(&mut r);

    r.tick();
    let reference = r.bus;
    for _ in 0..100 {
        r.tick();
        let b = r.bus;
        assert_eq!(b.emc_enable, reference.emc_enable);
        assert_eq!(b.machine_on, reference.machine_on);
        assert_eq!(b.motor_enable, reference.motor_enable);
        assert_eq!(b.unhome, reference.unhome);
        assert_eq!(b.torque, reference.torque);
    }
}
