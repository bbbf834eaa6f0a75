//! Integration test: machine power-up, homing all axes, E-Stop during
//! operation, and hands-off recovery via the button-release auto reset.

use kestrel_safety::config::KestrelConfig;
use kestrel_safety::cycle::CycleRunner;
use kestrel_safety::homing::HomingState;

const NOMINAL_HZ: f64 = 45.0;

fn healthy_runner() -> CycleRunner {
    let mut r = CycleRunner::new(&KestrelConfig::default());
    r.bus.user_enable = true;
    for i in 0..r.axis_count() {
        r.bus.duty_cycle[i] = 0.5;
        r.bus.pwm_frequency[i] = NOMINAL_HZ;
    }
    r
}

fn run_until_machine_on(r: &mut CycleRunner) {
    let mut ticks = 0u32;
    while !r.bus.machine_on {
        r.tick();
        ticks += 1;
        assert!(ticks < 2000, "machine_on never asserted");
    }
    // One more tick so the sequencers see it.
    r.tick();
}

#[test]
fn all_axes_home_to_ready() {
    let mut r = healthy_runner();
    run_until_machine_on(&mut r);
    assert_eq!(r.sequencers()[0].state(), HomingState::Powered);

    let n = r.axis_count();
    for i in 0..n {
        r.bus.start_homing[i] = true;
    }

    // Feedback is 0 throughout (axis reads stationary), so each sequencer
    // walks power-cycle → jog → standstill debounce → homed → ready.
    let mut saw_trigger = [false; 8];
    let mut saw_moving = [false; 8];
    let mut ticks = 0u32;
    while !(0..n).all(|i| r.bus.homed[i]) {
        r.tick();
        for i in 0..n {
            saw_trigger[i] |= r.bus.trigger_home[i];
            saw_moving[i] |= r.bus.axis_moving[i];
        }
        ticks += 1;
        assert!(ticks < 2000, "homing did not complete");
    }

    for i in 0..n {
        assert_eq!(r.sequencers()[i].state(), HomingState::Ready);
        assert!(r.bus.homed[i]);
        assert!(r.bus.axis_enable[i]);
        assert!(!r.bus.trigger_home[i]);
        assert!(!r.bus.homing[i]);
        assert!(saw_trigger[i], "axis {i} never pulsed trigger_home");
        assert!(saw_moving[i], "axis {i} never jogged");
        assert!(!r.bus.start_homing[i], "request not consumed");
    }
}

#[test]
fn button_press_unpowers_axes_next_tick() {
    let mut r = healthy_runner();
    run_until_machine_on(&mut r);

    let n = r.axis_count();
    for i in 0..n {
        r.bus.start_homing[i] = true;
    }
    let mut ticks = 0u32;
    while !(0..n).all(|i| r.bus.homed[i]) {
        r.tick();
        ticks += 1;
        assert!(ticks < 2000);
    }

    // ── Physical E-Stop ──
    r.bus.estop_button = true;
    r.tick();
    assert!(r.interlock().estopped());
    assert!(!r.bus.machine_on);
    // The sequencers saw the previous machine_on this tick...
    assert_eq!(r.sequencers()[0].state(), HomingState::Ready);

    // ...and drop out on the next one, axes disabled the same tick.
    r.tick();
    for i in 0..n {
        assert_eq!(r.sequencers()[i].state(), HomingState::Unpowered);
        assert!(!r.bus.homed[i]);
        assert!(!r.bus.axis_enable[i]);
        assert_eq!(r.bus.jog_speed[i], 0.0);
    }

    // Unhome asserts after the estop dwell.
    for _ in 0..101 {
        r.tick();
    }
    assert!(r.bus.unhome);
}

#[test]
fn button_release_recovers_without_user_action() {
    let mut r = healthy_runner();
    run_until_machine_on(&mut r);

    r.bus.estop_button = true;
    r.tick();
    assert!(!r.bus.machine_on);
    r.bus.estop_button = false;

    // Release starts the settle clock; once it passes, the interlock
    // resets itself and walks the machine back on. No user input.
    let mut ticks = 0u32;
    while !r.bus.machine_on {
        r.tick();
        ticks += 1;
        assert!(ticks < 5000, "auto reset never recovered the machine");
    }
    assert!(r.bus.emc_enable);
    assert!(r.interlock().fault_classes().is_empty());
    // Axes power back up but must be re-homed.
    r.tick();
    assert_eq!(r.sequencers()[0].state(), HomingState::Powered);
    assert!(!r.bus.homed[0]);
}
