//! Probe-error guard.
//!
//! The touch probe reports an error state (discharged, no line of sight to
//! a receiver) on a separate bit. Probing against an errored probe would
//! crash the tool, so while a probing move is commanded with the probe on
//! and errored, the guard asserts an abort for the motion layer and logs
//! the reason once per occurrence.

use tracing::error;

/// Motion-type code the host reports while executing a probing move.
pub const MOTION_TYPE_PROBING: i32 = 5;

/// Probe guard state: abort decision plus its previous value for
/// edge-triggered reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeGuard {
    abort: bool,
}

impl ProbeGuard {
    pub const fn new() -> Self {
        Self { abort: false }
    }

    /// Current abort decision.
    #[inline]
    pub const fn abort(&self) -> bool {
        self.abort
    }

    /// Advance one tick. Returns the abort output.
    pub fn update(&mut self, motion_type: i32, probe_on: bool, probe_error: bool) -> bool {
        let last = self.abort;
        self.abort = probe_on && motion_type == MOTION_TYPE_PROBING && probe_error;

        if self.abort && !last {
            error!(
                "probe is in an error state; ensure the probe is charged and has \
                 line of sight to a receiver"
            );
        }
        self.abort
    }
}
