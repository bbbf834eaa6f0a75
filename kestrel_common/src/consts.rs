//! System-wide constants for the Kestrel workspace.
//!
//! Single source of truth for all numeric limits and default paths.
//! Imported by all crates — no duplication permitted.

/// Maximum number of axes a machine may configure.
pub const MAX_AXES: usize = 8;

/// Default axis label set (one char per axis).
pub const DEFAULT_AXES: &str = "xyzbc";

/// Default control cycle time in microseconds (1 kHz = 1000 µs).
pub const CYCLE_TIME_US: u64 = 1000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/kestrel.toml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(MAX_AXES > 0 && MAX_AXES <= 64);
        assert!(!DEFAULT_AXES.is_empty());
        assert!(DEFAULT_AXES.len() <= MAX_AXES);
        assert!(CYCLE_TIME_US > 0);
    }
}
