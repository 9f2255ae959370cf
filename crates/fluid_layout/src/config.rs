//! Engine configuration.
//!
//! Reserved chrome and the resize coalescing window can be given explicitly
//! or read from the environment.

use core::time::Duration;
use std::env;

/// Default trailing delay used to coalesce bursts of resize notifications.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Runtime configuration of a [`crate::LayoutEngine`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Pixels at the bottom of the window permanently taken by fixed chrome.
    pub reserved_height: i32,
    /// Pixels at the right of the window permanently taken by fixed chrome.
    pub reserved_width: i32,
    /// Coalescing window for resize notifications in milliseconds.
    pub resize_debounce_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self::new(0, 0, DEFAULT_DEBOUNCE_MS)
    }
}

impl LayoutConfig {
    /// Construct a `LayoutConfig` with explicit values.
    ///
    /// # Arguments
    ///
    /// * `reserved_height` - Height reserved for fixed chrome
    /// * `reserved_width` - Width reserved for fixed chrome
    /// * `resize_debounce_ms` - Coalescing window (minimum 1ms)
    #[inline]
    #[must_use]
    pub const fn new(reserved_height: i32, reserved_width: i32, resize_debounce_ms: u64) -> Self {
        let debounce = if resize_debounce_ms < 1 {
            1
        } else {
            resize_debounce_ms
        };
        Self {
            reserved_height,
            reserved_width,
            resize_debounce_ms: debounce,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `FLUID_LAYOUT_RESERVED_HEIGHT`: reserved height in pixels (default: 0)
    /// - `FLUID_LAYOUT_RESERVED_WIDTH`: reserved width in pixels (default: 0)
    /// - `FLUID_LAYOUT_DEBOUNCE_MS`: resize coalescing window (default: 300)
    ///
    /// Unparseable values fall back to the defaults.
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        let reserved_height = env::var("FLUID_LAYOUT_RESERVED_HEIGHT")
            .ok()
            .and_then(|val| val.trim().parse::<i32>().ok())
            .unwrap_or(0);
        let reserved_width = env::var("FLUID_LAYOUT_RESERVED_WIDTH")
            .ok()
            .and_then(|val| val.trim().parse::<i32>().ok())
            .unwrap_or(0);
        let resize_debounce_ms = env::var("FLUID_LAYOUT_DEBOUNCE_MS")
            .ok()
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_DEBOUNCE_MS);
        Self::new(reserved_height, reserved_width, resize_debounce_ms)
    }

    /// The coalescing window as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_is_floored_at_one_millisecond() {
        let config = LayoutConfig::new(20, 0, 0);
        assert_eq!(config.resize_debounce(), Duration::from_millis(1));
        assert_eq!(LayoutConfig::default().resize_debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn environment_overrides_with_fallback() {
        // SAFETY: no other test in this crate reads or writes these variables.
        unsafe {
            env::set_var("FLUID_LAYOUT_RESERVED_HEIGHT", " 24 ");
            env::set_var("FLUID_LAYOUT_RESERVED_WIDTH", "8");
            env::set_var("FLUID_LAYOUT_DEBOUNCE_MS", "soon");
        }
        let config = LayoutConfig::from_env();
        // SAFETY: as above.
        unsafe {
            env::remove_var("FLUID_LAYOUT_RESERVED_HEIGHT");
            env::remove_var("FLUID_LAYOUT_RESERVED_WIDTH");
            env::remove_var("FLUID_LAYOUT_DEBOUNCE_MS");
        }
        assert_eq!(config, LayoutConfig::new(24, 8, DEFAULT_DEBOUNCE_MS));
    }
}
