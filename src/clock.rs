//! Hardware clock abstraction.
//!
//! The synchronization core manipulates a monotonic nanosecond clock through
//! [`HardwareClock`]. On real hardware this is backed by a PTP peripheral
//! that can step its counter and trim the oscillator; [`SystemClock`] is a
//! software stand-in for hosts without one.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::protocol::Timestamp;

/// A monotonic nanosecond clock that can be stepped and optionally
/// rate-trimmed.
///
/// All methods take `&self`: implementations are expected to use interior
/// mutability (hardware registers, atomics) so the clock can be shared
/// between the event task and the transport.
pub trait HardwareClock: Send + Sync {
    /// Current time in nanoseconds since the PTP epoch (1970-01-01 UTC).
    fn read(&self) -> Timestamp;

    /// Step the clock by a signed nanosecond offset.
    ///
    /// Implementations may apply the step atomically or spread it over a
    /// bounded window; the client assumes step semantics when estimating
    /// drift.
    fn adjust(&self, delta_ns: i64);

    /// Whether [`HardwareClock::adjust_rate`] actually reaches the
    /// oscillator.
    fn supports_rate_adjustment(&self) -> bool {
        false
    }

    /// Trim the clock rate by `drift_q32` parts-per-2³².
    ///
    /// Interpreted as `delta_ns_per_ns = drift_q32 / 2³²`. Implementations
    /// without oscillator trimming ignore the call.
    fn adjust_rate(&self, _drift_q32: i32) {}
}

/// Software clock: a monotonic anchor plus an accumulated step offset.
///
/// Rate trimming is not supported; the client still computes the drift
/// estimate for diagnostics.
#[derive(Debug)]
pub struct SystemClock {
    /// Monotonic anchor taken at construction.
    anchor: Instant,
    /// Nanoseconds between the PTP epoch and the anchor, plus any steps
    /// applied since.
    epoch_offset_ns: AtomicI64,
}

impl SystemClock {
    /// Create a clock anchored to the current wall-clock time.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Nanoseconds since 1970 fit in i64 until the year 2262"
    )]
    pub fn new() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            anchor: Instant::now(),
            epoch_offset_ns: AtomicI64::new(since_epoch.as_nanos() as i64),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareClock for SystemClock {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Process uptime in nanoseconds fits in i64 for ~292 years"
    )]
    fn read(&self) -> Timestamp {
        let elapsed = self.anchor.elapsed().as_nanos() as i64;
        self.epoch_offset_ns.load(Ordering::Relaxed) + elapsed
    }

    fn adjust(&self, delta_ns: i64) {
        self.epoch_offset_ns.fetch_add(delta_ns, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.read();
        let b = clock.read();
        assert!(b >= a);
    }

    #[test]
    fn test_system_clock_adjust_visible() {
        let clock = SystemClock::new();
        let before = clock.read();
        clock.adjust(5_000_000_000);
        let after = clock.read();
        assert!(after - before >= 5_000_000_000);

        clock.adjust(-5_000_000_000);
        assert!(clock.read() - before < 1_000_000_000);
    }

    #[test]
    fn test_system_clock_no_rate_adjustment() {
        let clock = SystemClock::new();
        assert!(!clock.supports_rate_adjustment());
        // Must be a no-op rather than a panic.
        clock.adjust_rate(1234);
    }
}
