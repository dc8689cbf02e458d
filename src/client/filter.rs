//! Round-trip and drift estimation filters.
//!
//! Both filters stick to integer arithmetic with power-of-two smoothing so
//! the math is exact and cheap. Implausible measurements reset or skip the
//! estimate instead of polluting it.

use crate::protocol::Timestamp;

/// Smoothed round-trip estimate, fed by Delay-Req/Delay-Resp exchanges.
#[derive(Debug)]
pub(crate) struct DelayFilter {
    limit_ns: u32,
    shift: u32,
}

impl DelayFilter {
    pub(crate) fn new(limit_ns: u32, shift: u32) -> Self {
        Self { limit_ns, shift }
    }

    /// Fold a raw measurement into the previous estimate.
    ///
    /// Negative or above-limit measurements reset the estimate to zero. The
    /// first accepted measurement is adopted as-is; later ones are averaged
    /// in at a weight of `1 / 2^shift`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "raw is bounds-checked against a u32 limit first"
    )]
    pub(crate) fn update(&self, previous: u32, raw: i64) -> u32 {
        if raw < 0 || raw > i64::from(self.limit_ns) {
            tracing::debug!(raw_ns = raw, "implausible RTT estimate, resetting it");
            return 0;
        }
        let raw = raw as u32;
        if previous == 0 {
            return raw;
        }
        let weight = u64::from((1u32 << self.shift) - 1);
        ((weight * u64::from(previous) + u64::from(raw)) >> self.shift) as u32
    }
}

/// Clock drift estimator over successive synchronization points.
///
/// The drift is the applied clock step divided by the server-side interval
/// since the previous step, expressed in parts-per-2³². Estimates accumulate
/// through a `raw / 2^shift` low-pass once a previous value exists; the very
/// first estimate is adopted whole to cut settling time at boot.
#[derive(Debug)]
pub(crate) struct DriftFilter {
    limit_q32: i32,
    shift: u32,
    /// Server time of the previous synchronization point.
    last_server_time: Option<Timestamp>,
}

impl DriftFilter {
    pub(crate) fn new(limit_q32: i32, shift: u32) -> Self {
        Self {
            limit_q32,
            shift,
            last_server_time: None,
        }
    }

    /// Derive the next drift value from a clock step of `offset_ns` applied
    /// at server time `server_time`.
    ///
    /// Returns `None` when there is no usable history (first sync, or a
    /// non-increasing server timestamp); the caller then leaves the
    /// published drift untouched. Implausible magnitudes yield `Some(0)`.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "estimate is bounds-checked against an i32 limit first"
    )]
    pub(crate) fn update(
        &mut self,
        previous: i32,
        offset_ns: i64,
        server_time: Timestamp,
    ) -> Option<i32> {
        let result = self.last_server_time.and_then(|last| {
            let interval = server_time - last;
            if interval <= 0 {
                return None;
            }
            let raw128 = (i128::from(offset_ns) << 32) / i128::from(interval);
            let raw = raw128.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64;
            // Smooth out jumps to avoid overshooting, but take the first
            // estimate in one step to keep boot settling short.
            let estimate = if previous == 0 {
                raw
            } else {
                raw / (1i64 << self.shift) + i64::from(previous)
            };
            if estimate < -i64::from(self.limit_q32) || estimate > i64::from(self.limit_q32) {
                tracing::debug!(estimate, "implausible clock drift, resetting it");
                Some(0)
            } else {
                Some(estimate as i32)
            }
        });
        self.last_server_time = Some(server_time);
        result
    }

    /// Forget the previous synchronization point.
    ///
    /// Called whenever the RTT estimate changes, since the next offset would
    /// otherwise be measured against a different delay compensation.
    pub(crate) fn reset_history(&mut self) {
        self.last_server_time = None;
    }

    #[cfg(test)]
    pub(crate) fn has_history(&self) -> bool {
        self.last_server_time.is_some()
    }
}
