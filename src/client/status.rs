//! Shared, lock-free view of the client state.
//!
//! The event task is the only writer; diagnostic contexts (a shell, a
//! metrics poller) read concurrently. Every field is a word-sized atomic so
//! readers never observe torn values, and the 8-byte clock ids travel packed
//! in a single `u64`.

use std::sync::atomic::{AtomicI32, AtomicU16, AtomicU32, AtomicU64, Ordering};

use crate::protocol::ClockId;

/// Read-only synchronization state snapshot, shared across tasks.
#[derive(Debug, Default)]
pub struct SharedStatus {
    rtt_ns: AtomicU32,
    utc_offset_s: AtomicU16,
    drift_q32: AtomicI32,
    server_clock_id: AtomicU64,
    local_clock_id: AtomicU64,
}

impl SharedStatus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Estimated round-trip network delay in nanoseconds.
    ///
    /// The sum of both directions, start-of-frame delimiter to
    /// start-of-frame delimiter. Zero until the first accepted measurement.
    #[must_use]
    pub fn rtt(&self) -> u32 {
        self.rtt_ns.load(Ordering::Relaxed)
    }

    /// Current offset between UTC and TAI in seconds, as stated by the
    /// selected server's Announce.
    #[must_use]
    pub fn utc_offset(&self) -> u16 {
        self.utc_offset_s.load(Ordering::Relaxed)
    }

    /// Estimated clock drift relative to the server's reference, in
    /// parts-per-2³².
    #[must_use]
    pub fn clock_drift(&self) -> i32 {
        self.drift_q32.load(Ordering::Relaxed)
    }

    /// Clock id of the selected server; all zeros before the first Announce.
    #[must_use]
    pub fn server_clock_id(&self) -> ClockId {
        ClockId::from_bits(self.server_clock_id.load(Ordering::Relaxed))
    }

    /// This client's own clock id, fixed at start-up.
    #[must_use]
    pub fn local_clock_id(&self) -> ClockId {
        ClockId::from_bits(self.local_clock_id.load(Ordering::Relaxed))
    }

    pub(crate) fn set_rtt(&self, rtt_ns: u32) {
        self.rtt_ns.store(rtt_ns, Ordering::Relaxed);
    }

    pub(crate) fn set_utc_offset(&self, seconds: u16) {
        self.utc_offset_s.store(seconds, Ordering::Relaxed);
    }

    pub(crate) fn set_clock_drift(&self, drift_q32: i32) {
        self.drift_q32.store(drift_q32, Ordering::Relaxed);
    }

    pub(crate) fn set_server_clock_id(&self, id: ClockId) {
        self.server_clock_id.store(id.to_bits(), Ordering::Relaxed);
    }

    pub(crate) fn set_local_clock_id(&self, id: ClockId) {
        self.local_clock_id.store(id.to_bits(), Ordering::Relaxed);
    }
}
