//! Timestamp representation and wire conversion.
//!
//! IEEE 1588 carries timestamps as 48-bit seconds plus 32-bit nanoseconds,
//! both big-endian. Internally the client works exclusively in signed 64-bit
//! nanoseconds since the PTP epoch; the conversion lives here and nowhere
//! else.

use std::fmt;

/// Nanoseconds since the PTP epoch (1970-01-01 UTC), signed.
pub type Timestamp = i64;

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A timestamp in IEEE 1588 wire form: 48-bit seconds + 32-bit nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireTimestamp {
    /// Seconds since the PTP epoch (48 bits on the wire).
    pub seconds: u64,
    /// Nanoseconds within the current second.
    pub nanos: u32,
}

impl WireTimestamp {
    /// Wire size: 6-byte seconds + 4-byte nanoseconds.
    pub const SIZE: usize = 10;

    /// Maximum seconds value representable in 48 bits.
    pub const MAX_SECONDS: u64 = (1 << 48) - 1;

    /// Decode from wire format.
    ///
    /// Returns `None` if the slice is shorter than [`WireTimestamp::SIZE`].
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        if data.len() < Self::SIZE {
            return None;
        }
        // There is no 48-bit integer type, so the seconds are assembled by
        // hand from the six big-endian bytes.
        let seconds = u64::from_be_bytes([
            0, 0, data[0], data[1], data[2], data[3], data[4], data[5],
        ]);
        let nanos = u32::from_be_bytes([data[6], data[7], data[8], data[9]]);
        Some(Self { seconds, nanos })
    }

    /// Encode to wire format.
    #[must_use]
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        let secs = (self.seconds & Self::MAX_SECONDS).to_be_bytes();
        buf[0..6].copy_from_slice(&secs[2..8]);
        buf[6..10].copy_from_slice(&self.nanos.to_be_bytes());
        buf
    }

    /// Collapse to signed nanoseconds since the PTP epoch.
    ///
    /// Seconds values too large for the nanosecond scalar wrap; the client's
    /// plausibility checks discard the resulting measurements downstream.
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        reason = "48-bit seconds fit in i64; the multiply wraps only for \
                  timestamps beyond the year 2262"
    )]
    pub fn to_nanos(&self) -> Timestamp {
        (self.seconds as i64)
            .wrapping_mul(NANOS_PER_SEC)
            .wrapping_add(i64::from(self.nanos))
    }

    /// Build from signed nanoseconds since the PTP epoch.
    ///
    /// Negative values clamp to zero.
    #[must_use]
    #[allow(
        clippy::cast_sign_loss,
        clippy::cast_possible_truncation,
        reason = "Negative input is clamped and the remainder is < 10^9"
    )]
    pub fn from_nanos(ns: Timestamp) -> Self {
        let ns = ns.max(0);
        Self {
            seconds: (ns / NANOS_PER_SEC) as u64,
            nanos: (ns % NANOS_PER_SEC) as u32,
        }
    }
}

impl fmt::Display for WireTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}
