use std::time::Duration;

/// Configuration for the PTP client.
///
/// The defaults are tuned for a LAN segment with hardware timestamping:
/// delay measurements every ten seconds, sub-millisecond plausibility bounds,
/// and conservative power-of-two smoothing of both filters.
#[derive(Debug, Clone)]
pub struct PtpConfig {
    /// Nominal time between two delay requests (default: 10 seconds).
    ///
    /// A pseudorandom jitter of up to ~1.05 s is added to every armed timer
    /// so that many clients sharing one server do not synchronize their
    /// requests and overload it.
    pub delay_req_interval: Duration,

    /// How long to wait for a Delay-Resp before retrying (default: 500 ms).
    pub delay_req_timeout: Duration,

    /// Round-trip measurements above this many nanoseconds are discarded as
    /// implausible and reset the estimate (default: `200_000`).
    pub rtt_plausibility_limit_ns: u32,

    /// Drift estimates beyond this magnitude in parts-per-2³² are discarded
    /// (default: `42_949_673`, roughly 10 000 ppm).
    pub drift_plausibility_limit_q32: i32,

    /// RTT smoothing shift: the previous estimate keeps a weight of
    /// `(2^shift - 1) / 2^shift` (default: 2, i.e. 3/4 old + 1/4 new).
    pub rtt_filter_shift: u32,

    /// Drift smoothing shift: each raw estimate contributes `1 / 2^shift`
    /// on top of the accumulated value (default: 3, i.e. 1/8).
    pub drift_filter_shift: u32,
}

impl Default for PtpConfig {
    fn default() -> Self {
        Self {
            delay_req_interval: Duration::from_secs(10),
            delay_req_timeout: Duration::from_millis(500),
            rtt_plausibility_limit_ns: 200_000,
            drift_plausibility_limit_q32: 42_949_673,
            rtt_filter_shift: 2,
            drift_filter_shift: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = PtpConfig::default();
        assert_eq!(config.delay_req_interval, Duration::from_secs(10));
        assert_eq!(config.delay_req_timeout, Duration::from_millis(500));
        assert_eq!(config.rtt_plausibility_limit_ns, 200_000);
        assert_eq!(config.drift_plausibility_limit_q32, 42_949_673);
        assert_eq!(config.rtt_filter_shift, 2);
        assert_eq!(config.drift_filter_shift, 3);
    }
}
