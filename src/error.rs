use std::io;
use thiserror::Error;

/// Errors surfaced by client start-up.
///
/// Protocol anomalies (bad version, truncation, sequence mismatches) and
/// measurement anomalies (implausible RTT or drift) are recovered inside the
/// event loop and never reach the caller; only transport unavailability does.
#[derive(Debug, Error)]
pub enum PtpError {
    /// No network interface with a usable IPv6 address was found
    #[error("no network interface with an IPv6 address")]
    NoInterface,

    /// Joining the primary PTP multicast group failed
    #[error("failed to join PTP multicast group")]
    GroupJoinFailed(#[source] io::Error),

    /// Creating one of the PTP UDP sockets failed
    #[error("failed to create PTP socket on port {port}")]
    SocketCreateFailed {
        /// The UDP port that could not be bound
        port: u16,
        /// The underlying socket error
        #[source]
        source: io::Error,
    },
}

/// Result type alias for PTP operations
pub type Result<T> = std::result::Result<T, PtpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PtpError::SocketCreateFailed {
            port: 319,
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert_eq!(err.to_string(), "failed to create PTP socket on port 319");
    }

    #[test]
    fn test_error_source_chain() {
        let err = PtpError::GroupJoinFailed(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("denied"));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PtpError>();
    }
}
