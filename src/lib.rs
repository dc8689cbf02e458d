//! # ptpsync
//!
//! A Precision Time Protocol (PTP, IEEE 1588 v2) client that disciplines a
//! local hardware clock against a remote grandmaster using
//! hardware-timestamped UDP messages.
//!
//! ## Features
//!
//! - Wire codec for Sync, Follow-Up, Delay-Req, Delay-Resp and Announce
//! - One-step and two-step synchronization
//! - Round-trip delay estimation with outlier rejection and smoothing
//! - Clock drift estimation in parts-per-2³² with oscillator rate trimming
//! - Priority-based server selection with graceful aging of silent servers
//!
//! ## Example
//!
//! ```rust,no_run
//! use ptpsync::{PtpClient, PtpConfig};
//!
//! # async fn example() -> Result<(), ptpsync::PtpError> {
//! let mut client = PtpClient::start(PtpConfig::default()).await?;
//! let status = client.status();
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! tokio::spawn(async move { client.run(shutdown_rx).await });
//!
//! // Inspect synchronization state from any task.
//! println!("RTT: {} ns, drift: {} q32", status.rtt(), status.clock_drift());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
/// Client configuration
pub mod config;
/// Error types
pub mod error;
pub mod net;
pub mod protocol;

pub mod client;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use client::{PtpClient, SharedStatus};
pub use clock::{HardwareClock, SystemClock};
pub use config::PtpConfig;
pub use error::PtpError;
pub use net::{Datagram, Transport, UdpTransport};
pub use protocol::{ClockId, Timestamp};
