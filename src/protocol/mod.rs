//! PTP wire protocol (IEEE 1588 v2).
//!
//! ## Ports
//!
//! - **319**: Event messages (Sync, Delay-Req), hardware timestamped.
//! - **320**: General messages (Follow-Up, Delay-Resp, Announce).
//!
//! ## Synchronization flow (client view)
//!
//! ```text
//! Server                            Client
//!   |--- Sync (T1, maybe 2-step) ---->|  (client records RX stamp)
//!   |--- Follow-Up (precise T1) ----->|  (two-step only)
//!   |                                 |  step clock by T1 - RX + RTT/2
//!   |<------ Delay-Req (TX stamp) ----|
//!   |--- Delay-Resp (capture time) -->|  update RTT estimate
//! ```

use std::net::Ipv6Addr;

pub mod message;
pub mod timestamp;


// Re-exports for convenient access.
pub use message::{
    AnnounceBody, Body, ClockId, DelayRespBody, Header, Message, MessageError, MessageType,
};
pub use timestamp::{Timestamp, WireTimestamp, NANOS_PER_SEC};

/// UDP port for event messages (Sync, Delay-Req).
pub const PORT_EVENT: u16 = 319;

/// UDP port for general messages (Follow-Up, Delay-Resp, Announce).
pub const PORT_GENERAL: u16 = 320;

/// Primary PTP IPv6 multicast group `ff0e::181`.
pub const PRIMARY_GROUP: Ipv6Addr = Ipv6Addr::new(0xff0e, 0, 0, 0, 0, 0, 0, 0x181);

/// The server operates in unicast mode.
pub const FLAG_UNICAST: u16 = 0x0400;

/// A Follow-Up carrying the precise timestamp trails this Sync.
pub const FLAG_TWO_STEP: u16 = 0x0200;

/// The UTC offset stated in an Announce is valid.
pub const FLAG_UTC_OFFSET_VALID: u16 = 0x0004;
