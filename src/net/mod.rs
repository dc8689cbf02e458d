//! UDP transport for PTP message exchange.
//!
//! Binds the event (319) and general (320) ports, joins the primary PTP
//! multicast group, and surfaces per-datagram timestamps. The socket pair is
//! a scoped acquisition: dropping the transport releases everything, which
//! also covers a partially failed [`UdpTransport::start`].

use std::io;
use std::net::{Ipv6Addr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::net::UdpSocket;

use crate::clock::HardwareClock;
use crate::error::PtpError;
use crate::protocol::{Timestamp, PORT_EVENT, PORT_GENERAL, PRIMARY_GROUP};

/// A received datagram with its reception metadata.
#[derive(Debug, Clone)]
pub struct Datagram {
    /// UDP payload.
    pub payload: Bytes,
    /// Hardware receive timestamp, captured at the start-of-frame delimiter
    /// when the MAC supports it. `None` means no synchronization is possible
    /// from this datagram.
    pub rx_timestamp: Option<Timestamp>,
}

/// Datagram send/receive with timestamping.
///
/// The contract the client depends on: `recv` delivers one datagram at a
/// time from either PTP port, and `send_event` requests a TX timestamp for
/// the emitted frame.
#[async_trait]
pub trait Transport: Send {
    /// Receive the next datagram from either PTP port.
    async fn recv(&mut self) -> io::Result<Datagram>;

    /// Send an event-port datagram to the primary multicast group and
    /// request a TX timestamp.
    ///
    /// Returns `None` when the hardware did not deliver a timestamp; the
    /// caller must not use the exchange for synchronization in that case.
    async fn send_event(&mut self, payload: &[u8]) -> io::Result<Option<Timestamp>>;
}

/// [`Transport`] over two tokio UDP sockets.
///
/// Timestamps are taken from the supplied [`HardwareClock`] as close to the
/// socket operations as the host allows. Deployments with driver-level
/// start-of-frame timestamping replace this with their own [`Transport`]
/// implementation; the client logic is identical either way.
pub struct UdpTransport<C> {
    event: UdpSocket,
    general: UdpSocket,
    clock: Arc<C>,
    local_ip: Ipv6Addr,
}

/// Receive buffer size; generously above the 64-byte Announce.
const RECV_BUF_SIZE: usize = 256;

impl<C: HardwareClock> UdpTransport<C> {
    /// Bind both PTP ports and join the primary multicast group.
    ///
    /// The local interface is discovered by asking the routing layer which
    /// source address it would use to reach the multicast group.
    ///
    /// # Errors
    /// [`PtpError::NoInterface`] when no IPv6 route to the group exists,
    /// [`PtpError::SocketCreateFailed`] when a port cannot be bound, and
    /// [`PtpError::GroupJoinFailed`] when the multicast join is refused.
    /// Any socket bound before the failure is released on return.
    pub async fn start(clock: Arc<C>) -> Result<Self, PtpError> {
        let local_ip = discover_local_ipv6().await?;

        let event = bind(PORT_EVENT).await?;
        event
            .join_multicast_v6(&PRIMARY_GROUP, 0)
            .map_err(PtpError::GroupJoinFailed)?;
        let general = bind(PORT_GENERAL).await?;

        Ok(Self {
            event,
            general,
            clock,
            local_ip,
        })
    }

    /// The local IPv6 address the transport operates on.
    #[must_use]
    pub fn local_ip(&self) -> Ipv6Addr {
        self.local_ip
    }

    /// Leave the multicast group and release both sockets.
    pub fn stop(self) {
        if let Err(e) = self.event.leave_multicast_v6(&PRIMARY_GROUP, 0) {
            tracing::debug!(error = %e, "leaving PTP multicast group failed");
        }
        // Sockets close on drop.
    }
}

#[async_trait]
impl<C: HardwareClock> Transport for UdpTransport<C> {
    async fn recv(&mut self) -> io::Result<Datagram> {
        let mut event_buf = [0u8; RECV_BUF_SIZE];
        let mut general_buf = [0u8; RECV_BUF_SIZE];
        let payload = tokio::select! {
            res = self.event.recv_from(&mut event_buf) => {
                let (len, _src) = res?;
                Bytes::copy_from_slice(&event_buf[..len])
            }
            res = self.general.recv_from(&mut general_buf) => {
                let (len, _src) = res?;
                Bytes::copy_from_slice(&general_buf[..len])
            }
        };
        Ok(Datagram {
            payload,
            rx_timestamp: Some(self.clock.read()),
        })
    }

    async fn send_event(&mut self, payload: &[u8]) -> io::Result<Option<Timestamp>> {
        let dest = SocketAddr::from((PRIMARY_GROUP, PORT_EVENT));
        self.event.send_to(payload, dest).await?;
        Ok(Some(self.clock.read()))
    }
}

async fn bind(port: u16) -> Result<UdpSocket, PtpError> {
    UdpSocket::bind((Ipv6Addr::UNSPECIFIED, port))
        .await
        .map_err(|source| PtpError::SocketCreateFailed { port, source })
}

/// Find the first usable IPv6 source address.
///
/// Connecting an unbound UDP socket performs no I/O but makes the routing
/// layer pick the interface and source address it would use for the PTP
/// multicast group.
async fn discover_local_ipv6() -> Result<Ipv6Addr, PtpError> {
    let probe = UdpSocket::bind((Ipv6Addr::UNSPECIFIED, 0))
        .await
        .map_err(|source| PtpError::SocketCreateFailed { port: 0, source })?;
    probe
        .connect((PRIMARY_GROUP, PORT_EVENT))
        .await
        .map_err(|_| PtpError::NoInterface)?;
    match probe.local_addr().map_err(|_| PtpError::NoInterface)? {
        SocketAddr::V6(addr) => Ok(*addr.ip()),
        SocketAddr::V4(_) => Err(PtpError::NoInterface),
    }
}
