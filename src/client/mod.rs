//! The PTP client: protocol state machine, scheduling, clock discipline.
//!
//! Single-threaded by construction: every handler runs on the one event task
//! that owns the [`PtpClient`], so the mutable protocol state needs no
//! locking. The atomic snapshot in [`SharedStatus`] is the only cross-task
//! surface. Changing this architecture should be done with care.
//!
//! ## State machine
//!
//! ```text
//!               Sync (two-step)          Follow-Up (seq match)
//!   IDLE ---------------------> WAIT_FOR_FOLLOW_UP ----------> IDLE
//!     |                                   |
//!     | delay-req timer                   | delay-req timer
//!     v                                   v
//!   WAIT_FOR_DELAY_RESP <---------------- (short retry timer)
//!     |            ^ Delay-Req timeout: resend
//!     | Delay-Resp (seq + client id match): update RTT
//!     v
//!   IDLE
//! ```
//!
//! One-step Syncs adjust the clock immediately and return to `IDLE`.
//! Announces are evaluated in every state and may switch the selected
//! server, which abandons any in-flight exchange.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::clock::{HardwareClock, SystemClock};
use crate::config::PtpConfig;
use crate::error::PtpError;
use crate::net::{Datagram, Transport, UdpTransport};
use crate::protocol::message::{encode_delay_req, AnnounceBody, Body, DelayRespBody, Header};
use crate::protocol::{ClockId, Message, Timestamp, FLAG_TWO_STEP};

mod filter;
mod selector;
mod status;

#[cfg(test)]
mod tests;

use filter::{DelayFilter, DriftFilter};
use selector::{AnnounceOutcome, ServerSelector};
pub use status::SharedStatus;

/// Synchronization phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Not currently synchronizing.
    Idle,
    /// Got a two-step Sync, waiting for its Follow-Up.
    WaitForFollowUp,
    /// Sent a Delay-Req, waiting for the Delay-Resp.
    WaitForDelayResp,
}

/// A PTP client synchronizing a hardware clock to a remote server.
///
/// Generic over the [`Transport`] and the [`HardwareClock`] so the protocol
/// logic is identical on real timestamping hardware and in tests.
pub struct PtpClient<T, C> {
    transport: T,
    clock: Arc<C>,
    config: PtpConfig,
    status: Arc<SharedStatus>,
    selector: ServerSelector,
    delay_filter: DelayFilter,
    drift_filter: DriftFilter,
    phase: Phase,
    local_clock_id: ClockId,
    /// Sequence id of the last Sync, matched against its Follow-Up.
    sync_sequence_id: u16,
    /// Sequence id of the last Delay-Req, matched against its Delay-Resp.
    delay_req_sequence_id: u16,
    /// RX timestamp of a two-step Sync awaiting its Follow-Up, or TX
    /// timestamp of an in-flight Delay-Req.
    pending_ts: Timestamp,
    /// Deadline of the single scheduler timer; re-armed, never duplicated.
    timer_deadline: Option<tokio::time::Instant>,
}

impl PtpClient<UdpTransport<SystemClock>, SystemClock> {
    /// Discover an IPv6 interface, join the PTP multicast group, and build
    /// a client around the host software clock.
    ///
    /// The clock id is derived once from the discovered interface address
    /// and stays fixed for the life of the client.
    ///
    /// # Errors
    /// See [`UdpTransport::start`]; sockets acquired before a failure are
    /// released.
    pub async fn start(config: PtpConfig) -> Result<Self, PtpError> {
        let clock = Arc::new(SystemClock::new());
        let transport = UdpTransport::start(Arc::clone(&clock)).await?;
        let clock_id = ClockId::from_seed(&transport.local_ip().octets());
        Ok(Self::new(transport, clock, config, clock_id))
    }

    /// Release both sockets and leave the multicast group.
    pub fn stop(self) {
        self.transport.stop();
    }
}

impl<T: Transport, C: HardwareClock> PtpClient<T, C> {
    /// Create a client from its collaborators.
    pub fn new(transport: T, clock: Arc<C>, config: PtpConfig, local_clock_id: ClockId) -> Self {
        let status = Arc::new(SharedStatus::new());
        status.set_local_clock_id(local_clock_id);
        let delay_filter = DelayFilter::new(
            config.rtt_plausibility_limit_ns,
            config.rtt_filter_shift,
        );
        let drift_filter = DriftFilter::new(
            config.drift_plausibility_limit_q32,
            config.drift_filter_shift,
        );
        Self {
            transport,
            clock,
            config,
            status,
            selector: ServerSelector::new(),
            delay_filter,
            drift_filter,
            phase: Phase::Idle,
            local_clock_id,
            sync_sequence_id: 0,
            delay_req_sequence_id: 0,
            pending_ts: 0,
            timer_deadline: None,
        }
    }

    /// Handle to the shared synchronization state, readable from any task.
    #[must_use]
    pub fn status(&self) -> Arc<SharedStatus> {
        Arc::clone(&self.status)
    }

    /// Run the event loop until `shutdown` flips to `true`.
    ///
    /// # Errors
    /// Returns the underlying I/O error when receiving fails for anything
    /// other than a transient connection reset.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
        loop {
            let deadline = self.timer_deadline;
            tokio::select! {
                result = self.transport.recv() => {
                    match result {
                        Ok(datagram) => self.handle_datagram(&datagram),
                        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => {
                            // ICMP port-unreachable echo; benign for UDP.
                            tracing::debug!(error = %e, "transient receive error");
                        }
                        Err(e) => return Err(e),
                    }
                }

                () = timer_wait(deadline), if deadline.is_some() => {
                    self.on_timer().await;
                }

                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("PTP client shutting down");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Dispatch one received datagram.
    ///
    /// Without an RX timestamp no synchronization is possible, so the
    /// datagram is dropped wholesale. Malformed messages and types the
    /// client does not consume are discarded with a debug trace only.
    fn handle_datagram(&mut self, datagram: &Datagram) {
        let Some(rx_ts) = datagram.rx_timestamp else {
            tracing::error!("no RX timestamp");
            return;
        };
        let message = match Message::decode(&datagram.payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "discarding PTP message");
                return;
            }
        };
        match message.body {
            Body::Sync => self.on_sync(&message.header, rx_ts),
            Body::FollowUp => self.on_follow_up(&message.header),
            Body::DelayResp(body) => self.on_delay_resp(&message.header, &body),
            Body::Announce(body) => self.on_announce(&message.header, &body),
            Body::Other => {
                tracing::debug!(
                    message_type = message.header.message_type,
                    "ignoring unhandled PTP message type"
                );
            }
        }
    }

    fn on_sync(&mut self, header: &Header, rx_ts: Timestamp) {
        if !self.selector.is_selected(header.clock_identity) {
            return;
        }
        self.sync_sequence_id = header.sequence_id;
        tracing::debug!(
            sequence_id = header.sequence_id,
            flags = header.flags,
            "got sync"
        );
        if header.flags & FLAG_TWO_STEP == 0 {
            // One-step: the timestamp was stamped by the server's hardware
            // at emission; no follow-up will arrive.
            self.adjust_time(header.timestamp.to_nanos(), rx_ts);
            self.phase = Phase::Idle;
        } else {
            // The precise send time arrives in the follow-up.
            self.pending_ts = rx_ts;
            self.phase = Phase::WaitForFollowUp;
        }
    }

    fn on_follow_up(&mut self, header: &Header) {
        if self.selector.is_selected(header.clock_identity)
            && self.phase == Phase::WaitForFollowUp
        {
            if header.sequence_id != self.sync_sequence_id {
                tracing::debug!(
                    sequence_id = header.sequence_id,
                    "ignoring follow-up with unexpected sequence id"
                );
                return;
            }
            self.adjust_time(header.timestamp.to_nanos(), self.pending_ts);
            self.phase = Phase::Idle;
            return;
        }
        tracing::debug!("ignoring unexpected follow-up");
    }

    fn on_delay_resp(&mut self, header: &Header, body: &DelayRespBody) {
        if self.selector.is_selected(header.clock_identity)
            && self.phase == Phase::WaitForDelayResp
        {
            if body.client_clock_identity != self.local_clock_id {
                tracing::debug!("ignoring delay response intended for another client");
                return;
            }
            if header.sequence_id != self.delay_req_sequence_id {
                tracing::debug!(
                    sequence_id = header.sequence_id,
                    "ignoring delay response with unexpected sequence id"
                );
                return;
            }
            self.adjust_rtt(self.pending_ts, header.timestamp.to_nanos());
            self.phase = Phase::Idle;
            self.set_timer(self.config.delay_req_interval);
            return;
        }
        tracing::debug!("ignoring unexpected delay response");
    }

    fn on_announce(&mut self, header: &Header, body: &AnnounceBody) {
        match self.selector.on_announce(header.clock_identity, body.priority1) {
            AnnounceOutcome::Refreshed => {
                self.status.set_utc_offset(body.utc_offset);
            }
            AnnounceOutcome::Switched => {
                tracing::debug!(
                    server = %header.clock_identity,
                    priority1 = body.priority1,
                    "switching to new PTP server"
                );
                // Abandon any in-flight exchange with the old server.
                self.phase = Phase::Idle;
                self.status.set_server_clock_id(header.clock_identity);
                // The network delay to the new server is unknown.
                self.status.set_rtt(0);
                self.drift_filter.reset_history();
                self.status.set_utc_offset(body.utc_offset);
                // Trigger a fresh delay measurement.
                self.set_timer(self.config.delay_req_interval);
            }
            AnnounceOutcome::Ignored => {}
        }
    }

    /// Scheduler tick: retry pending exchanges, emit the periodic
    /// Delay-Req, and age the selected server.
    async fn on_timer(&mut self) {
        self.timer_deadline = None;
        match self.phase {
            Phase::WaitForDelayResp => {
                tracing::debug!("delay response timed out, sending new request");
            }
            Phase::WaitForFollowUp => {
                tracing::debug!("follow-up outstanding, short-cycling the delay request");
                self.set_timer(self.config.delay_req_timeout);
            }
            Phase::Idle => {}
        }

        if self.selector.selected().is_some() {
            self.send_delay_req().await;
        } else {
            self.set_timer(self.config.delay_req_interval);
        }

        // Degrade the selected server a little on every tick; its own
        // Announces restore the value while it is alive.
        self.selector.age();
    }

    /// Emit a Delay-Req and arm the response timeout.
    ///
    /// Synchronization state only advances when the transport delivered a
    /// TX timestamp; otherwise the exchange is skipped and retried on the
    /// next periodic tick.
    async fn send_delay_req(&mut self) {
        self.delay_req_sequence_id = self.delay_req_sequence_id.wrapping_add(1);
        let frame = encode_delay_req(self.local_clock_id, self.delay_req_sequence_id);
        match self.transport.send_event(&frame).await {
            Err(e) => {
                tracing::error!(error = %e, "delay request send failed");
                self.phase = Phase::Idle;
                self.set_timer(self.config.delay_req_interval);
            }
            Ok(None) => {
                tracing::warn!("no TX timestamp, cannot determine network delay");
                self.phase = Phase::Idle;
                self.set_timer(self.config.delay_req_interval);
            }
            Ok(Some(tx_ts)) => {
                self.pending_ts = tx_ts;
                self.phase = Phase::WaitForDelayResp;
                tracing::debug!(
                    sequence_id = self.delay_req_sequence_id,
                    "waiting for delay response"
                );
                self.set_timer(self.config.delay_req_timeout);
            }
        }
    }

    /// Step the clock towards `server_time` and fold the step into the
    /// drift estimate.
    fn adjust_time(&mut self, server_time: Timestamp, local_time: Timestamp) {
        // The one-way path is assumed to be half the round trip.
        let offset_ns = server_time - local_time + i64::from(self.status.rtt()) / 2;
        self.clock.adjust(offset_ns);
        tracing::debug!(offset_ns, "stepped clock");

        if let Some(drift) =
            self.drift_filter
                .update(self.status.clock_drift(), offset_ns, server_time)
        {
            self.status.set_clock_drift(drift);
            if self.clock.supports_rate_adjustment() {
                self.clock.adjust_rate(drift);
            }
        }
    }

    /// Fold a completed delay exchange into the RTT estimate.
    fn adjust_rtt(&mut self, sent: Timestamp, received: Timestamp) {
        let previous = self.status.rtt();
        // Undo the half-RTT compensation the clock discipline baked into
        // the TX timestamp: a synchronized local clock already runs server
        // time, so received - sent alone is only the one-way delay.
        let raw = received - (sent - i64::from(previous) / 2);
        self.status.set_rtt(self.delay_filter.update(previous, raw));
        // Do not estimate clock drift across an RTT change.
        self.drift_filter.reset_history();
    }

    /// Arm (or re-arm) the scheduler timer.
    ///
    /// A pseudorandom jitter of up to 2²⁰ µs is added so that many clients
    /// sharing a server spread their requests. The previous deadline, if
    /// any, is discarded; there is never more than one pending expiry.
    fn set_timer(&mut self, base: Duration) {
        let jitter = Duration::from_micros(u64::from(rand::random::<u32>() & 0xf_ffff));
        self.timer_deadline = Some(tokio::time::Instant::now() + base + jitter);
    }
}

async fn timer_wait(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        // Branch is disabled by the select! guard; pend for completeness.
        None => std::future::pending().await,
    }
}
