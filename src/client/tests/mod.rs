use std::sync::Arc;

use bytes::Bytes;

use super::{Phase, PtpClient};
use crate::config::PtpConfig;
use crate::net::Datagram;
use crate::protocol::{ClockId, Timestamp, WireTimestamp, FLAG_TWO_STEP, NANOS_PER_SEC};
use crate::testing::{SimClock, SimTransport};

mod selector;

pub(crate) const LOCAL_ID: ClockId = ClockId([0x1c; 8]);
pub(crate) const SERVER_A: ClockId = ClockId([0xaa; 8]);
pub(crate) const SERVER_B: ClockId = ClockId([0xbb; 8]);

type TestClient = PtpClient<SimTransport, SimClock>;

/// Client with a simulated clock starting at 1 700 000 000 s.
fn build_client() -> (TestClient, Arc<SimClock>) {
    let clock = Arc::new(SimClock::new(1_700_000_000 * NANOS_PER_SEC));
    let client = PtpClient::new(
        SimTransport::new(),
        Arc::clone(&clock),
        PtpConfig::default(),
        LOCAL_ID,
    );
    (client, clock)
}

/// Client already tracking `SERVER_A` at the given priority.
fn client_with_server(priority1: u8) -> (TestClient, Arc<SimClock>) {
    let (mut client, clock) = build_client();
    deliver(&mut client, &announce_frame(SERVER_A, 0, priority1, 37), 0);
    (client, clock)
}

fn deliver(client: &mut TestClient, frame: &[u8], rx_ts: Timestamp) {
    client.handle_datagram(&Datagram {
        payload: Bytes::copy_from_slice(frame),
        rx_timestamp: Some(rx_ts),
    });
}

fn deliver_unstamped(client: &mut TestClient, frame: &[u8]) {
    client.handle_datagram(&Datagram {
        payload: Bytes::copy_from_slice(frame),
        rx_timestamp: None,
    });
}

/// Common header skeleton: version 2.0, the given type nibble, sender,
/// sequence id, flags and origin timestamp, zero-padded to `total_len`.
fn header_frame(
    msg_type: u8,
    sender: ClockId,
    sequence_id: u16,
    flags: u16,
    timestamp: WireTimestamp,
    total_len: usize,
) -> Vec<u8> {
    let mut buf = vec![0u8; total_len];
    buf[0] = msg_type;
    buf[1] = 2;
    #[allow(clippy::cast_possible_truncation)]
    buf[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
    buf[6..8].copy_from_slice(&flags.to_be_bytes());
    buf[20..28].copy_from_slice(&sender.0);
    buf[30..32].copy_from_slice(&sequence_id.to_be_bytes());
    buf[34..44].copy_from_slice(&timestamp.encode());
    buf
}

fn sync_frame(sender: ClockId, sequence_id: u16, flags: u16, origin: Timestamp) -> Vec<u8> {
    header_frame(
        0x0,
        sender,
        sequence_id,
        flags,
        WireTimestamp::from_nanos(origin),
        44,
    )
}

fn follow_up_frame(sender: ClockId, sequence_id: u16, origin: Timestamp) -> Vec<u8> {
    header_frame(
        0x8,
        sender,
        sequence_id,
        0,
        WireTimestamp::from_nanos(origin),
        44,
    )
}

fn delay_resp_frame(
    sender: ClockId,
    sequence_id: u16,
    capture: Timestamp,
    client_id: ClockId,
) -> Vec<u8> {
    let mut buf = header_frame(
        0x9,
        sender,
        sequence_id,
        0,
        WireTimestamp::from_nanos(capture),
        54,
    );
    buf[44..52].copy_from_slice(&client_id.0);
    buf[52..54].copy_from_slice(&1u16.to_be_bytes());
    buf
}

fn announce_frame(sender: ClockId, sequence_id: u16, priority1: u8, utc_offset: u16) -> Vec<u8> {
    let mut buf = header_frame(0xb, sender, sequence_id, 0, WireTimestamp::default(), 64);
    buf[44..46].copy_from_slice(&utc_offset.to_be_bytes());
    buf[47] = priority1;
    buf[53..61].copy_from_slice(&sender.0);
    buf
}
