//! Test doubles for the transport and the hardware clock.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::clock::HardwareClock;
use crate::net::{Datagram, Transport};
use crate::protocol::Timestamp;

/// Scriptable clock that records every adjustment.
#[derive(Debug)]
pub(crate) struct SimClock {
    now: AtomicI64,
    pub(crate) steps: Mutex<Vec<i64>>,
    pub(crate) rate_steps: Mutex<Vec<i32>>,
}

impl SimClock {
    pub(crate) fn new(now: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(now),
            steps: Mutex::new(Vec::new()),
            rate_steps: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn last_step(&self) -> Option<i64> {
        self.steps.lock().unwrap().last().copied()
    }

    pub(crate) fn step_count(&self) -> usize {
        self.steps.lock().unwrap().len()
    }

    pub(crate) fn last_rate(&self) -> Option<i32> {
        self.rate_steps.lock().unwrap().last().copied()
    }
}

impl HardwareClock for SimClock {
    fn read(&self) -> Timestamp {
        self.now.load(Ordering::Relaxed)
    }

    fn adjust(&self, delta_ns: i64) {
        self.now.fetch_add(delta_ns, Ordering::Relaxed);
        self.steps.lock().unwrap().push(delta_ns);
    }

    fn supports_rate_adjustment(&self) -> bool {
        true
    }

    fn adjust_rate(&self, drift_q32: i32) {
        self.rate_steps.lock().unwrap().push(drift_q32);
    }
}

/// Transport double: records sent frames and scripts TX timestamps and
/// incoming datagrams.
#[derive(Debug)]
pub(crate) struct SimTransport {
    pub(crate) sent: Vec<Vec<u8>>,
    pub(crate) incoming: VecDeque<Datagram>,
    /// Result reported for every send; `None` simulates hardware that
    /// failed to capture a TX timestamp.
    pub(crate) tx_timestamp: Option<Timestamp>,
    pub(crate) fail_sends: bool,
}

impl SimTransport {
    pub(crate) fn new() -> Self {
        Self {
            sent: Vec::new(),
            incoming: VecDeque::new(),
            tx_timestamp: Some(0),
            fail_sends: false,
        }
    }

    pub(crate) fn push_incoming(&mut self, payload: &[u8], rx_timestamp: Option<Timestamp>) {
        self.incoming.push_back(Datagram {
            payload: Bytes::copy_from_slice(payload),
            rx_timestamp,
        });
    }
}

#[async_trait]
impl Transport for SimTransport {
    async fn recv(&mut self) -> io::Result<Datagram> {
        match self.incoming.pop_front() {
            Some(datagram) => Ok(datagram),
            None => std::future::pending().await,
        }
    }

    async fn send_event(&mut self, payload: &[u8]) -> io::Result<Option<Timestamp>> {
        if self.fail_sends {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "send failed"));
        }
        self.sent.push(payload.to_vec());
        Ok(self.tx_timestamp)
    }
}
