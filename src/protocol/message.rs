//! PTP message parsing and encoding.
//!
//! Covers the common 44-byte header (the 34-byte fixed part plus the
//! trailing 48+32-bit timestamp) and the bodies of the message variants this
//! client consumes. All multi-byte integers are network byte order.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::timestamp::WireTimestamp;

/// PTP message type identifiers (IEEE 1588 section 13.3.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Sync (server → client), carries the server send time.
    Sync = 0x0,
    /// Delay request (client → server), hardware timestamped on emission.
    DelayReq = 0x1,
    /// Follow-up (server → client), carries the precise Sync send time.
    FollowUp = 0x8,
    /// Delay response (server → client), carries the Delay-Req capture time.
    DelayResp = 0x9,
    /// Announce (server → client), advertises identity and priority.
    Announce = 0xb,
}

impl MessageType {
    /// Parse from the lower 4 bits of a byte.
    ///
    /// Returns `None` for types this client does not handle.
    #[must_use]
    pub fn from_nibble(value: u8) -> Option<Self> {
        match value & 0x0f {
            0x0 => Some(Self::Sync),
            0x1 => Some(Self::DelayReq),
            0x8 => Some(Self::FollowUp),
            0x9 => Some(Self::DelayResp),
            0xb => Some(Self::Announce),
            _ => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "Sync"),
            Self::DelayReq => write!(f, "Delay_Req"),
            Self::FollowUp => write!(f, "Follow_Up"),
            Self::DelayResp => write!(f, "Delay_Resp"),
            Self::Announce => write!(f, "Announce"),
        }
    }
}

/// Opaque 8-byte identifier of a PTP clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClockId(pub [u8; 8]);

impl ClockId {
    /// Size in bytes on the wire.
    pub const SIZE: usize = 8;

    /// Derive a clock id from a stable local seed.
    ///
    /// The same seed always yields the same id, so an interface address or
    /// serial number gives an identity that survives restarts.
    #[must_use]
    pub fn from_seed(seed: &[u8]) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        seed.hash(&mut hasher);
        Self(hasher.finish().to_be_bytes())
    }

    /// Pack into a `u64` for word-sized atomic publication.
    #[must_use]
    pub fn to_bits(self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    /// Unpack from the [`ClockId::to_bits`] representation.
    #[must_use]
    pub fn from_bits(bits: u64) -> Self {
        Self(bits.to_be_bytes())
    }
}

impl fmt::Display for ClockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.to_bits())
    }
}

/// Common message header, including the trailing origin timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Subdomain number, major part (upper nibble of byte 0).
    pub major_sdo_id: u8,
    /// Raw message type nibble; see [`MessageType::from_nibble`].
    pub message_type: u8,
    /// PTP version, major part.
    pub version_major: u8,
    /// PTP version, minor part.
    pub version_minor: u8,
    /// Total message length in bytes, including this header.
    pub length: u16,
    /// Domain number of the originating clock.
    pub domain: u8,
    /// Subdomain number, minor part.
    pub minor_sdo_id: u8,
    /// Flags bitmask; see the `FLAG_*` constants.
    pub flags: u16,
    /// Correction field; unused by this client but preserved.
    pub correction: [u8; 8],
    /// Contents depend on the message type.
    pub type_specific: [u8; 4],
    /// Identity of the sending clock.
    pub clock_identity: ClockId,
    /// Id of the sending port.
    pub source_port_id: u16,
    /// Matches Follow-Up to Sync and Delay-Resp to Delay-Req.
    pub sequence_id: u16,
    /// Obsolete control field.
    pub control: u8,
    /// Log message interval; meaning depends on the message type.
    pub log_msg_interval: u8,
    /// Origin timestamp trailing the fixed header fields.
    pub timestamp: WireTimestamp,
}

impl Header {
    /// Size on the wire, including the trailing timestamp.
    pub const SIZE: usize = 44;

    fn decode(data: &[u8]) -> Self {
        debug_assert!(data.len() >= Self::SIZE);
        let mut correction = [0u8; 8];
        correction.copy_from_slice(&data[8..16]);
        let mut type_specific = [0u8; 4];
        type_specific.copy_from_slice(&data[16..20]);
        let mut clock_identity = [0u8; 8];
        clock_identity.copy_from_slice(&data[20..28]);
        Self {
            major_sdo_id: data[0] >> 4,
            message_type: data[0] & 0x0f,
            version_major: data[1] & 0x0f,
            version_minor: data[1] >> 4,
            length: u16::from_be_bytes([data[2], data[3]]),
            domain: data[4],
            minor_sdo_id: data[5],
            flags: u16::from_be_bytes([data[6], data[7]]),
            correction,
            type_specific,
            clock_identity: ClockId(clock_identity),
            source_port_id: u16::from_be_bytes([data[28], data[29]]),
            sequence_id: u16::from_be_bytes([data[30], data[31]]),
            control: data[32],
            log_msg_interval: data[33],
            timestamp: WireTimestamp::decode(&data[34..44]).unwrap_or_default(),
        }
    }
}

/// Body of an Announce message, appended to the common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnounceBody {
    /// Offset between UTC and TAI in seconds (leap seconds).
    pub utc_offset: u16,
    /// Administrator-assigned priority; lower number = higher priority.
    pub priority1: u8,
    /// Quality of the grandmaster clock (opaque).
    pub clock_quality: [u8; 4],
    /// Secondary administrator-assigned priority.
    pub priority2: u8,
    /// Identity of the grandmaster clock.
    pub grandmaster_identity: ClockId,
    /// Distance to the grandmaster in communication paths.
    pub steps_removed: u16,
    /// Time source byte, e.g. GNSS or atomic clock.
    pub time_source: u8,
}

/// Body of a Delay-Resp message, appended to the common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRespBody {
    /// Clock identity of the requesting client.
    pub client_clock_identity: ClockId,
    /// Port id of the requesting client.
    pub client_source_port_id: u16,
}

/// A parsed PTP message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    /// The common header (origin timestamp included).
    pub header: Header,
    /// The typed message body.
    pub body: Body,
}

/// Typed message bodies.
///
/// Sync and Follow-Up carry no payload beyond the header timestamp. Types
/// this client does not consume (including Delay-Req from other clients on
/// the multicast group) decode as [`Body::Other`] and are ignored upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    /// Sync; the header timestamp is the (possibly imprecise) send time.
    Sync,
    /// Follow-Up; the header timestamp is the precise Sync send time.
    FollowUp,
    /// Delay-Resp; the header timestamp is the Delay-Req capture time.
    DelayResp(DelayRespBody),
    /// Announce.
    Announce(AnnounceBody),
    /// Any message type this client ignores.
    Other,
}

/// Errors from PTP message parsing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// The message is not PTP version 2.0 or 2.1.
    #[error("unsupported PTP version {major}.{minor}")]
    BadVersion {
        /// Major version from the header.
        major: u8,
        /// Minor version from the header.
        minor: u8,
    },
    /// The payload is smaller than the message requires.
    #[error("message too short: need {needed} bytes, have {have}")]
    Truncated {
        /// Minimum bytes needed.
        needed: usize,
        /// Bytes actually available.
        have: usize,
    },
    /// The header declares more bytes than the datagram delivered.
    #[error("declared length {declared} exceeds payload of {have} bytes")]
    LengthMismatch {
        /// Length field from the header.
        declared: u16,
        /// Bytes actually available.
        have: usize,
    },
}

/// Value of the obsolete control field in a Delay-Req.
pub const DELAY_REQ_CONTROL: u8 = 1;

/// Log message interval for a Delay-Req (table 42 of the standard).
pub const DELAY_REQ_LOG_INTERVAL: u8 = 0x7f;

impl Message {
    /// Total wire length of an Announce.
    pub const ANNOUNCE_LEN: usize = 64;

    /// Total wire length of a Delay-Resp.
    pub const DELAY_RESP_LEN: usize = 54;

    /// Parse a datagram into a typed message.
    ///
    /// # Errors
    /// [`MessageError::Truncated`] if the payload is smaller than the header
    /// or the variant-specific length, [`MessageError::BadVersion`] for
    /// anything but PTP 2.0/2.1, and [`MessageError::LengthMismatch`] if the
    /// header declares more bytes than were received.
    pub fn decode(data: &[u8]) -> Result<Self, MessageError> {
        if data.len() < Header::SIZE {
            return Err(MessageError::Truncated {
                needed: Header::SIZE,
                have: data.len(),
            });
        }
        let header = Header::decode(data);

        if header.version_major != 2 || header.version_minor > 1 {
            return Err(MessageError::BadVersion {
                major: header.version_major,
                minor: header.version_minor,
            });
        }
        if usize::from(header.length) > data.len() {
            return Err(MessageError::LengthMismatch {
                declared: header.length,
                have: data.len(),
            });
        }

        let body = match MessageType::from_nibble(header.message_type) {
            Some(MessageType::Sync) => Body::Sync,
            Some(MessageType::FollowUp) => Body::FollowUp,
            Some(MessageType::DelayResp) => {
                if data.len() < Self::DELAY_RESP_LEN {
                    return Err(MessageError::Truncated {
                        needed: Self::DELAY_RESP_LEN,
                        have: data.len(),
                    });
                }
                let mut identity = [0u8; 8];
                identity.copy_from_slice(&data[44..52]);
                Body::DelayResp(DelayRespBody {
                    client_clock_identity: ClockId(identity),
                    client_source_port_id: u16::from_be_bytes([data[52], data[53]]),
                })
            }
            Some(MessageType::Announce) => {
                if data.len() < Self::ANNOUNCE_LEN {
                    return Err(MessageError::Truncated {
                        needed: Self::ANNOUNCE_LEN,
                        have: data.len(),
                    });
                }
                let mut clock_quality = [0u8; 4];
                clock_quality.copy_from_slice(&data[48..52]);
                let mut identity = [0u8; 8];
                identity.copy_from_slice(&data[53..61]);
                Body::Announce(AnnounceBody {
                    utc_offset: u16::from_be_bytes([data[44], data[45]]),
                    priority1: data[47],
                    clock_quality,
                    priority2: data[52],
                    grandmaster_identity: ClockId(identity),
                    steps_removed: u16::from_be_bytes([data[61], data[62]]),
                    time_source: data[63],
                })
            }
            Some(MessageType::DelayReq) | None => Body::Other,
        };

        Ok(Self { header, body })
    }
}

/// Encode a Delay-Req into exactly the header length.
///
/// Per the protocol contract: version 2.0, the obsolete control byte set to
/// [`DELAY_REQ_CONTROL`], log interval [`DELAY_REQ_LOG_INTERVAL`], source
/// port id 1, and the local clock identity copied verbatim. The origin
/// timestamp is left zero; the hardware supplies the real send time.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    reason = "Header::SIZE is 44 and always fits in u16"
)]
pub fn encode_delay_req(clock_id: ClockId, sequence_id: u16) -> [u8; Header::SIZE] {
    let mut buf = [0u8; Header::SIZE];
    buf[0] = MessageType::DelayReq as u8;
    buf[1] = 2; // version 2.0
    buf[2..4].copy_from_slice(&(Header::SIZE as u16).to_be_bytes());
    buf[20..28].copy_from_slice(&clock_id.0);
    buf[28..30].copy_from_slice(&1u16.to_be_bytes());
    buf[30..32].copy_from_slice(&sequence_id.to_be_bytes());
    buf[32] = DELAY_REQ_CONTROL;
    buf[33] = DELAY_REQ_LOG_INTERVAL;
    buf
}
