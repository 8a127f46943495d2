//! Minecraft Server List Ping framing and packets.
//!
//! Every frame is `VarInt length | VarInt packet id | payload`, where the
//! length covers the packet id and payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};

use crate::common::error::{ProbeError, ProbeResult};

/// Protocol version sent in the handshake. Servers answer status requests
/// for any version, 47 (1.8) is what most ping clients send.
pub const PROTOCOL_VERSION: i32 = 47;

/// Largest frame a vanilla server will send (3-byte VarInt).
const MAX_FRAME_LEN: usize = 2_097_151;

pub const HANDSHAKE_ID: i32 = 0x00;
pub const STATUS_REQUEST_ID: i32 = 0x00;
pub const STATUS_RESPONSE_ID: i32 = 0x00;
pub const PING_ID: i32 = 0x01;
pub const PONG_ID: i32 = 0x01;

/// A Server List Ping packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(id: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    pub fn empty(id: i32) -> Self {
        Self {
            id,
            payload: Bytes::new(),
        }
    }
}

/// Trait for types that can be encoded into a packet.
pub trait PacketEncode {
    const ID: i32;

    fn encode(&self, buf: &mut BytesMut);

    fn to_packet(&self) -> Packet {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        Packet::new(Self::ID, buf.freeze())
    }
}

/// Trait for types that can be decoded from packet payload.
pub trait PacketDecode: Sized {
    const ID: i32;

    fn decode(buf: &mut Bytes) -> ProbeResult<Self>;

    fn from_packet(packet: Packet) -> ProbeResult<Self> {
        if packet.id != Self::ID {
            return Err(ProbeError::UnexpectedPacket {
                expected: Self::ID,
                actual: packet.id,
            });
        }
        let mut payload = packet.payload;
        Self::decode(&mut payload)
    }
}

/// Handshake with next state = status.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub protocol_version: i32,
    pub host: String,
    pub port: u16,
}

impl PacketEncode for Handshake {
    const ID: i32 = HANDSHAKE_ID;

    fn encode(&self, buf: &mut BytesMut) {
        put_varint(buf, self.protocol_version);
        put_string(buf, &self.host);
        buf.put_u16(self.port);
        put_varint(buf, 1);
    }
}

#[derive(Debug, Clone)]
pub struct StatusRequest;

impl PacketEncode for StatusRequest {
    const ID: i32 = STATUS_REQUEST_ID;

    fn encode(&self, _buf: &mut BytesMut) {}
}

/// Status response carrying the server's JSON document.
#[derive(Debug, Clone)]
pub struct StatusResponse {
    pub json: String,
}

impl PacketEncode for StatusResponse {
    const ID: i32 = STATUS_RESPONSE_ID;

    fn encode(&self, buf: &mut BytesMut) {
        put_string(buf, &self.json);
    }
}

impl PacketDecode for StatusResponse {
    const ID: i32 = STATUS_RESPONSE_ID;

    fn decode(buf: &mut Bytes) -> ProbeResult<Self> {
        Ok(Self {
            json: get_string(buf)?,
        })
    }
}

/// Ping and pong share a layout: a single i64 echoed back by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping(pub i64);

impl PacketEncode for Ping {
    const ID: i32 = PING_ID;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_i64(self.0);
    }
}

impl PacketDecode for Ping {
    const ID: i32 = PONG_ID;

    fn decode(buf: &mut Bytes) -> ProbeResult<Self> {
        if buf.remaining() < 8 {
            return Err(ProbeError::InvalidPacket {
                message: format!("pong needs 8 bytes, got {}", buf.remaining()),
            });
        }
        Ok(Self(buf.get_i64()))
    }
}

/// Codec for Server List Ping frames.
#[derive(Debug, Default)]
pub struct SlpCodec;

impl Decoder for SlpCodec {
    type Item = Packet;
    type Error = ProbeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some((frame_len, header_len)) = peek_varint(src)? else {
            return Ok(None);
        };

        let frame_len = usize::try_from(frame_len)
            .ok()
            .filter(|len| *len > 0 && *len <= MAX_FRAME_LEN)
            .ok_or_else(|| ProbeError::InvalidPacket {
                message: format!("bad frame length {}", frame_len),
            })?;

        if src.len() < header_len + frame_len {
            src.reserve(header_len + frame_len - src.len());
            return Ok(None);
        }

        src.advance(header_len);
        let mut frame = src.split_to(frame_len).freeze();
        let id = get_varint(&mut frame)?;

        Ok(Some(Packet { id, payload: frame }))
    }
}

impl Encoder<Packet> for SlpCodec {
    type Error = ProbeError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut id = BytesMut::with_capacity(5);
        put_varint(&mut id, item.id);

        let frame_len = id.len() + item.payload.len();
        dst.reserve(5 + frame_len);
        put_varint(dst, frame_len as i32);
        dst.put_slice(&id);
        dst.put_slice(&item.payload);
        Ok(())
    }
}

/// A framed Server List Ping connection.
pub type SlpConnection<S> = Framed<S, SlpCodec>;

pub fn new_connection<S: AsyncRead + AsyncWrite>(stream: S) -> SlpConnection<S> {
    Framed::new(stream, SlpCodec)
}

pub fn put_varint(buf: &mut BytesMut, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7f == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
}

/// Read a VarInt without consuming it. `Ok(None)` means more bytes are needed.
fn peek_varint(src: &[u8]) -> ProbeResult<Option<(i32, usize)>> {
    let mut value: u32 = 0;
    for (i, byte) in src.iter().take(5).enumerate() {
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((value as i32, i + 1)));
        }
    }
    if src.len() >= 5 {
        return Err(ProbeError::InvalidPacket {
            message: "VarInt is too long".to_string(),
        });
    }
    Ok(None)
}

pub fn get_varint(buf: &mut Bytes) -> ProbeResult<i32> {
    match peek_varint(buf)? {
        Some((value, len)) => {
            buf.advance(len);
            Ok(value)
        }
        None => Err(ProbeError::InvalidPacket {
            message: "truncated VarInt".to_string(),
        }),
    }
}

pub fn put_string(buf: &mut BytesMut, value: &str) {
    put_varint(buf, value.len() as i32);
    buf.put_slice(value.as_bytes());
}

pub fn get_string(buf: &mut Bytes) -> ProbeResult<String> {
    let len = get_varint(buf)?;
    let len = usize::try_from(len).map_err(|_| ProbeError::InvalidPacket {
        message: format!("negative string length {}", len),
    })?;
    if buf.remaining() < len {
        return Err(ProbeError::InvalidPacket {
            message: format!("string needs {} bytes, got {}", len, buf.remaining()),
        });
    }
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec()).map_err(|e| ProbeError::InvalidPacket {
        message: format!("invalid UTF-8 string: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_known_encodings() {
        let cases: [(i32, &[u8]); 5] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (300, &[0xac, 0x02]),
            (-1, &[0xff, 0xff, 0xff, 0xff, 0x0f]),
        ];
        for (value, expected) in cases {
            let mut buf = BytesMut::new();
            put_varint(&mut buf, value);
            assert_eq!(&buf[..], expected, "encoding {}", value);
            assert_eq!(get_varint(&mut buf.freeze()).unwrap(), value);
        }
    }

    #[test]
    fn test_varint_too_long_rejected() {
        let mut buf = Bytes::from_static(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(get_varint(&mut buf).is_err());
    }

    #[test]
    fn test_handshake_layout() {
        let packet = Handshake {
            protocol_version: PROTOCOL_VERSION,
            host: "mc".to_string(),
            port: 25565,
        }
        .to_packet();

        assert_eq!(packet.id, HANDSHAKE_ID);
        assert_eq!(&packet.payload[..], &[47, 2, b'm', b'c', 0x63, 0xdd, 1]);
    }

    #[test]
    fn test_decoder_waits_for_full_frame() {
        let mut codec = SlpCodec;
        let mut encoded = BytesMut::new();
        codec.encode(Ping(42).to_packet(), &mut encoded).unwrap();

        let mut partial = BytesMut::from(&encoded[..4]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        partial.extend_from_slice(&encoded[4..]);
        let packet = codec.decode(&mut partial).unwrap().unwrap();
        assert_eq!(Ping::from_packet(packet).unwrap(), Ping(42));
        assert!(partial.is_empty());
    }

    #[test]
    fn test_decode_wrong_packet_id() {
        let packet = Packet::empty(0x05);
        let err = StatusResponse::from_packet(packet).unwrap_err();
        assert!(matches!(err, ProbeError::UnexpectedPacket { expected: 0, actual: 5 }));
    }

    #[test]
    fn test_zero_length_frame_rejected() {
        let mut codec = SlpCodec;
        let mut src = BytesMut::from(&[0x00u8][..]);
        assert!(codec.decode(&mut src).is_err());
    }

    #[test]
    fn test_truncated_string_rejected() {
        let mut buf = Bytes::from_static(&[0x05, b'a', b'b']);
        assert!(get_string(&mut buf).is_err());
    }
}
