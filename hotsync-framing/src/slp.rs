//! Serial Link Protocol (SLP): the innermost HotSync framing layer.
//!
//! A frame is `preamble(3) dest(1) src(1) type(1) xid(1) size(2) checksum(1)
//! body(size) crc(2)`. The header checksum is the sum of the bytes from
//! `dest` through `size` (inclusive) taken mod 256; the trailing CRC-16
//! covers the header (including the checksum byte) and the body.

use crate::error::{FramingError, FramingResult};
use hotsync_wire::crc16;
use hotsync_wire::cursor::Writer;
use std::io::Read;
use tracing::{debug, warn};

pub const PREAMBLE: [u8; 3] = [0xBE, 0xEF, 0xED];

/// The socket carrying the DLP RPC channel, on both ends.
pub const SOCKET_DLP: u8 = 3;
/// The loopback/echo socket used for connection tests.
pub const SOCKET_LOOPBACK: u8 = 0;

/// The link-level packet type, carried in the SLP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlpPacketType {
    Raw,
    Padp,
    Loopback,
}

impl SlpPacketType {
    fn from_byte(b: u8) -> FramingResult<Self> {
        match b {
            1 => Ok(Self::Raw),
            2 => Ok(Self::Padp),
            3 => Ok(Self::Loopback),
            other => Err(FramingError::Framing(format!(
                "unknown SLP packet type {other:#04x}"
            ))),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Raw => 1,
            Self::Padp => 2,
            Self::Loopback => 3,
        }
    }
}

/// A single SLP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlpFrame {
    pub dest_socket: u8,
    pub src_socket: u8,
    pub packet_type: SlpPacketType,
    /// Transaction ID, mirrored by PADP for ack correlation at this layer.
    pub xid: u8,
    pub body: Vec<u8>,
}

impl SlpFrame {
    pub fn encode(&self) -> FramingResult<Vec<u8>> {
        if self.body.len() > u16::MAX as usize {
            return Err(FramingError::Framing(format!(
                "SLP body too large: {} bytes",
                self.body.len()
            )));
        }

        let mut w = Writer::new();
        w.bytes(&PREAMBLE);
        w.u8(self.dest_socket);
        w.u8(self.src_socket);
        w.u8(self.packet_type.to_byte());
        w.u8(self.xid);
        w.u16(self.body.len() as u16);

        let header_sum = checksum_of(
            self.dest_socket,
            self.src_socket,
            self.packet_type.to_byte(),
            self.xid,
            self.body.len() as u16,
        );
        w.u8(header_sum);
        w.bytes(&self.body);

        // CRC covers everything after the preamble: header fields, checksum
        // byte, and body — matching decode_from's crc_input construction.
        let crc = crc16::checksum(&w.as_slice()[3..]);
        let mut out = w.into_vec();
        out.push((crc >> 8) as u8);
        out.push((crc & 0xFF) as u8);
        Ok(out)
    }

    /// Scans `reader` for the next valid frame, resynchronizing by one byte
    /// at a time on a bad preamble, checksum, or CRC.
    pub fn decode_from<R: Read>(reader: &mut R) -> FramingResult<Self> {
        let mut window = [0u8; 3];
        reader.read_exact(&mut window)?;
        loop {
            if window == PREAMBLE {
                break;
            }
            warn!("SLP: bad preamble {window:02x?}, resyncing by one byte");
            window[0] = window[1];
            window[1] = window[2];
            let mut next = [0u8; 1];
            reader.read_exact(&mut next)?;
            window[2] = next[0];
        }

        let mut head = [0u8; 6]; // dest, src, type, xid, size_hi, size_lo
        reader.read_exact(&mut head)?;
        let dest_socket = head[0];
        let src_socket = head[1];
        let packet_type = SlpPacketType::from_byte(head[2])?;
        let xid = head[3];
        let size = u16::from_be_bytes([head[4], head[5]]);

        let mut csum_byte = [0u8; 1];
        reader.read_exact(&mut csum_byte)?;
        let expected_sum = checksum_of(dest_socket, src_socket, head[2], xid, size);
        if csum_byte[0] != expected_sum {
            return Err(FramingError::Framing(format!(
                "SLP header checksum mismatch: got {:#04x}, expected {:#04x}",
                csum_byte[0], expected_sum
            )));
        }

        let mut body = vec![0u8; size as usize];
        reader.read_exact(&mut body)?;

        let mut trailer = [0u8; 2];
        reader.read_exact(&mut trailer)?;
        let received_crc = u16::from_be_bytes(trailer);

        let mut crc_input = Vec::with_capacity(6 + 1 + body.len());
        crc_input.extend_from_slice(&head);
        crc_input.push(csum_byte[0]);
        crc_input.extend_from_slice(&body);
        let computed_crc = crc16::checksum(&crc_input);
        if computed_crc != received_crc {
            return Err(FramingError::Framing(format!(
                "SLP CRC mismatch: got {received_crc:#06x}, expected {computed_crc:#06x}"
            )));
        }

        debug!(dest_socket, src_socket, xid, size, "SLP: decoded frame");
        Ok(Self {
            dest_socket,
            src_socket,
            packet_type,
            xid,
            body,
        })
    }
}

fn checksum_of(dest: u8, src: u8, ptype: u8, xid: u8, size: u16) -> u8 {
    let size_bytes = size.to_be_bytes();
    let sum = dest as u32 + src as u32 + ptype as u32 + xid as u32 + size_bytes[0] as u32
        + size_bytes[1] as u32;
    (sum % 256) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample(body: Vec<u8>) -> SlpFrame {
        SlpFrame {
            dest_socket: SOCKET_DLP,
            src_socket: SOCKET_DLP,
            packet_type: SlpPacketType::Padp,
            xid: 7,
            body,
        }
    }

    #[test]
    fn round_trips_for_bodies_up_to_64k() {
        for len in [0usize, 1, 254, 1024, 65535] {
            let frame = sample(vec![0xAB; len]);
            let encoded = frame.encode().unwrap();
            let mut cursor = Cursor::new(encoded);
            let decoded = SlpFrame::decode_from(&mut cursor).unwrap();
            assert_eq!(decoded, frame);
        }
    }

    #[test]
    fn corrupted_checksum_byte_is_rejected() {
        let frame = sample(b"hello".to_vec());
        let mut encoded = frame.encode().unwrap();
        // the checksum byte is immediately after the 6-byte fixed header
        encoded[3 + 6] ^= 0xFF;
        let mut cursor = Cursor::new(encoded);
        assert!(SlpFrame::decode_from(&mut cursor).is_err());
    }

    #[test]
    fn corrupted_body_byte_fails_crc() {
        let frame = sample(b"hello world".to_vec());
        let mut encoded = frame.encode().unwrap();
        let body_start = encoded.len() - 2 - 11;
        encoded[body_start] ^= 0x01;
        let mut cursor = Cursor::new(encoded);
        assert!(SlpFrame::decode_from(&mut cursor).is_err());
    }

    #[test]
    fn resyncs_past_garbage_preamble_bytes() {
        let frame = sample(b"payload".to_vec());
        let mut stream = vec![0x00, 0x01, 0x02, 0xBE]; // garbage, ends mid-preamble
        stream.extend(frame.encode().unwrap());
        let mut cursor = Cursor::new(stream);
        let decoded = SlpFrame::decode_from(&mut cursor).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn body_too_large_is_rejected_at_encode_time() {
        let frame = sample(vec![0u8; u16::MAX as usize + 1]);
        assert!(frame.encode().is_err());
    }
}
