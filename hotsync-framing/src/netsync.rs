//! NetSync: the alternative framing used over TCP and over USB devices that
//! advertise the NetSync stack. Length-prefixed, no per-packet ack, no
//! retransmit, strictly sequential.

use crate::error::FramingResult;
use hotsync_wire::cursor::{Reader, Writer};
use std::io::{Read, Write};
use tracing::debug;

/// Fixed preamble exchanged byte-for-byte in both directions at session
/// start, before any length-prefixed messages flow.
pub const PREAMBLE: [u8; 4] = [0x90, 0x01, 0x00, 0x00];

/// A decoded NetSync message: the 1-byte data type, 1-byte transaction ID,
/// and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetSyncMessage {
    pub data_type: u8,
    pub xid: u8,
    pub body: Vec<u8>,
}

impl NetSyncMessage {
    pub fn new(data_type: u8, xid: u8, body: Vec<u8>) -> Self {
        Self {
            data_type,
            xid,
            body,
        }
    }

    /// Encodes the 6-byte header (data type, xid, 4-byte big-endian body
    /// length) followed by the body.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u8(self.data_type);
        w.u8(self.xid);
        w.u32(self.body.len() as u32);
        w.bytes(&self.body);
        w.into_vec()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> FramingResult<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> FramingResult<Self> {
        let mut header = [0u8; 6];
        reader.read_exact(&mut header)?;
        let mut r = Reader::new(&header);
        let data_type = r.u8()?;
        let xid = r.u8()?;
        let body_len = r.u32()? as usize;

        let mut body = vec![0u8; body_len];
        reader.read_exact(&mut body)?;
        debug!(data_type, xid, body_len, "NetSync: decoded message");
        Ok(Self {
            data_type,
            xid,
            body,
        })
    }
}

/// Exchanges the fixed preamble in both directions. Both sides write then
/// read so the exchange does not deadlock over a blocking duplex.
pub fn exchange_preamble<D: Read + Write>(duplex: &mut D) -> FramingResult<()> {
    duplex.write_all(&PREAMBLE)?;
    let mut peer = [0u8; 4];
    duplex.read_exact(&mut peer)?;
    if peer != PREAMBLE {
        return Err(crate::error::FramingError::Protocol(format!(
            "NetSync preamble mismatch: got {peer:02x?}, expected {PREAMBLE:02x?}"
        )));
    }
    Ok(())
}
