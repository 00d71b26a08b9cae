//! Packet Assembly/Disassembly Protocol (PADP): the reliability layer
//! carried inside SLP frames on socket 3<->3 (the DLP channel).
//!
//! A logical PADP message is a sequence of `Data` packets sharing one
//! transaction ID: the first carries the total message length in
//! `size_or_offset`, later fragments carry their byte offset. Each `Data`
//! packet is individually acknowledged by an `Ack` packet whose transaction
//! ID and `size_or_offset` mirror the packet it acknowledges.

use crate::error::{FramingError, FramingResult};
use hotsync_wire::cursor::{Reader, Writer};

pub const FLAG_FIRST: u8 = 0x80;
pub const FLAG_LAST: u8 = 0x40;
pub const FLAG_MEMORY_ERROR: u8 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadpPacketType {
    Data,
    Ack,
}

impl PadpPacketType {
    fn from_byte(b: u8) -> FramingResult<Self> {
        match b {
            0 => Ok(Self::Data),
            1 => Ok(Self::Ack),
            other => Err(FramingError::Framing(format!(
                "unknown PADP packet type {other:#04x}"
            ))),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Data => 0,
            Self::Ack => 1,
        }
    }
}

/// A single PADP packet (either a data fragment or an ack for one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadpPacket {
    pub flags: u8,
    pub packet_type: PadpPacketType,
    pub transaction_id: u8,
    /// Total message length on the first data fragment; byte offset on
    /// subsequent fragments; mirrored verbatim on the ack.
    pub size_or_offset: u32,
    pub payload: Vec<u8>,
}

impl PadpPacket {
    pub fn is_first(&self) -> bool {
        self.flags & FLAG_FIRST != 0
    }

    pub fn is_last(&self) -> bool {
        self.flags & FLAG_LAST != 0
    }

    pub fn is_memory_error(&self) -> bool {
        self.flags & FLAG_MEMORY_ERROR != 0
    }

    pub fn data(
        flags: u8,
        transaction_id: u8,
        size_or_offset: u32,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            flags,
            packet_type: PadpPacketType::Data,
            transaction_id,
            size_or_offset,
            payload,
        }
    }

    pub fn ack(transaction_id: u8, size_or_offset: u32) -> Self {
        Self {
            flags: 0,
            packet_type: PadpPacketType::Ack,
            transaction_id,
            size_or_offset,
            payload: Vec::new(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u8(self.flags);
        w.u8(self.packet_type.to_byte());
        w.u8(self.transaction_id);
        w.u32(self.size_or_offset);
        w.bytes(&self.payload);
        w.into_vec()
    }

    pub fn decode(buf: &[u8]) -> FramingResult<Self> {
        let mut r = Reader::new(buf);
        let flags = r.u8()?;
        let packet_type = PadpPacketType::from_byte(r.u8()?)?;
        let transaction_id = r.u8()?;
        let size_or_offset = r.u32()?;
        let payload = r.rest().to_vec();
        Ok(Self {
            flags,
            packet_type,
            transaction_id,
            size_or_offset,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_data_packet() {
        let pkt = PadpPacket::data(FLAG_FIRST, 5, 42, vec![1, 2, 3]);
        let encoded = pkt.encode();
        let decoded = PadpPacket::decode(&encoded).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn round_trips_ack_packet() {
        let pkt = PadpPacket::ack(5, 42);
        let decoded = PadpPacket::decode(&pkt.encode()).unwrap();
        assert_eq!(decoded, pkt);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn flag_helpers_read_individual_bits() {
        let pkt = PadpPacket::data(FLAG_FIRST | FLAG_LAST, 1, 0, vec![]);
        assert!(pkt.is_first());
        assert!(pkt.is_last());
        assert!(!pkt.is_memory_error());
    }
}
