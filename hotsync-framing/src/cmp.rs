//! Connection Management Protocol (CMP): a single fixed-size request/response
//! exchanged once at session start on serial-like transports to negotiate
//! connection parameters.

use crate::error::{FramingError, FramingResult};
use hotsync_wire::cursor::{Reader, Writer};

/// Reserved alignment byte carried after the baud rate, matching the 6-byte
/// sync packets used by early Palm OS 1.0 devices.
const RESERVED: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpPacketType {
    Wakeup,
    Init,
    Abort,
    Extended,
}

impl CmpPacketType {
    fn from_byte(b: u8) -> FramingResult<Self> {
        match b {
            0 => Ok(Self::Wakeup),
            1 => Ok(Self::Init),
            2 => Ok(Self::Abort),
            3 => Ok(Self::Extended),
            other => Err(FramingError::Framing(format!(
                "unknown CMP packet type {other:#04x}"
            ))),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Self::Wakeup => 0,
            Self::Init => 1,
            Self::Abort => 2,
            Self::Extended => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmpPacket {
    pub packet_type: CmpPacketType,
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: u8,
    pub baud_rate: u32,
}

impl CmpPacket {
    pub fn wakeup(baud_rate: u32) -> Self {
        Self {
            packet_type: CmpPacketType::Wakeup,
            version_major: 1,
            version_minor: 1,
            flags: 0,
            baud_rate,
        }
    }

    pub fn init(baud_rate: u32) -> Self {
        Self {
            packet_type: CmpPacketType::Init,
            version_major: 1,
            version_minor: 1,
            flags: 0,
            baud_rate,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u8(self.packet_type.to_byte());
        w.u8(self.version_major);
        w.u8(self.version_minor);
        w.u8(self.flags);
        w.u32(self.baud_rate);
        w.u8(RESERVED);
        w.into_vec()
    }

    pub fn decode(buf: &[u8]) -> FramingResult<Self> {
        let mut r = Reader::new(buf);
        let packet_type = CmpPacketType::from_byte(r.u8()?)?;
        let version_major = r.u8()?;
        let version_minor = r.u8()?;
        let flags = r.u8()?;
        let baud_rate = r.u32()?;
        let _reserved = r.u8()?;
        Ok(Self {
            packet_type,
            version_major,
            version_minor,
            flags,
            baud_rate,
        })
    }
}

/// Runs the wakeup-then-init exchange over an already-open byte duplex,
/// accepting the device's proposed parameters verbatim (no negotiation
/// beyond echoing them back), as specified for serial/USB-serial transports.
pub fn handshake<D: std::io::Read + std::io::Write>(
    duplex: &mut D,
    default_baud: u32,
) -> FramingResult<CmpPacket> {
    let wakeup = CmpPacket::wakeup(default_baud);
    duplex.write_all(&wakeup.encode())?;

    let mut buf = [0u8; 10];
    duplex.read_exact(&mut buf)?;
    let device_init = CmpPacket::decode(&buf)?;
    if device_init.packet_type != CmpPacketType::Init {
        return Err(FramingError::Protocol(format!(
            "expected CMP init, got {:?}",
            device_init.packet_type
        )));
    }

    let ack = CmpPacket::init(device_init.baud_rate);
    duplex.write_all(&ack.encode())?;
    Ok(device_init)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let pkt = CmpPacket::wakeup(9600);
        let encoded = pkt.encode();
        assert_eq!(encoded.len(), 10);
        let decoded = CmpPacket::decode(&encoded).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn handshake_echoes_device_proposed_baud() {
        // A fake duplex: reads back whatever was written as the "device init".
        struct Fake {
            to_read: Vec<u8>,
            written: Vec<u8>,
        }
        impl std::io::Read for Fake {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let n = buf.len().min(self.to_read.len());
                buf[..n].copy_from_slice(&self.to_read[..n]);
                self.to_read.drain(..n);
                Ok(n)
            }
        }
        impl std::io::Write for Fake {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.written.extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let device_init = CmpPacket::init(57600);
        let mut fake = Fake {
            to_read: device_init.encode(),
            written: Vec::new(),
        };

        let negotiated = handshake(&mut fake, 9600).unwrap();
        assert_eq!(negotiated.baud_rate, 57600);

        // first write was the wakeup, second our init-ack echoing 57600
        let wakeup_len = CmpPacket::wakeup(9600).encode().len();
        let ack = CmpPacket::decode(&fake.written[wakeup_len..]).unwrap();
        assert_eq!(ack.baud_rate, 57600);
        assert_eq!(ack.packet_type, CmpPacketType::Init);
    }
}
