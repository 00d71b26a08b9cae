//! DLP argument header encoding: a 6-bit argument ID (base `0x20`) and a
//! 2-bit size class packed into one byte, chosen by the smallest size class
//! whose maximum length can hold the payload.

use crate::error::{DlpError, DlpResult};
use hotsync_wire::cursor::{Reader, Writer};

pub const ARG_ID_BASE: u8 = 0x20;

/// Historical fork in how "long" (4-byte length) arguments are framed.
/// `PilotLink` matches the description in the protocol design: a single
/// padding byte follows the ID byte for both `Short` and `Long` arguments.
/// `ColdSync` omits that padding byte for `Long` arguments only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LongArgEncoding {
    #[default]
    PilotLink,
    ColdSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    Tiny,
    Short,
    Long,
}

impl SizeClass {
    /// Chooses the smallest class whose maximum length holds `len`, per the
    /// inclusive boundaries 0..=255 (tiny), 256..=65535 (short),
    /// 65536..=u32::MAX (long).
    pub fn for_len(len: usize) -> DlpResult<Self> {
        if len <= 255 {
            Ok(Self::Tiny)
        } else if len <= 65535 {
            Ok(Self::Short)
        } else if len as u64 <= u32::MAX as u64 {
            Ok(Self::Long)
        } else {
            Err(DlpError::Protocol(format!(
                "argument payload of {len} bytes exceeds the 4GiB long-argument limit"
            )))
        }
    }

    fn tag_bits(self) -> u8 {
        match self {
            Self::Tiny => 0b00,
            Self::Short => 0b10,
            Self::Long => 0b01,
        }
    }

    fn from_tag_bits(bits: u8) -> DlpResult<Self> {
        match bits {
            0b00 => Ok(Self::Tiny),
            0b10 => Ok(Self::Short),
            0b01 => Ok(Self::Long),
            other => Err(DlpError::Protocol(format!(
                "unknown DLP argument size class tag {other:#04b}"
            ))),
        }
    }
}

/// Encodes one argument: header (ID byte, optional padding, length) followed
/// by `payload`. `arg_index` is the 0-based position in schema-declaration
/// order; the wire ID is `ARG_ID_BASE + arg_index`.
pub fn encode_argument(
    w: &mut Writer,
    arg_index: u8,
    payload: &[u8],
    long_encoding: LongArgEncoding,
) -> DlpResult<()> {
    if arg_index > 0x3F - ARG_ID_BASE {
        return Err(DlpError::Protocol(format!(
            "argument index {arg_index} overflows the 6-bit argument ID space"
        )));
    }
    let class = SizeClass::for_len(payload.len())?;
    let id_byte = (class.tag_bits() << 6) | (ARG_ID_BASE + arg_index);
    w.u8(id_byte);

    match class {
        SizeClass::Tiny => {
            w.u8(payload.len() as u8);
        }
        SizeClass::Short => {
            w.u8(0x00); // padding byte
            w.u16(payload.len() as u16);
        }
        SizeClass::Long => {
            if long_encoding == LongArgEncoding::PilotLink {
                w.u8(0x00); // padding byte
            }
            w.u32(payload.len() as u32);
        }
    }
    w.bytes(payload);
    Ok(())
}

/// Decoded argument header plus its id and payload.
pub struct DecodedArgument<'a> {
    pub arg_id: u8,
    pub size_class: SizeClass,
    pub payload: &'a [u8],
}

/// Decodes one argument from `r`, assuming [`LongArgEncoding::PilotLink`]
/// framing for `Long` arguments. Devices speaking the `ColdSync` dialect
/// would need a stream-specific variant; HotSync's own responses always use
/// `PilotLink` framing so decoding does not need to be switchable in
/// practice (see DESIGN.md).
pub fn decode_argument<'a>(r: &mut Reader<'a>) -> DlpResult<DecodedArgument<'a>> {
    let id_byte = r.u8()?;
    let size_class = SizeClass::from_tag_bits(id_byte >> 6)?;
    let arg_id = id_byte & 0x3F;

    let len = match size_class {
        SizeClass::Tiny => r.u8()? as usize,
        SizeClass::Short => {
            let _pad = r.u8()?;
            r.u16()? as usize
        }
        SizeClass::Long => {
            let _pad = r.u8()?;
            r.u32()? as usize
        }
    };
    let payload = r.bytes(len)?;
    Ok(DecodedArgument {
        arg_id,
        size_class,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_boundaries_are_inclusive() {
        assert_eq!(SizeClass::for_len(0).unwrap(), SizeClass::Tiny);
        assert_eq!(SizeClass::for_len(255).unwrap(), SizeClass::Tiny);
        assert_eq!(SizeClass::for_len(256).unwrap(), SizeClass::Short);
        assert_eq!(SizeClass::for_len(65535).unwrap(), SizeClass::Short);
        assert_eq!(SizeClass::for_len(65536).unwrap(), SizeClass::Long);
    }

    #[test]
    fn round_trips_tiny_argument() {
        let mut w = Writer::new();
        encode_argument(&mut w, 0, b"hi", LongArgEncoding::PilotLink).unwrap();
        let bytes = w.into_vec();
        assert_eq!(bytes[0], ARG_ID_BASE); // tag bits 00, id 0x20

        let mut r = Reader::new(&bytes);
        let arg = decode_argument(&mut r).unwrap();
        assert_eq!(arg.arg_id, ARG_ID_BASE);
        assert_eq!(arg.size_class, SizeClass::Tiny);
        assert_eq!(arg.payload, b"hi");
    }

    #[test]
    fn round_trips_short_argument_with_padding_byte() {
        let payload = vec![0xAB; 300];
        let mut w = Writer::new();
        encode_argument(&mut w, 1, &payload, LongArgEncoding::PilotLink).unwrap();
        let bytes = w.into_vec();
        assert_eq!(bytes[0] >> 6, 0b10);
        assert_eq!(bytes[1], 0x00); // padding

        let mut r = Reader::new(&bytes);
        let arg = decode_argument(&mut r).unwrap();
        assert_eq!(arg.size_class, SizeClass::Short);
        assert_eq!(arg.payload, &payload[..]);
    }

    #[test]
    fn round_trips_long_argument_pilot_link() {
        let payload = vec![0xCD; 70_000];
        let mut w = Writer::new();
        encode_argument(&mut w, 2, &payload, LongArgEncoding::PilotLink).unwrap();
        let bytes = w.into_vec();
        assert_eq!(bytes[0] >> 6, 0b01);
        assert_eq!(bytes.len(), 1 + 1 + 4 + payload.len()); // id + pad + len + payload

        let mut r = Reader::new(&bytes);
        let arg = decode_argument(&mut r).unwrap();
        assert_eq!(arg.size_class, SizeClass::Long);
        assert_eq!(arg.payload.len(), 70_000);
    }

    #[test]
    fn coldsync_long_encoding_omits_padding_byte() {
        let payload = vec![0xEE; 70_000];
        let mut w = Writer::new();
        encode_argument(&mut w, 2, &payload, LongArgEncoding::ColdSync).unwrap();
        let bytes = w.into_vec();
        assert_eq!(bytes.len(), 1 + 4 + payload.len()); // no pad byte
    }

    #[test]
    fn argument_ids_assigned_sequentially_from_base() {
        let mut w = Writer::new();
        encode_argument(&mut w, 0, b"a", LongArgEncoding::PilotLink).unwrap();
        encode_argument(&mut w, 1, b"b", LongArgEncoding::PilotLink).unwrap();
        encode_argument(&mut w, 2, b"c", LongArgEncoding::PilotLink).unwrap();
        let bytes = w.into_vec();
        assert_eq!(bytes[0] & 0x3F, ARG_ID_BASE);
        assert_eq!(bytes[2] & 0x3F, ARG_ID_BASE + 1);
        assert_eq!(bytes[4] & 0x3F, ARG_ID_BASE + 2);
    }
}
