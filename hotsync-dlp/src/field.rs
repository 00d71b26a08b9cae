//! Generic, table-walked encoding for DLP argument bodies.
//!
//! A DLP request or response body is a fixed sequence of typed fields (the
//! schema is the order; there is no length-prefixed self-description beyond
//! what each [`FieldType`] itself carries). Every concrete request/response
//! in `catalog` hands its schema as a `&'static [Field]` to [`encode_record`]
//! and [`decode_record`] rather than writing its own encode/decode pair, so
//! the wire layout lives in one data table instead of once per message type.

use crate::error::{DlpError, DlpResult};
use hotsync_wire::cursor::{Reader, Writer};

#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    U8,
    U16,
    U32,
    /// A byte run of exactly `usize` bytes.
    FixedBytes(usize),
    /// NUL-terminated string, as used by device name / user name fields.
    CString,
    /// Pascal-style string: one length byte followed by that many bytes.
    PString,
    /// Consumes everything left in the record. Only valid as the final field.
    TrailingBytes,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    Bytes(Vec<u8>),
    Str(String),
}

impl FieldValue {
    pub fn as_u8(&self) -> DlpResult<u8> {
        match self {
            Self::U8(v) => Ok(*v),
            other => Err(type_mismatch("U8", other)),
        }
    }

    pub fn as_u16(&self) -> DlpResult<u16> {
        match self {
            Self::U16(v) => Ok(*v),
            other => Err(type_mismatch("U16", other)),
        }
    }

    pub fn as_u32(&self) -> DlpResult<u32> {
        match self {
            Self::U32(v) => Ok(*v),
            other => Err(type_mismatch("U32", other)),
        }
    }

    pub fn as_bytes(&self) -> DlpResult<&[u8]> {
        match self {
            Self::Bytes(v) => Ok(v),
            other => Err(type_mismatch("Bytes", other)),
        }
    }

    pub fn as_str(&self) -> DlpResult<&str> {
        match self {
            Self::Str(v) => Ok(v),
            other => Err(type_mismatch("Str", other)),
        }
    }
}

fn type_mismatch(expected: &str, got: &FieldValue) -> DlpError {
    DlpError::Protocol(format!("expected field value {expected}, got {got:?}"))
}

/// Encodes `values` against `fields` in order. `values.len()` must equal
/// `fields.len()`; callers build both from the same schema so a mismatch
/// indicates a bug in the calling catalog entry, not a wire condition.
pub fn encode_record(fields: &[Field], values: &[FieldValue]) -> DlpResult<Vec<u8>> {
    if fields.len() != values.len() {
        return Err(DlpError::ArgumentCountMismatch {
            expected: fields.len(),
            got: values.len(),
        });
    }
    let mut w = Writer::new();
    for (field, value) in fields.iter().zip(values) {
        match (field.ty, value) {
            (FieldType::U8, FieldValue::U8(v)) => {
                w.u8(*v);
            }
            (FieldType::U16, FieldValue::U16(v)) => {
                w.u16(*v);
            }
            (FieldType::U32, FieldValue::U32(v)) => {
                w.u32(*v);
            }
            (FieldType::FixedBytes(len), FieldValue::Bytes(v)) => {
                if v.len() != len {
                    return Err(DlpError::Protocol(format!(
                        "field {:?} declares {len} bytes, got {}",
                        field.name,
                        v.len()
                    )));
                }
                w.bytes(v);
            }
            (FieldType::CString, FieldValue::Str(v)) => {
                w.bytes(v.as_bytes());
                w.u8(0);
            }
            (FieldType::PString, FieldValue::Str(v)) => {
                if v.len() > 255 {
                    return Err(DlpError::Protocol(format!(
                        "field {:?} pstring exceeds 255 bytes",
                        field.name
                    )));
                }
                w.u8(v.len() as u8);
                w.bytes(v.as_bytes());
            }
            (FieldType::TrailingBytes, FieldValue::Bytes(v)) => {
                w.bytes(v);
            }
            (ty, v) => {
                return Err(DlpError::Protocol(format!(
                    "field {:?} of type {ty:?} cannot hold value {v:?}",
                    field.name
                )));
            }
        }
    }
    Ok(w.into_vec())
}

/// Decodes `bytes` against `fields` in order, producing one [`FieldValue`]
/// per field.
pub fn decode_record(fields: &[Field], bytes: &[u8]) -> DlpResult<Vec<FieldValue>> {
    let mut r = Reader::new(bytes);
    let mut values = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let is_last = i == fields.len() - 1;
        let value = match field.ty {
            FieldType::U8 => FieldValue::U8(r.u8()?),
            FieldType::U16 => FieldValue::U16(r.u16()?),
            FieldType::U32 => FieldValue::U32(r.u32()?),
            FieldType::FixedBytes(len) => FieldValue::Bytes(r.bytes(len)?.to_vec()),
            FieldType::CString => {
                let rest = r.rest();
                let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
                    DlpError::Protocol(format!("field {:?} missing NUL terminator", field.name))
                })?;
                let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
                // Re-read through a fresh cursor positioned past the string
                // and its terminator; `rest()` already consumed everything,
                // so rebuild a reader over what follows.
                let consumed = nul + 1;
                let remainder = &rest[consumed..];
                r = Reader::new(remainder);
                FieldValue::Str(s)
            }
            FieldType::PString => {
                let len = r.u8()? as usize;
                let bytes = r.bytes(len)?;
                FieldValue::Str(String::from_utf8_lossy(bytes).into_owned())
            }
            FieldType::TrailingBytes => {
                if !is_last {
                    return Err(DlpError::Protocol(
                        "TrailingBytes field is only valid as the last field".into(),
                    ));
                }
                FieldValue::Bytes(r.rest().to_vec())
            }
        };
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &[Field] = &[
        Field {
            name: "rom_version",
            ty: FieldType::U32,
        },
        Field {
            name: "locale",
            ty: FieldType::U16,
        },
        Field {
            name: "name",
            ty: FieldType::CString,
        },
        Field {
            name: "tail",
            ty: FieldType::TrailingBytes,
        },
    ];

    #[test]
    fn encodes_and_decodes_a_mixed_schema() {
        let values = vec![
            FieldValue::U32(0x0400_0000),
            FieldValue::U16(0x0409),
            FieldValue::Str("m500".to_string()),
            FieldValue::Bytes(vec![1, 2, 3]),
        ];
        let bytes = encode_record(SCHEMA, &values).unwrap();
        let decoded = decode_record(SCHEMA, &bytes).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn pstring_round_trips_length_prefix() {
        let fields = &[Field {
            name: "short_name",
            ty: FieldType::PString,
        }];
        let values = vec![FieldValue::Str("HotSync".to_string())];
        let bytes = encode_record(fields, &values).unwrap();
        assert_eq!(bytes[0], 7);
        let decoded = decode_record(fields, &bytes).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn value_count_mismatch_is_rejected() {
        let values = vec![FieldValue::U32(0)];
        let err = encode_record(SCHEMA, &values).unwrap_err();
        assert!(matches!(err, DlpError::ArgumentCountMismatch { .. }));
    }

    #[test]
    fn missing_nul_terminator_is_rejected() {
        let fields = &[Field {
            name: "name",
            ty: FieldType::CString,
        }];
        let err = decode_record(fields, b"no-terminator").unwrap_err();
        assert!(matches!(err, DlpError::Protocol(_)));
    }
}
