//! Command framing for a full DLP request/response exchange: command ID byte,
//! argument count, then each argument's header+payload (via `argument`), with
//! each payload itself encoded by `field::encode_record` against the
//! request's or response's own schema.

use crate::argument::{decode_argument, encode_argument, LongArgEncoding};
use crate::error::{DlpError, DlpResult};
use crate::error_code::DlpErrorCode;
use crate::field::{decode_record, encode_record, Field, FieldValue};
use hotsync_wire::cursor::{Reader, Writer};
use tracing::debug;

/// Response command ID flag: responses echo the request's command ID with
/// this bit set.
pub const RESPONSE_FLAG: u8 = 0x80;

/// Anything that can carry one DLP command's bytes to and from a device.
/// Implemented by the sync-server orchestrator over whichever framing layer
/// (PADP or NetSync) the active session negotiated; `hotsync-dlp` itself
/// knows nothing about transports.
pub trait DlpTransport {
    fn send(&mut self, bytes: &[u8]) -> DlpResult<()>;
    fn recv(&mut self) -> DlpResult<Vec<u8>>;
}

/// A request message: a command ID and zero or more arguments, each with its
/// own field schema.
pub trait DlpRequest {
    const COMMAND_ID: u8;

    /// One schema per argument, in wire order.
    fn argument_schemas(&self) -> &'static [&'static [Field]];

    /// One value list per argument, matching `argument_schemas()` in both
    /// count and per-argument field count.
    fn to_argument_values(&self) -> Vec<Vec<FieldValue>>;
}

/// A response message decoded back into argument value lists, which concrete
/// catalog types convert into their own structs.
pub trait DlpResponse: Sized {
    const COMMAND_ID: u8;

    fn argument_schemas() -> &'static [&'static [Field]];

    fn from_argument_values(values: Vec<Vec<FieldValue>>) -> DlpResult<Self>;
}

fn encode_message(
    command_id: u8,
    schemas: &[&[Field]],
    values: &[Vec<FieldValue>],
    long_encoding: LongArgEncoding,
) -> DlpResult<Vec<u8>> {
    if schemas.len() != values.len() {
        return Err(DlpError::ArgumentCountMismatch {
            expected: schemas.len(),
            got: values.len(),
        });
    }
    let mut w = Writer::new();
    w.u8(command_id);
    w.u8(schemas.len() as u8);
    for (index, (schema, arg_values)) in schemas.iter().zip(values).enumerate() {
        let payload = encode_record(schema, arg_values)?;
        encode_argument(&mut w, index as u8, &payload, long_encoding)?;
    }
    Ok(w.into_vec())
}

/// Decodes a message without an error code. `hotsync-dlp` only ever speaks
/// the request side of this (`encode_message`/`execute`); this is the
/// decode half, kept for building request-shaped test fixtures.
#[cfg(test)]
fn decode_message(bytes: &[u8], schemas: &[&[Field]]) -> DlpResult<(u8, Vec<Vec<FieldValue>>)> {
    let mut r = Reader::new(bytes);
    let command_id = r.u8()?;
    let arg_count = r.u8()? as usize;
    if arg_count != schemas.len() {
        return Err(DlpError::ArgumentCountMismatch {
            expected: schemas.len(),
            got: arg_count,
        });
    }
    let mut values = Vec::with_capacity(arg_count);
    for schema in schemas {
        let decoded = decode_argument(&mut r)?;
        values.push(decode_record(schema, decoded.payload)?);
    }
    Ok((command_id, values))
}

/// Executes one DLP request/response round trip: encodes `request`, sends it,
/// reads the reply, verifies the response command ID and error code, and
/// decodes the reply's arguments into `Res`.
pub fn execute<Req, Res, T>(transport: &mut T, request: &Req) -> DlpResult<Res>
where
    Req: DlpRequest,
    Res: DlpResponse,
    T: DlpTransport + ?Sized,
{
    let encoded = encode_message(
        Req::COMMAND_ID,
        request.argument_schemas(),
        &request.to_argument_values(),
        LongArgEncoding::default(),
    )?;
    debug!(command_id = Req::COMMAND_ID, "sending DLP request");
    transport.send(&encoded)?;

    let reply = transport.recv()?;
    let (command_id, error_code, arg_values) = decode_response(&reply, Res::argument_schemas())?;

    let expected = Req::COMMAND_ID | RESPONSE_FLAG;
    if command_id != expected {
        return Err(DlpError::CommandMismatch {
            expected,
            got: command_id,
        });
    }
    if !error_code.is_success() {
        return Err(DlpError::Dlp(error_code));
    }
    Res::from_argument_values(arg_values)
}

/// Response wire layout mirrors the request layout (command ID, argument
/// count, arguments) with a 2-byte error code inserted between the argument
/// count and the argument block.
fn decode_response(
    bytes: &[u8],
    schemas: &[&[Field]],
) -> DlpResult<(u8, DlpErrorCode, Vec<Vec<FieldValue>>)> {
    let mut r = Reader::new(bytes);
    let command_id = r.u8()?;
    let arg_count = r.u8()? as usize;
    let error_code = DlpErrorCode::from_wire(r.u16()?);
    if arg_count != schemas.len() {
        return Err(DlpError::ArgumentCountMismatch {
            expected: schemas.len(),
            got: arg_count,
        });
    }
    let mut values = Vec::with_capacity(arg_count);
    for schema in schemas {
        let decoded = decode_argument(&mut r)?;
        values.push(decode_record(schema, decoded.payload)?);
    }
    Ok((command_id, error_code, values))
}

/// Builds a response message (mirrors `decode_response`). `hotsync-dlp` only
/// consumes responses in production; this is the encode half, used to build
/// scripted device replies in tests.
#[cfg(test)]
fn encode_response(
    command_id: u8,
    error_code: DlpErrorCode,
    schemas: &[&[Field]],
    values: &[Vec<FieldValue>],
) -> DlpResult<Vec<u8>> {
    if schemas.len() != values.len() {
        return Err(DlpError::ArgumentCountMismatch {
            expected: schemas.len(),
            got: values.len(),
        });
    }
    let mut w = Writer::new();
    w.u8(command_id);
    w.u8(schemas.len() as u8);
    w.u16(error_code.to_wire());
    for (index, (schema, arg_values)) in schemas.iter().zip(values).enumerate() {
        let payload = encode_record(schema, arg_values)?;
        encode_argument(&mut w, index as u8, &payload, LongArgEncoding::default())?;
    }
    Ok(w.into_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;

    struct Ping;

    const PING_SCHEMAS: &[&[Field]] = &[];

    impl DlpRequest for Ping {
        const COMMAND_ID: u8 = 0x01;
        fn argument_schemas(&self) -> &'static [&'static [Field]] {
            PING_SCHEMAS
        }
        fn to_argument_values(&self) -> Vec<Vec<FieldValue>> {
            Vec::new()
        }
    }

    #[test]
    fn encode_message_writes_command_id_and_arg_count() {
        let bytes = encode_message(0x01, PING_SCHEMAS, &[], LongArgEncoding::default()).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00]);
    }

    #[test]
    fn decode_message_round_trips_a_single_argument() {
        let schema: &[Field] = &[Field {
            name: "v",
            ty: FieldType::U8,
        }];
        let schemas: &[&[Field]] = &[schema];
        let values = vec![vec![FieldValue::U8(7)]];
        let bytes = encode_message(0x10, schemas, &values, LongArgEncoding::default()).unwrap();
        let (command_id, decoded) = decode_message(&bytes, schemas).unwrap();
        assert_eq!(command_id, 0x10);
        assert_eq!(decoded, values);
    }

    #[test]
    fn decode_message_rejects_argument_count_mismatch() {
        let schemas: &[&[Field]] = &[];
        let bytes = vec![0x10, 0x01]; // claims one argument but schema has none
        let err = decode_message(&bytes, schemas).unwrap_err();
        assert!(matches!(err, DlpError::ArgumentCountMismatch { .. }));
    }

    struct PingReply {
        rom_version: u32,
    }

    const PONG_SCHEMAS: &[&[Field]] = &[&[Field {
        name: "rom_version",
        ty: FieldType::U32,
    }]];

    impl DlpResponse for PingReply {
        const COMMAND_ID: u8 = 0x01;
        fn argument_schemas() -> &'static [&'static [Field]] {
            PONG_SCHEMAS
        }
        fn from_argument_values(mut values: Vec<Vec<FieldValue>>) -> DlpResult<Self> {
            let arg0 = values.remove(0);
            Ok(Self {
                rom_version: arg0[0].as_u32()?,
            })
        }
    }

    struct FakeTransport {
        reply: Vec<u8>,
        sent: Vec<Vec<u8>>,
    }

    impl DlpTransport for FakeTransport {
        fn send(&mut self, bytes: &[u8]) -> DlpResult<()> {
            self.sent.push(bytes.to_vec());
            Ok(())
        }
        fn recv(&mut self) -> DlpResult<Vec<u8>> {
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn execute_decodes_a_successful_response() {
        let reply = encode_response(
            0x01 | RESPONSE_FLAG,
            DlpErrorCode::Success,
            PONG_SCHEMAS,
            &[vec![FieldValue::U32(0x0400_0000)]],
        )
        .unwrap();
        let mut transport = FakeTransport {
            reply,
            sent: Vec::new(),
        };
        let result: PingReply = execute(&mut transport, &Ping).unwrap();
        assert_eq!(result.rom_version, 0x0400_0000);
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0], vec![0x01, 0x00]);
    }

    #[test]
    fn execute_surfaces_a_device_error_code() {
        let reply = encode_response(0x01 | RESPONSE_FLAG, DlpErrorCode::NotFound, PONG_SCHEMAS, &[
            vec![FieldValue::U32(0)],
        ])
        .unwrap();
        let mut transport = FakeTransport {
            reply,
            sent: Vec::new(),
        };
        let err = execute::<Ping, PingReply, _>(&mut transport, &Ping).unwrap_err();
        assert!(matches!(err, DlpError::Dlp(DlpErrorCode::NotFound)));
    }

    #[test]
    fn execute_rejects_a_mismatched_response_command_id() {
        let reply = encode_response(
            0x02 | RESPONSE_FLAG, // wrong command id
            DlpErrorCode::Success,
            PONG_SCHEMAS,
            &[vec![FieldValue::U32(0)]],
        )
        .unwrap();
        let mut transport = FakeTransport {
            reply,
            sent: Vec::new(),
        };
        let err = execute::<Ping, PingReply, _>(&mut transport, &Ping).unwrap_err();
        assert!(matches!(err, DlpError::CommandMismatch { .. }));
    }
}
