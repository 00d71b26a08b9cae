//! The Desktop Link Protocol (DLP): HotSync's binary RPC layer, carried over
//! PADP or NetSync. Argument bodies are described by data tables
//! ([`field::Field`]) rather than per-message encode/decode functions, so
//! adding a DLP call means declaring a schema, not writing a codec.

pub mod argument;
pub mod catalog;
pub mod codec;
pub mod error;
pub mod error_code;
pub mod field;

pub use argument::{LongArgEncoding, SizeClass};
pub use codec::{execute, DlpRequest, DlpResponse, DlpTransport};
pub use error::{DlpError, DlpResult};
pub use error_code::DlpErrorCode;
pub use field::{Field, FieldType, FieldValue};
