//! Byte-level primitives shared by the HotSync framing stack and the DLP
//! codec: a CRC-16 matching Palm OS's HotSync implementation, and a small
//! bounds-checked big-endian cursor used instead of raw slice indexing.

pub mod crc16;
pub mod cursor;
pub mod error;

pub use cursor::{Reader, Writer};
pub use error::{WireError, WireResult};
