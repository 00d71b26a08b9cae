use crate::error::{WireError, WireResult};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// A thin wrapper over a byte slice that reads big-endian integers and
/// fixed-length byte runs, turning `std::io` EOF errors into
/// [`WireError::Truncated`] with the byte counts that were actually short.
///
/// Every HotSync wire format (SLP headers, PADP headers, DLP arguments) is
/// read through this type rather than hand-rolled indexing, so bounds
/// checking happens in one place.
pub struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
    len: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            len: data.len(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.len - self.cursor.position() as usize
    }

    fn need(&self, n: usize) -> WireResult<()> {
        if self.remaining() < n {
            Err(WireError::Truncated {
                needed: n,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    pub fn u8(&mut self) -> WireResult<u8> {
        self.need(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn u16(&mut self) -> WireResult<u16> {
        self.need(2)?;
        Ok(self.cursor.read_u16::<BigEndian>()?)
    }

    pub fn u32(&mut self) -> WireResult<u32> {
        self.need(4)?;
        Ok(self.cursor.read_u32::<BigEndian>()?)
    }

    pub fn bytes(&mut self, n: usize) -> WireResult<&'a [u8]> {
        self.need(n)?;
        let pos = self.cursor.position() as usize;
        let slice = &self.cursor.get_ref()[pos..pos + n];
        self.cursor.set_position((pos + n) as u64);
        Ok(slice)
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let pos = self.cursor.position() as usize;
        let slice = &self.cursor.get_ref()[pos..];
        self.cursor.set_position(self.len as u64);
        slice
    }
}

/// Append-only big-endian byte writer used by every encoder.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.write_u8(v).expect("writing to a Vec is infallible");
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf
            .write_u16::<BigEndian>(v)
            .expect("writing to a Vec is infallible");
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf
            .write_u32::<BigEndian>(v)
            .expect("writing to a Vec is infallible");
        self
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}
