//! Bounds-checked cursors over the container byte stream.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::{self, Error, ErrorKind};

use crate::format::OSType;

/// A read cursor over an in-memory container.  Every accessor checks the
/// remaining length and reports a structural decode error instead of
/// reading out of bounds.
pub(crate) struct Reader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buffer: &'a [u8]) -> Reader<'a> {
        Reader { buffer, position: 0 }
    }

    /// Returns the number of bytes left in the stream.
    pub(crate) fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads a big-endian u32.
    pub(crate) fn read_u32(&mut self) -> io::Result<u32> {
        let section = self.section(4)?;
        Ok(BigEndian::read_u32(section))
    }

    /// Reads a 4-byte chunk tag.
    pub(crate) fn read_tag(&mut self) -> io::Result<OSType> {
        let section = self.section(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(section);
        Ok(OSType(raw))
    }

    /// Slices off the next `length` bytes.
    pub(crate) fn section(&mut self, length: usize) -> io::Result<&'a [u8]> {
        if length > self.remaining() {
            return Err(truncation_error());
        }
        let start = self.position;
        self.position += length;
        Ok(&self.buffer[start..start + length])
    }
}

fn truncation_error() -> Error {
    Error::new(ErrorKind::UnexpectedEof, "truncated icns data")
}

/// A write cursor building a container into a preallocated buffer.
pub(crate) struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    /// Creates a writer with capacity for `total` bytes, so that no
    /// reallocation happens mid-write.
    pub(crate) fn with_capacity(total: usize) -> Writer {
        Writer { buffer: Vec::with_capacity(total) }
    }

    pub(crate) fn write_u32(&mut self, value: u32) {
        // Writing to a Vec cannot fail.
        let _ = self.buffer.write_u32::<BigEndian>(value);
    }

    pub(crate) fn write_tag(&mut self, tag: OSType) {
        let OSType(raw) = tag;
        self.buffer.extend_from_slice(&raw);
    }

    pub(crate) fn write_section(&mut self, body: &[u8]) {
        self.buffer.extend_from_slice(body);
    }

    pub(crate) fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}
