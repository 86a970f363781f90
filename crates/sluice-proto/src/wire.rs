//! Byte cursor over DNS wire data.
//!
//! [`WireReader`] is the bounds-checked, seekable read side used by every
//! decoder in the workspace, including the capture and transport layers.
//! [`WireWriter`] is the append-only write side.

use crate::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use smallvec::SmallVec;

/// A cursor for reading big-endian wire data.
///
/// The read position never exceeds the buffer length. Reads that would run
/// past the end fail with [`Error::BufferUnderrun`] and leave the position
/// where it was.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
    mark: usize,
}

impl<'a> WireReader<'a> {
    /// Creates a new wire reader positioned at the start of `data`.
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            mark: 0,
        }
    }

    /// Returns the underlying data.
    #[inline]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the current position.
    #[inline]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of unread bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true if all bytes have been read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Moves to an absolute position.
    #[inline]
    pub fn set_position(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(Error::SeekOutOfBounds {
                position: pos,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Moves the position back by `n` bytes.
    #[inline]
    pub fn rewind(&mut self, n: usize) -> Result<()> {
        let pos = self.pos.checked_sub(n).ok_or(Error::SeekOutOfBounds {
            position: 0,
            len: self.data.len(),
        })?;
        self.pos = pos;
        Ok(())
    }

    /// Skips `n` bytes.
    #[inline]
    pub fn advance(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Remembers the current position for a later [`reset`](Self::reset).
    #[inline]
    pub fn mark(&mut self) {
        self.mark = self.pos;
    }

    /// Returns to the last marked position (the start if never marked).
    #[inline]
    pub fn reset(&mut self) {
        self.pos = self.mark;
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(Error::buffer_underrun(self.pos, needed, self.remaining()));
        }
        Ok(())
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    /// Reads a big-endian u16.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        let value = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(value)
    }

    /// Reads a big-endian u32.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        let value = u32::from_be_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ]);
        self.pos += 4;
        Ok(value)
    }

    /// Reads exactly `len` bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a fixed-size array.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads `min(len, size)` bytes into a buffer of `size` bytes, zero
    /// filling the tail.
    ///
    /// Used for fields that are allowed to be shorter on the wire than their
    /// natural width, like an EDNS client-subnet address truncated to its
    /// source prefix.
    pub fn read_padded(&mut self, size: usize, len: usize) -> Result<SmallVec<[u8; 16]>> {
        let take = len.min(size);
        let mut out = SmallVec::from_slice(self.read_bytes(take)?);
        out.resize(size, 0);
        Ok(out)
    }

    /// Reads everything up to the end of the buffer.
    #[inline]
    pub fn read_rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.data.len();
        bytes
    }

    /// Reads a `<character-string>`: one length octet then that many bytes.
    #[inline]
    pub fn read_character_string(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u8()?;
        self.read_bytes(usize::from(len))
    }

    /// Peeks at the next byte without consuming it.
    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }
}

/// An append-only sink for big-endian wire data.
#[derive(Debug, Clone, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    /// Creates an empty writer.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `capacity` bytes.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Writes a big-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    /// Writes a big-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Writes raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a `<character-string>`.
    pub fn write_character_string(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u8::try_from(bytes.len())
            .map_err(|_| Error::CharacterStringTooLong { length: bytes.len() })?;
        self.write_u8(len);
        self.write_bytes(bytes);
        Ok(())
    }

    /// Returns the bytes written so far.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the data as frozen bytes.
    #[inline]
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    /// Returns the underlying buffer.
    #[inline]
    pub fn into_inner(self) -> BytesMut {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_reader() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0];
        let mut reader = WireReader::new(&data);

        assert_eq!(reader.read_u8().unwrap(), 0x12);
        assert_eq!(reader.read_u16().unwrap(), 0x3456);
        assert_eq!(reader.read_u32().unwrap(), 0x789A_BCDE);
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.read_u8().unwrap(), 0xF0);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_wire_reader_underrun() {
        let data = [0x12, 0x34];
        let mut reader = WireReader::new(&data);

        let err = reader.read_u32().unwrap_err();
        assert_eq!(err, Error::buffer_underrun(0, 4, 2));
        // failed reads do not move the cursor
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert!(reader.read_u8().is_err());
        assert!(reader.read_bytes(1).is_err());
    }

    #[test]
    fn test_wire_reader_seek() {
        let data = [1, 2, 3, 4, 5];
        let mut reader = WireReader::new(&data);

        reader.advance(3).unwrap();
        reader.mark();
        assert_eq!(reader.read_u8().unwrap(), 4);
        reader.rewind(2).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 3);
        reader.reset();
        assert_eq!(reader.position(), 3);

        reader.set_position(5).unwrap();
        assert!(reader.is_empty());
        assert!(reader.set_position(6).is_err());
        assert!(reader.rewind(6).is_err());
    }

    #[test]
    fn test_wire_reader_padded() {
        let data = [10, 0, 0xFF];
        let mut reader = WireReader::new(&data);

        let padded = reader.read_padded(4, 2).unwrap();
        assert_eq!(padded.as_slice(), &[10, 0, 0, 0]);
        assert_eq!(reader.position(), 2);

        // longer than the field width reads only the field width
        let mut reader = WireReader::new(&data);
        let padded = reader.read_padded(2, 3).unwrap();
        assert_eq!(padded.as_slice(), &[10, 0]);
    }

    #[test]
    fn test_wire_writer() {
        let mut writer = WireWriter::new();
        writer.write_u8(0x12);
        writer.write_u16(0x3456);
        writer.write_u32(0x789A_BCDE);
        writer.write_character_string(b"ab").unwrap();

        assert_eq!(writer.len(), 10);
        assert_eq!(
            writer.as_bytes(),
            &[0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 2, b'a', b'b']
        );
        assert!(writer.write_character_string(&[0u8; 256]).is_err());
    }
}
