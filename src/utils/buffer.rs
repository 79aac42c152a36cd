use std::io::{Error as IoError, ErrorKind, Result as IoResult};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Cursor-based byte buffer used by the AMF codec and the wire builders.
pub struct ByteBuffer {
    buffer: Vec<u8>,
    cursor: usize,
}

impl ByteBuffer {
    /// Create a new ByteBuffer from bytes
    pub fn new(data: Vec<u8>) -> Self {
        ByteBuffer {
            buffer: data,
            cursor: 0,
        }
    }

    /// Create an empty ByteBuffer with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        ByteBuffer {
            buffer: Vec::with_capacity(capacity),
            cursor: 0,
        }
    }

    /// Get current cursor position
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Remaining bytes after the cursor
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    /// Check if buffer has at least n bytes remaining
    pub fn has_remaining(&self, n: usize) -> bool {
        self.remaining() >= n
    }

    fn take(&mut self, len: usize) -> IoResult<&[u8]> {
        if !self.has_remaining(len) {
            return Err(IoError::new(ErrorKind::UnexpectedEof, "Not enough bytes"));
        }
        let start = self.cursor;
        self.cursor += len;
        Ok(&self.buffer[start..start + len])
    }

    /// Peek at the next byte without moving the cursor
    pub fn peek_u8(&self) -> Option<u8> {
        self.buffer.get(self.cursor).copied()
    }

    /// Read bytes into a new vector
    pub fn read_bytes(&mut self, len: usize) -> IoResult<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }

    pub fn read_u8(&mut self) -> IoResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16_be(&mut self) -> IoResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16_be(&mut self) -> IoResult<i16> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    /// Read a 24-bit big endian value (chunk timestamps, lengths)
    pub fn read_u24_be(&mut self) -> IoResult<u32> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    pub fn read_u32_be(&mut self) -> IoResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// Read u32 (little endian), used for message stream ids
    pub fn read_u32_le(&mut self) -> IoResult<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_f64_be(&mut self) -> IoResult<f64> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16_be(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        BigEndian::write_u16(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    pub fn write_i16_be(&mut self, value: i16) {
        let mut bytes = [0u8; 2];
        BigEndian::write_i16(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    /// Write the low 24 bits of value (big endian)
    pub fn write_u24_be(&mut self, value: u32) {
        let mut bytes = [0u8; 3];
        BigEndian::write_u24(&mut bytes, value & 0x00FF_FFFF);
        self.buffer.extend_from_slice(&bytes);
    }

    pub fn write_u32_be(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        BigEndian::write_u32(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    pub fn write_u32_le(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    pub fn write_f64_be(&mut self, value: f64) {
        let mut bytes = [0u8; 8];
        BigEndian::write_f64(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    /// Get slice of underlying buffer
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the buffer, returning the written bytes
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
