//! Forward-only byte cursors over caller-owned buffers.
//!
//! [`Reader`] walks a received frame; [`Writer`] fills a response buffer.
//! Neither can step outside its slice: reads past the end yield zero bytes
//! and writes past the end are clipped.

use super::wire::{Decode, Encode};

/// Read cursor over an inbound frame.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// The complete underlying buffer, including consumed bytes.
    pub fn data(&self) -> &'a [u8] {
        self.buf
    }

    /// The unread tail of the buffer (not consumed).
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Consume up to `n` bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos += n.min(self.available());
    }

    /// Consume up to `n` bytes and return them. Shorter than `n` only
    /// when the buffer runs out.
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        let n = n.min(self.available());
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        s
    }

    /// Consume a fixed-width field. Missing bytes read as zero.
    pub fn read_array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        let src = self.take(N);
        out[..src.len()].copy_from_slice(src);
        out
    }

    pub fn read_u8(&mut self) -> u8 {
        self.read_array::<1>()[0]
    }

    /// Decode one wire value.
    pub fn decode<T: Decode<'a>>(&mut self) -> T {
        T::decode(self)
    }
}

/// Write cursor over an outbound buffer.
#[derive(Debug)]
pub struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Space left before output is clipped.
    pub fn available(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Append bytes, clipping at the end of the buffer. Returns the
    /// number of bytes actually written.
    pub fn write_bytes(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.available());
        self.buf[self.pos..self.pos + n].copy_from_slice(&data[..n]);
        self.pos += n;
        n
    }

    pub fn write_u8(&mut self, byte: u8) {
        self.write_bytes(&[byte]);
    }

    /// Append `n` zero bytes (clipped).
    pub fn write_zeros(&mut self, n: usize) {
        let n = n.min(self.available());
        self.buf[self.pos..self.pos + n].fill(0);
        self.pos += n;
    }

    /// Overwrite an already written byte, e.g. a length placeholder.
    pub fn patch(&mut self, index: usize, byte: u8) {
        if index < self.pos {
            self.buf[index] = byte;
        }
    }

    /// Discard everything written so far.
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// The written prefix of the buffer.
    pub fn written(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Encode one wire value.
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) {
        value.encode(self);
    }
}
