//! Length-prefix frame accumulator.
//!
//! Wire format:
//! ```text
//! ┌──────────┬────────────┬─────────────┬──────────────────────┐
//! │ size (1B)│ service(1B)│ function(1B)│ payload (size-3 B)   │
//! └──────────┴────────────┴─────────────┴──────────────────────┘
//! ```
//!
//! `size` counts the whole frame, itself included. Bytes are pushed one at
//! a time; a frame is complete once the buffer holds `size` bytes.
//!
//! A first byte that cannot start a frame (`size < 3`, or larger than the
//! configured limit) is dropped and counted, so the accumulator
//! resynchronises on the next plausible size byte instead of stalling.

use log::{trace, warn};

/// Largest frame a single-byte length prefix can describe.
pub const MAX_FRAME_SIZE: usize = u8::MAX as usize;

/// Capacity of the RX and TX buffers.
pub const BUFFER_CAPACITY: usize = MAX_FRAME_SIZE + 1;

/// Size, service and function bytes.
pub const MIN_FRAME_SIZE: usize = 3;

/// Observable accumulator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramerState {
    /// No bytes buffered.
    Empty,
    /// Part of a frame buffered.
    Accumulating,
    /// A whole frame is buffered and has not been released yet.
    Complete,
}

/// Streaming frame accumulator.
#[derive(Debug)]
pub struct Framer {
    buf: heapless::Vec<u8, BUFFER_CAPACITY>,
    limit: usize,
    discarded: u32,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    pub const fn new() -> Self {
        Self::with_limit(MAX_FRAME_SIZE)
    }

    /// Accept frames of at most `limit` bytes (clamped to the protocol
    /// range).
    pub const fn with_limit(limit: usize) -> Self {
        let limit = if limit < MIN_FRAME_SIZE {
            MIN_FRAME_SIZE
        } else if limit > MAX_FRAME_SIZE {
            MAX_FRAME_SIZE
        } else {
            limit
        };
        Self {
            buf: heapless::Vec::new(),
            limit,
            discarded: 0,
        }
    }

    pub fn state(&self) -> FramerState {
        match self.buf.first() {
            None => FramerState::Empty,
            Some(&size) if self.buf.len() == size as usize => FramerState::Complete,
            Some(_) => FramerState::Accumulating,
        }
    }

    /// Feed one byte.
    ///
    /// Returns the complete frame when `byte` finishes one. The slice stays
    /// valid until the next call, which starts a fresh frame.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        if self.state() == FramerState::Complete {
            self.buf.clear();
        }

        if self.buf.is_empty() {
            let size = byte as usize;
            if !(MIN_FRAME_SIZE..=self.limit).contains(&size) {
                self.discarded = self.discarded.wrapping_add(1);
                warn!("FRAMER: dropped invalid size byte {:#04x}", byte);
                return None;
            }
        }

        // Cannot overflow: the declared size is at most MAX_FRAME_SIZE.
        let _ = self.buf.push(byte);

        if self.state() == FramerState::Complete {
            trace!("FRAMER: frame complete ({} bytes)", self.buf.len());
            Some(self.buf.as_slice())
        } else {
            None
        }
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Size bytes dropped because they could not start a frame.
    pub fn discarded(&self) -> u32 {
        self.discarded
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

// ── Tests ──────────────────────────────────────────────────────
