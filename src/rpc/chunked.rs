//! Peer-side reassembly of the definition stream.
//!
//! The meta-service sends the compressed definition as a run of frames:
//!
//! ```text
//! Frame 1: [size][FF][01][len][chunk 1][final=0]
//! Frame 2: [size][FF][01][len][chunk 2][final=0]
//! Frame N: [size][FF][01][len][chunk N][final=1]
//! ```
//!
//! The assembler concatenates chunks until the final one, then the
//! result can be inflated and checked against the advertised hash.

extern crate alloc;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::error::{DefinitionError, Error};

use super::client::ResponseFrame;
use super::compress::{MAX_DEFINITION_SIZE, decompress_definition, definition_hash};
use super::meta::{DEFINITION_FUNCTION, META_SERVICE_ID};
use super::wire::read_bytearray;

/// Reassembly buffer for incoming definition chunks.
#[derive(Debug, Default)]
pub struct DefinitionAssembler {
    buffer: Vec<u8>,
    active: bool,
}

impl DefinitionAssembler {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            active: false,
        }
    }

    /// Append one chunk.
    ///
    /// Returns the complete compressed definition when `last` is set,
    /// `None` while more chunks are expected.
    pub fn feed(&mut self, chunk: &[u8], last: bool) -> Result<Option<Vec<u8>>, DefinitionError> {
        if !self.active {
            self.buffer.clear();
            self.active = true;
        }

        let len = self.buffer.len() + chunk.len();
        if len > MAX_DEFINITION_SIZE {
            warn!("META: definition exceeds {} bytes", MAX_DEFINITION_SIZE);
            self.reset();
            return Err(DefinitionError::TooLarge { len });
        }
        self.buffer.extend_from_slice(chunk);

        if last {
            self.active = false;
            debug!("META: definition received ({} bytes)", self.buffer.len());
            Ok(Some(core::mem::take(&mut self.buffer)))
        } else {
            Ok(None)
        }
    }

    /// Append the chunk carried by a definition stream frame.
    pub fn feed_frame(&mut self, frame: &ResponseFrame<'_>) -> Result<Option<Vec<u8>>, Error> {
        let frame = frame.expect(META_SERVICE_ID, DEFINITION_FUNCTION)?;
        let mut payload = frame.payload();
        let chunk = read_bytearray(&mut payload);
        let last: bool = payload.decode();
        Ok(self.feed(chunk, last)?)
    }

    /// Inflate a reassembled definition and, when `expected_hash` is
    /// given, verify it.
    pub fn finish(
        compressed: &[u8],
        expected_hash: Option<&str>,
    ) -> Result<Vec<u8>, DefinitionError> {
        let text = decompress_definition(compressed)?;
        if expected_hash.is_some_and(|h| !definition_hash(&text).eq_ignore_ascii_case(h)) {
            warn!("META: definition hash mismatch");
            return Err(DefinitionError::HashMismatch);
        }
        Ok(text)
    }

    /// Discard any partial definition.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.active = false;
    }

    /// Whether reassembly is in progress.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

// ── Tests ────────────────────────────────────────────────────
