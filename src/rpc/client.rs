//! Peer-side framing helpers.
//!
//! The device only needs [`Server`](super::server::Server). Host tools,
//! test harnesses and device-to-device links use these to build requests
//! and to pick apart response frames.

use crate::error::FrameError;

use super::cursor::{Reader, Writer};
use super::framer::{MAX_FRAME_SIZE, MIN_FRAME_SIZE};
use super::meta::{ERROR_FUNCTION, META_SERVICE_ID, MetaError};
use super::service::{FunctionId, ServiceId};

/// Build a request frame in `buf` and return it.
///
/// `body` encodes the parameters. Output beyond 255 bytes (or beyond
/// `buf`) is clipped, and the size byte always matches what was kept.
pub fn encode_request<'b>(
    buf: &'b mut [u8],
    service: ServiceId,
    function: FunctionId,
    body: impl FnOnce(&mut Writer<'_>),
) -> &'b [u8] {
    let cap = buf.len().min(MAX_FRAME_SIZE);
    let mut w = Writer::new(&mut buf[..cap]);
    w.write_u8(0);
    w.write_u8(service);
    w.write_u8(function);
    body(&mut w);
    let len = w.position();
    w.patch(0, len as u8);
    &buf[..len]
}

/// The empty frame that stops `stream` on `service`, in either direction.
pub const fn stop_frame(service: ServiceId, stream: FunctionId) -> [u8; 3] {
    [MIN_FRAME_SIZE as u8, service, stream]
}

/// A validated response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> ResponseFrame<'a> {
    /// Check the header and the length prefix of one complete frame.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, FrameError> {
        if bytes.len() < MIN_FRAME_SIZE {
            return Err(FrameError::TooShort { len: bytes.len() });
        }
        let declared = bytes[0] as usize;
        if declared != bytes.len() {
            return Err(FrameError::SizeMismatch {
                declared,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes })
    }

    pub fn service_id(&self) -> ServiceId {
        self.bytes[1]
    }

    pub fn function_id(&self) -> FunctionId {
        self.bytes[2]
    }

    /// Require a specific address.
    pub fn expect(self, service: ServiceId, function: FunctionId) -> Result<Self, FrameError> {
        if self.service_id() == service && self.function_id() == function {
            Ok(self)
        } else {
            Err(FrameError::UnexpectedAddress {
                service: self.service_id(),
                function: self.function_id(),
            })
        }
    }

    /// Cursor over the return values.
    pub fn payload(&self) -> Reader<'a> {
        Reader::new(&self.bytes[MIN_FRAME_SIZE..])
    }

    /// No payload: a void reply or a stop request.
    pub fn is_empty(&self) -> bool {
        self.bytes.len() == MIN_FRAME_SIZE
    }

    pub fn is_error(&self) -> bool {
        self.service_id() == META_SERVICE_ID && self.function_id() == ERROR_FUNCTION
    }

    /// Decode a meta error frame.
    pub fn meta_error(&self) -> Option<MetaError> {
        self.is_error().then(|| self.payload().decode())
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

// ── Tests ──────────────────────────────────────────────────────
