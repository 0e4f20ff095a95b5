//! Meta-service: error reporting and definition introspection.
//!
//! Always present at the reserved address [`META_SERVICE_ID`], outside the
//! user registry. Functions:
//!
//! | ID | Name         | Kind                                            |
//! |----|--------------|-------------------------------------------------|
//! | 0  | `error`      | server push `(kind: u8, p0..p3: i32)`           |
//! | 1  | `definition` | stream `(chunk: bytearray, final: bool)`        |
//! | 2  | `version`    | function `() -> (string, string, string)`       |
//!
//! An error frame is always 20 bytes:
//! ```text
//! 14 FF 00 <kind> <p0:i32> <p1:i32> <p2:i32> <p3:i32>
//! ```
//!
//! The definition stream follows the stream rule: `04 FF 01 01` starts it,
//! `04 FF 01 00` or `03 FF 01` stops it.

use log::{debug, info, warn};

use super::cursor::{Reader, Writer};
use super::service::{Call, DispatchError, FunctionId, Handler, Service, ServiceId, dispatch};
use super::stream::{Next, StreamControl};
use super::wire::{Decode, Encode, write_bytearray};

/// Reserved meta-service address.
pub const META_SERVICE_ID: ServiceId = 0xFF;

pub const ERROR_FUNCTION: FunctionId = 0;
pub const DEFINITION_FUNCTION: FunctionId = 1;
pub const VERSION_FUNCTION: FunctionId = 2;

/// Size of every error frame.
pub const ERROR_FRAME_SIZE: usize = 20;

/// Header, length prefix and `final` flag around a definition chunk.
pub const DEFINITION_CHUNK_OVERHEAD: usize = 5;

crate::wire_enum! {
    /// Error categories carried by the error frame.
    pub enum MetaErrorKind {
        /// The addressed service is not registered. No context.
        UnknownService = 0,
        /// The service exists but has no such function or stream.
        /// `p0` = service ID, `p1` = function ID.
        UnknownFunction = 1,
        /// Reported by the application; context is application defined.
        Application = 2,
    }
}

/// Error frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetaError {
    pub kind: MetaErrorKind,
    pub params: [i32; 4],
}

impl MetaError {
    pub const fn new(kind: MetaErrorKind, params: [i32; 4]) -> Self {
        Self { kind, params }
    }

    pub const fn unknown_service() -> Self {
        Self::new(MetaErrorKind::UnknownService, [0; 4])
    }

    pub const fn unknown_function(service: ServiceId, function: FunctionId) -> Self {
        Self::new(
            MetaErrorKind::UnknownFunction,
            [service as i32, function as i32, 0, 0],
        )
    }
}

impl From<DispatchError> for MetaError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::UnknownService { .. } => Self::unknown_service(),
            DispatchError::UnknownFunction { service, function } => {
                Self::unknown_function(service, function)
            }
        }
    }
}

impl Encode for MetaError {
    fn encode(&self, w: &mut Writer<'_>) {
        w.encode(&self.kind);
        w.encode(&self.params);
    }
}

impl<'a> Decode<'a> for MetaError {
    fn decode(r: &mut Reader<'a>) -> Self {
        Self {
            kind: r.decode(),
            params: r.decode(),
        }
    }
}

/// Push an error frame to the peer. `message` is only logged.
pub(crate) fn report(call: &mut Call<'_>, error: MetaError, message: Option<&str>) {
    let [p0, p1, p2, p3] = error.params;
    match message {
        Some(m) => warn!(
            "META: {:?} ({}, {}, {}, {}): {}",
            error.kind, p0, p1, p2, p3, m
        ),
        None => warn!("META: {:?} ({}, {}, {}, {})", error.kind, p0, p1, p2, p3),
    }
    call.push_frame(META_SERVICE_ID, ERROR_FUNCTION, |w| w.encode(&error));
}

/// Service definition artefacts served by the meta-service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    /// Definition version string, may be empty.
    pub version: &'static str,
    /// Hex SHA-256 of the definition text, may be empty.
    pub hash: &'static str,
    /// DEFLATE-compressed definition text, empty when not embedded.
    pub compressed: &'static [u8],
}

impl Definition {
    pub const EMPTY: Self = Self {
        version: "",
        hash: "",
        compressed: &[],
    };
}

impl Default for Definition {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Library version reported by `version()`.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The reserved meta-service.
#[derive(Debug)]
pub struct MetaService {
    definition: Definition,
    control: StreamControl,
}

impl MetaService {
    pub const fn new(definition: Definition) -> Self {
        Self {
            definition,
            control: StreamControl::new(),
        }
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    /// State of the definition stream.
    pub fn definition_stream(&self) -> &StreamControl {
        &self.control
    }

    // Error frames travel server to peer only.
    fn error(&mut self, _r: &mut Reader<'_>) {}

    fn send_definition(&mut self, _r: &mut Reader<'_>, call: &mut Call<'_>) {
        let chunk = call
            .capacity()
            .saturating_sub(DEFINITION_CHUNK_OVERHEAD)
            .max(1);
        let mut rest = self.definition.compressed;
        info!(
            "META: definition stream ({} bytes, {} per chunk)",
            rest.len(),
            chunk
        );

        call.stream(&self.control, |w| {
            let (head, tail) = rest.split_at(rest.len().min(chunk));
            write_bytearray(w, head);
            rest = tail;
            if rest.is_empty() { Next::Last } else { Next::More }
        });
    }

    fn stop_definition(&mut self) {
        debug!("META: definition stream stop");
        self.control.request_stop();
    }

    fn version(&mut self, _r: &mut Reader<'_>, w: &mut Writer<'_>) {
        w.encode(self.definition.version);
        w.encode(self.definition.hash);
        w.encode(LIBRARY_VERSION);
    }

    const TABLE: [Handler<Self>; 3] = [
        Handler::Sink(Self::error),
        Handler::Stream {
            start: Self::send_definition,
            stop: Self::stop_definition,
        },
        Handler::Function(Self::version),
    ];
}

impl Default for MetaService {
    fn default() -> Self {
        Self::new(Definition::EMPTY)
    }
}

impl Service for MetaService {
    fn id(&self) -> ServiceId {
        META_SERVICE_ID
    }

    fn invoke(&mut self, request: &mut Reader<'_>, call: &mut Call<'_>) -> Result<(), DispatchError> {
        dispatch(self, &Self::TABLE, request, call)
    }
}

// ── Tests ──────────────────────────────────────────────────────
