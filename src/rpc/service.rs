//! Service trait, per-function handler tables and the response builder.
//!
//! A service is a table of [`Handler`]s indexed by function ID. The
//! [`dispatch`] helper implements the table lookup so a service only has
//! to supply its ID and its table:
//!
//! ```
//! use lrpc::rpc::cursor::{Reader, Writer};
//! use lrpc::rpc::service::{dispatch, Call, DispatchError, Handler, Service, ServiceId};
//!
//! struct Echo;
//!
//! impl Echo {
//!     fn echo(&mut self, r: &mut Reader<'_>, w: &mut Writer<'_>) {
//!         let v: u32 = r.decode();
//!         w.encode(&v);
//!     }
//!
//!     const TABLE: [Handler<Self>; 1] = [Handler::Function(Self::echo)];
//! }
//!
//! impl Service for Echo {
//!     fn id(&self) -> ServiceId {
//!         3
//!     }
//!
//!     fn invoke(&mut self, r: &mut Reader<'_>, call: &mut Call<'_>) -> Result<(), DispatchError> {
//!         dispatch(self, &Self::TABLE, r, call)
//!     }
//! }
//! ```

use core::fmt;

use log::debug;

use super::cursor::{Reader, Writer};
use super::stream::{Next, StreamControl};
use super::wire::{Decode, Encode};

pub type ServiceId = u8;
pub type FunctionId = u8;

/// A frame could not be routed to a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    UnknownService { service: ServiceId },
    UnknownFunction { service: ServiceId, function: FunctionId },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownService { service } => write!(f, "unknown service {service}"),
            Self::UnknownFunction { service, function } => {
                write!(f, "unknown function {function} on service {service}")
            }
        }
    }
}

/// One addressable unit of remotely callable functions.
pub trait Service {
    fn id(&self) -> ServiceId;

    /// Handle one request. `request` starts at the function ID byte.
    fn invoke(&mut self, request: &mut Reader<'_>, call: &mut Call<'_>)
    -> Result<(), DispatchError>;
}

/// How a function ID is served.
pub enum Handler<S> {
    /// Request/response. The handler decodes parameters and encodes the
    /// return values into the reply.
    Function(fn(&mut S, &mut Reader<'_>, &mut Writer<'_>)),
    /// Peer-stoppable server stream. The request starts with a bool:
    /// `true` calls `start` with the remaining parameters, `false` (or an
    /// empty request) calls `stop`.
    Stream {
        start: fn(&mut S, &mut Reader<'_>, &mut Call<'_>),
        stop: fn(&mut S),
    },
    /// Client stream: consumes data, never replies.
    Sink(fn(&mut S, &mut Reader<'_>)),
    /// Gap in a sparse table, reported like an ID past the end.
    Missing,
}

impl<S> Clone for Handler<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Handler<S> {}

/// Route a request through a handler table.
///
/// Reads the function ID, then hands the rest of the request to the
/// matching handler. IDs past the end of the table, and
/// [`Handler::Missing`] entries, are reported as
/// [`DispatchError::UnknownFunction`].
pub fn dispatch<S: Service>(
    service: &mut S,
    table: &[Handler<S>],
    request: &mut Reader<'_>,
    call: &mut Call<'_>,
) -> Result<(), DispatchError> {
    let function = request.read_u8();
    let handler = table
        .get(function as usize)
        .copied()
        .unwrap_or(Handler::Missing);

    call.function = function;
    match handler {
        Handler::Missing => {
            return Err(DispatchError::UnknownFunction {
                service: service.id(),
                function,
            });
        }
        Handler::Function(f) => {
            call.begin_reply();
            f(service, request, &mut call.writer);
        }
        Handler::Stream { start, stop } => {
            if bool::decode(request) {
                start(service, request, call);
            } else {
                debug!("RPC[svc={}]: stop stream {}", call.service, function);
                stop(service);
            }
        }
        Handler::Sink(f) => f(service, request),
    }
    Ok(())
}

/// Receives finished frames.
pub(crate) trait FrameSink {
    fn send(&mut self, frame: &[u8]);

    /// A stream loop is starting: stop frames count from here on.
    fn watch_stops(&mut self) {}

    /// Whether a stop for `service`/`stream` arrived since
    /// [`watch_stops`](Self::watch_stops).
    fn stop_received(&mut self, _service: ServiceId, _stream: FunctionId) -> bool {
        false
    }
}

/// Response builder for one dispatched request.
///
/// Wraps the TX buffer and the outbound sink. Function replies are
/// collected and sent once the handler returns; pushes are sent
/// immediately, one frame each.
pub struct Call<'a> {
    service: ServiceId,
    function: FunctionId,
    writer: Writer<'a>,
    sink: &'a mut dyn FrameSink,
}

impl<'a> Call<'a> {
    pub(crate) fn new(service: ServiceId, tx: &'a mut [u8], sink: &'a mut dyn FrameSink) -> Self {
        Self {
            service,
            function: 0,
            writer: Writer::new(tx),
            sink,
        }
    }

    pub fn service_id(&self) -> ServiceId {
        self.service
    }

    /// Function ID of the request being served.
    pub fn function_id(&self) -> FunctionId {
        self.function
    }

    /// Largest frame this call can send.
    pub fn capacity(&self) -> usize {
        self.writer.capacity()
    }

    /// Start the reply frame: size placeholder, service, function.
    pub(crate) fn begin_reply(&mut self) {
        self.writer.reset();
        self.writer.write_u8(0);
        self.writer.write_u8(self.service);
        self.writer.write_u8(self.function);
    }

    /// Send the pending reply, if one was started.
    pub(crate) fn finish(&mut self) {
        if self.writer.position() > 2 {
            self.send_pending();
        }
        self.writer.reset();
    }

    /// Drop the pending reply.
    pub(crate) fn discard(&mut self) {
        self.writer.reset();
    }

    fn send_pending(&mut self) {
        let len = self.writer.position();
        self.writer.patch(0, len as u8);
        self.sink.send(self.writer.written());
    }

    /// Build and send one frame to `service`/`function` immediately.
    pub(crate) fn push_frame(
        &mut self,
        service: ServiceId,
        function: FunctionId,
        body: impl FnOnce(&mut Writer<'_>),
    ) {
        self.writer.reset();
        self.writer.write_u8(0);
        self.writer.write_u8(service);
        self.writer.write_u8(function);
        body(&mut self.writer);
        self.send_pending();
        self.writer.reset();
    }

    /// Push one frame on this service's `function`.
    pub fn push(&mut self, function: FunctionId, body: impl FnOnce(&mut Writer<'_>)) {
        self.push_frame(self.service, function, body);
    }

    /// Push one value on this service's `function`.
    pub fn push_value<T: Encode + ?Sized>(&mut self, function: FunctionId, value: &T) {
        self.push(function, |w| w.encode(value));
    }

    /// Run a stream on the current function ID.
    ///
    /// `next` writes one chunk payload per call; the loop appends the
    /// `final` flag. Before each chunk the loop checks for a stop frame
    /// that arrived in the meantime. A chunk is final when `next` reports
    /// [`Next::Last`] or when a stop was requested before or while it was
    /// produced. Returns the number of chunks sent.
    pub fn stream(
        &mut self,
        control: &StreamControl,
        mut next: impl FnMut(&mut Writer<'_>) -> Next,
    ) -> usize {
        let (service, function) = (self.service, self.function);
        control.begin();
        self.sink.watch_stops();
        debug!("RPC[svc={}]: stream {} started", service, function);

        let mut chunks = 0;
        loop {
            if self.sink.stop_received(service, function) {
                control.request_stop();
            }

            let mut last = false;
            self.push_frame(service, function, |w| {
                let produced = next(w);
                last = produced == Next::Last || control.stop_requested();
                w.encode(&last);
            });
            chunks += 1;
            if last {
                break;
            }
        }

        control.finish();
        debug!(
            "RPC[svc={}]: stream {} finished after {} chunks",
            service, function, chunks
        );
        chunks
    }
}

// ── Tests ──────────────────────────────────────────────────────
