//! RPC server: framing, registry and dispatch.
//!
//! The server owns the frame accumulator, a fixed registry of service
//! references indexed by service ID, the TX buffer and the transport.
//! One request is handled to completion inside [`Server::receive`] before
//! the next byte is accepted:
//!
//! 1. the framer completes a frame,
//! 2. the service ID selects a registered service (or the meta-service),
//! 3. the service consumes the request and writes its reply or pushes,
//! 4. the reply length byte is patched and the frame is written out.
//!
//! Addressing failures never reach the caller. They are reported to the
//! peer as a meta error frame and counted in [`ServerStats::errors`].
//!
//! A running stream keeps reading the transport between chunks. Those
//! bytes go to a backlog that is scanned for a stop frame addressed to the
//! stream and replayed through the framer once the stream has finished,
//! so nothing read during a stream is lost or reordered.

use heapless::Deque;
use log::{debug, info, trace, warn};

use crate::config::ServerConfig;
use crate::error::{RegistryError, Result};

use super::cursor::{Reader, Writer};
use super::framer::{BUFFER_CAPACITY, Framer};
use super::meta::{self, Definition, META_SERVICE_ID, MetaError, MetaService};
use super::service::{Call, DispatchError, FrameSink, FunctionId, Service, ServiceId};
use super::stream::stop_target;
use super::transport::Transport;

/// Size of each `Transport::read` in [`Server::poll`].
const POLL_CHUNK: usize = 64;

/// Bytes read but not yet fed to the framer.
type Backlog = Deque<u8, BUFFER_CAPACITY>;

/// Running counters, see [`Server::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Complete frames received.
    pub frames: u32,
    /// Error frames sent.
    pub errors: u32,
    /// Size bytes dropped by the framer.
    pub discarded: u32,
    /// Frames the transport failed to write completely.
    pub transmit_failures: u32,
}

/// RPC server over transport `T` with room for service IDs `0..SLOTS`.
pub struct Server<'s, T: Transport, const SLOTS: usize = 16> {
    config: ServerConfig,
    framer: Framer,
    backlog: Backlog,
    tx: [u8; BUFFER_CAPACITY],
    services: [Option<&'s mut (dyn Service + 's)>; SLOTS],
    meta: MetaService,
    transport: T,
    stats: ServerStats,
}

impl<'s, T: Transport, const SLOTS: usize> Server<'s, T, SLOTS> {
    /// Server with the default configuration.
    pub fn new(transport: T) -> Self {
        Self::build(transport, ServerConfig::default())
    }

    /// Server with a validated configuration.
    pub fn with_config(transport: T, config: ServerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(transport, config))
    }

    fn build(transport: T, config: ServerConfig) -> Self {
        Self {
            config,
            framer: Framer::with_limit(config.rx_buffer_size as usize),
            backlog: Deque::new(),
            tx: [0; BUFFER_CAPACITY],
            services: core::array::from_fn(|_| None),
            meta: MetaService::default(),
            transport,
            stats: ServerStats::default(),
        }
    }

    /// Serve `definition` from the meta-service.
    pub fn with_definition(mut self, definition: Definition) -> Self {
        self.meta = MetaService::new(definition);
        self
    }

    /// Place `service` at its own ID. A later registration for the same
    /// ID replaces the earlier one.
    pub fn register(
        &mut self,
        service: &'s mut (dyn Service + 's),
    ) -> core::result::Result<(), RegistryError> {
        let id = service.id();
        if id == META_SERVICE_ID {
            warn!("RPC[svc={}]: id reserved for the meta-service", id);
            return Err(RegistryError::Reserved(id));
        }

        let Some(slot) = self.services.get_mut(id as usize) else {
            warn!("RPC[svc={}]: id exceeds {} registry slots", id, SLOTS);
            return Err(RegistryError::OutOfRange { id, slots: SLOTS });
        };

        if slot.is_some() {
            warn!("RPC[svc={}]: replacing registered service", id);
        }
        *slot = Some(service);
        info!("RPC[svc={}]: registered", id);
        Ok(())
    }

    pub fn is_registered(&self, id: ServiceId) -> bool {
        id == META_SERVICE_ID || self.services.get(id as usize).is_some_and(Option::is_some)
    }

    /// Feed one received byte. Dispatches when it completes a frame.
    pub fn receive(&mut self, byte: u8) {
        self.accept(byte);
        self.drain_backlog();
    }

    /// Feed a run of received bytes.
    pub fn receive_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.accept(b);
        }
        self.drain_backlog();
    }

    /// Drain everything the transport has pending into the framer.
    /// Returns the number of bytes read.
    ///
    /// A stream started by one of these bytes sees the rest of the read
    /// when it looks for a stop frame.
    pub fn poll(&mut self) -> core::result::Result<usize, T::Error> {
        let mut buf = [0u8; POLL_CHUNK];
        let mut total = 0;
        loop {
            let n = self.transport.read(&mut buf)?;
            for &b in &buf[..n] {
                self.enqueue(b);
            }
            self.drain_backlog();
            total += n;
            if n < buf.len() {
                return Ok(total);
            }
        }
    }

    fn enqueue(&mut self, byte: u8) {
        if self.backlog.is_full() {
            self.drain_backlog();
        }
        // Empty after the drain above.
        let _ = self.backlog.push_back(byte);
    }

    /// Replay bytes read while a stream was running.
    fn drain_backlog(&mut self) {
        while let Some(byte) = self.backlog.pop_front() {
            self.accept(byte);
        }
    }

    fn accept(&mut self, byte: u8) {
        let Self {
            config,
            framer,
            backlog,
            tx,
            services,
            meta,
            transport,
            stats,
        } = self;

        let Some(frame) = framer.push(byte) else {
            return;
        };
        stats.frames = stats.frames.wrapping_add(1);
        if config.log_frames {
            trace!("RPC: rx {:02x?}", frame);
        }

        let limit = config.max_tx_frame();
        let mut out = Outbound::new(transport, backlog, config, &mut stats.transmit_failures);
        if dispatch_frame(frame, services, meta, &mut tx[..limit], &mut out).is_err() {
            stats.errors = stats.errors.wrapping_add(1);
        }
        out.flush();
    }

    /// Run `f` with a call scoped to `service` outside any dispatch.
    fn with_call(&mut self, service: ServiceId, f: impl FnOnce(&mut Call<'_>)) {
        let limit = self.config.max_tx_frame();
        let mut out = Outbound::new(
            &mut self.transport,
            &mut self.backlog,
            &self.config,
            &mut self.stats.transmit_failures,
        );
        let mut call = Call::new(service, &mut self.tx[..limit], &mut out);
        f(&mut call);
        drop(call);
        out.flush();
    }

    /// Push an application error frame to the peer.
    ///
    /// The frame carries only the error kind and its parameter. `message`
    /// is logged locally and never sent.
    pub fn report_error(&mut self, error: MetaError, message: Option<&str>) {
        self.stats.errors = self.stats.errors.wrapping_add(1);
        self.with_call(META_SERVICE_ID, |call| meta::report(call, error, message));
    }

    /// Push one frame on `service`/`function`, e.g. a server stream chunk
    /// produced outside a request.
    pub fn push(
        &mut self,
        service: ServiceId,
        function: FunctionId,
        body: impl FnOnce(&mut Writer<'_>),
    ) {
        self.with_call(service, |call| call.push(function, body));
    }

    /// Ask the peer to stop a client stream by sending the empty
    /// `[03][service][stream]` frame.
    pub fn request_stop(&mut self, service: ServiceId, stream: FunctionId) {
        debug!("RPC[svc={}]: request stop of stream {}", service, stream);
        self.with_call(service, |call| call.push(stream, |_| {}));
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            discarded: self.framer.discarded(),
            ..self.stats
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn meta(&self) -> &MetaService {
        &self.meta
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

/// Route one complete frame. Errors have already been reported to the
/// peer when this returns `Err`.
fn dispatch_frame<'s>(
    frame: &[u8],
    services: &mut [Option<&'s mut (dyn Service + 's)>],
    meta: &mut MetaService,
    tx: &mut [u8],
    sink: &mut dyn FrameSink,
) -> core::result::Result<(), DispatchError> {
    let mut request = Reader::new(frame);
    request.skip(1);
    let id = request.read_u8();
    let mut call = Call::new(id, tx, sink);

    let result = if id == META_SERVICE_ID {
        meta.invoke(&mut request, &mut call)
    } else {
        match services.get_mut(id as usize).and_then(Option::as_mut) {
            Some(service) => service.invoke(&mut request, &mut call),
            None => Err(DispatchError::UnknownService { service: id }),
        }
    };

    match result {
        Ok(()) => call.finish(),
        Err(e) => {
            call.discard();
            debug!("RPC[svc={}]: {}", id, e);
            meta::report(&mut call, e.into(), None);
        }
    }
    result
}

/// Transport-backed frame sink. Write failures are logged and counted.
///
/// While a stream runs it also reads the transport into the server's
/// backlog and watches it for a stop frame.
struct Outbound<'t, T: Transport> {
    transport: &'t mut T,
    backlog: &'t mut Backlog,
    log_frames: bool,
    failures: &'t mut u32,
    scan: Framer,
    scanned: usize,
}

impl<'t, T: Transport> Outbound<'t, T> {
    fn new(
        transport: &'t mut T,
        backlog: &'t mut Backlog,
        config: &ServerConfig,
        failures: &'t mut u32,
    ) -> Self {
        Self {
            transport,
            backlog,
            log_frames: config.log_frames,
            failures,
            scan: Framer::with_limit(config.rx_buffer_size as usize),
            scanned: 0,
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.transport.flush() {
            warn!("RPC: transport flush failed: {:?}", e);
        }
    }

    /// Move pending transport bytes into the backlog until it is full.
    fn read_pending(&mut self) {
        let mut buf = [0u8; POLL_CHUNK];
        while !self.backlog.is_full() {
            let room = (self.backlog.capacity() - self.backlog.len()).min(buf.len());
            let n = match self.transport.read(&mut buf[..room]) {
                Ok(n) => n,
                Err(e) => {
                    warn!("RPC: transport read failed: {:?}", e);
                    return;
                }
            };
            for &b in &buf[..n] {
                // Bounded by `room`.
                let _ = self.backlog.push_back(b);
            }
            if n < room {
                return;
            }
        }
    }
}

impl<T: Transport> FrameSink for Outbound<'_, T> {
    fn send(&mut self, frame: &[u8]) {
        if self.log_frames {
            trace!("RPC: tx {:02x?}", frame);
        }
        match self.transport.write(frame) {
            Ok(n) if n == frame.len() => {}
            Ok(n) => {
                *self.failures = self.failures.wrapping_add(1);
                warn!("RPC: short write ({} of {} bytes)", n, frame.len());
            }
            Err(e) => {
                *self.failures = self.failures.wrapping_add(1);
                warn!("RPC: transport write failed: {:?}", e);
            }
        }
    }

    fn watch_stops(&mut self) {
        self.scan.reset();
        self.scanned = 0;
    }

    fn stop_received(&mut self, service: ServiceId, stream: FunctionId) -> bool {
        self.read_pending();

        let mut stop = false;
        for &b in self.backlog.iter().skip(self.scanned) {
            if let Some(frame) = self.scan.push(b) {
                stop |= stop_target(frame) == Some((service, stream));
            }
        }
        self.scanned = self.backlog.len();

        if stop {
            debug!("RPC[svc={}]: stop for stream {} read mid-stream", service, stream);
        }
        stop
    }
}

// ── Tests ──────────────────────────────────────────────────────
