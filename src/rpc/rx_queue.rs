//! Interrupt-to-main-loop byte queue.
//!
//! A UART RX interrupt cannot call [`Server::receive`] directly: the server
//! is owned by the main loop and dispatch may take a while (stream loops).
//! The interrupt pushes bytes into a static [`RxQueue`] instead, and the
//! main loop drains it into the server.
//!
//! ```text
//! ┌──────────────┐   push(byte)   ┌─────────┐  drain_into   ┌──────────┐
//! │  RX ISR      │──────────────▶│ RxQueue │─────────────▶│  Server  │
//! └──────────────┘                └─────────┘  (main loop)  └──────────┘
//! ```
//!
//! Built on an `embassy-sync` channel guarded by a critical section, so it
//! is `Sync` and `const`-constructible without heap allocation.
//!
//! The main loop does not drain the queue while a stream runs. Streams
//! registered with [`RxQueue::watch_stream`] are stopped from the
//! interrupt side instead: every queued byte also goes through a framer,
//! and a stop frame for a watched stream sets its [`StreamControl`] flag.
//! The stop frame itself stays queued and is dispatched as usual once the
//! stream has finished.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::debug;

use super::framer::Framer;
use super::server::Server;
use super::service::{FunctionId, ServiceId};
use super::stream::{StreamControl, stop_target};
use super::transport::Transport;

/// Streams one queue can stop from the interrupt side.
pub const MAX_WATCHED: usize = 8;

type Watched = (ServiceId, FunctionId, &'static StreamControl);

/// Mirror of the server's framing over the queued bytes.
struct StopScanner {
    framer: Framer,
    watched: heapless::Vec<Watched, MAX_WATCHED>,
}

impl StopScanner {
    fn scan(&mut self, byte: u8) {
        if self.watched.is_empty() {
            return;
        }
        let Some(target) = self.framer.push(byte).and_then(stop_target) else {
            return;
        };
        for (service, stream, control) in &self.watched {
            if (*service, *stream) == target {
                debug!("RX[svc={}]: stop for stream {}", service, stream);
                control.request_stop();
            }
        }
    }
}

/// Bounded byte FIFO shared between an interrupt and the main loop.
pub struct RxQueue<const N: usize> {
    channel: Channel<CriticalSectionRawMutex, u8, N>,
    overflow: AtomicU32,
    scanner: Mutex<CriticalSectionRawMutex, RefCell<StopScanner>>,
}

impl<const N: usize> Default for RxQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxQueue<N> {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            overflow: AtomicU32::new(0),
            scanner: Mutex::new(RefCell::new(StopScanner {
                framer: Framer::new(),
                watched: heapless::Vec::new(),
            })),
        }
    }

    /// Stop `control` when a stop frame for `service`/`stream` is queued.
    ///
    /// Returns `false` when [`MAX_WATCHED`] streams are already watched.
    pub fn watch_stream(
        &self,
        service: ServiceId,
        stream: FunctionId,
        control: &'static StreamControl,
    ) -> bool {
        self.scanner.lock(|scanner| {
            let mut scanner = scanner.borrow_mut();
            let known = scanner
                .watched
                .iter()
                .any(|&(s, f, c)| (s, f) == (service, stream) && core::ptr::eq(c, control));
            known || scanner.watched.push((service, stream, control)).is_ok()
        })
    }

    /// Queue one byte. Returns `false` (and counts the byte) when full.
    pub fn push(&self, byte: u8) -> bool {
        if self.channel.try_send(byte).is_ok() {
            self.scanner.lock(|scanner| scanner.borrow_mut().scan(byte));
            true
        } else {
            self.overflow.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Queue a run of bytes. Returns how many were accepted.
    pub fn push_slice(&self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| self.push(b)).count()
    }

    /// Feed every queued byte to `server`. Returns the number of bytes
    /// drained.
    pub fn drain_into<T: Transport, const SLOTS: usize>(
        &self,
        server: &mut Server<'_, T, SLOTS>,
    ) -> usize {
        let mut drained = 0;
        while let Ok(byte) = self.channel.try_receive() {
            server.receive(byte);
            drained += 1;
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Bytes dropped because the queue was full.
    pub fn overflow_count(&self) -> u32 {
        self.overflow.load(Ordering::Relaxed)
    }
}

// ── Tests ──────────────────────────────────────────────────────
