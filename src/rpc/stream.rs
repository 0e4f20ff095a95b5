//! Server-push stream control.
//!
//! A stream handler pushes a sequence of chunk frames on its own function
//! ID, each ending in a `final` flag. The loop ends when the data source is
//! exhausted or when a stop was requested, whichever happens first.
//!
//! The stop request may come from an interrupt handler while the loop runs
//! on the main thread, so [`StreamControl`] keeps both the flag and the
//! observable state in atomics. It is `Sync` and can live in a `static`.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use super::service::{FunctionId, ServiceId};

/// Per-stream lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StreamState {
    /// Never started, or reset.
    Idle = 0,
    /// The push loop is running.
    Streaming = 1,
    /// The last invocation finished. Terminal until the next start.
    Stopped = 2,
}

impl StreamState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Streaming,
            2 => Self::Stopped,
            _ => Self::Idle,
        }
    }
}

/// Whether a produced chunk is the last one the source has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    More,
    Last,
}

/// Stop flag and state of one stream function.
#[derive(Debug)]
pub struct StreamControl {
    stop: AtomicBool,
    state: AtomicU8,
}

impl Default for StreamControl {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamControl {
    pub const fn new() -> Self {
        Self {
            stop: AtomicBool::new(false),
            state: AtomicU8::new(StreamState::Idle as u8),
        }
    }

    /// Ask the running loop to emit one final chunk and exit.
    ///
    /// Safe to call from any context, including while the loop runs.
    /// Has no effect on a stream that is not running: the flag is cleared
    /// when the next loop starts.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn state(&self) -> StreamState {
        StreamState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == StreamState::Streaming
    }

    /// Enter `Streaming` with a cleared stop flag.
    pub(crate) fn begin(&self) {
        self.stop.store(false, Ordering::Release);
        self.state.store(StreamState::Streaming as u8, Ordering::Release);
    }

    pub(crate) fn finish(&self) {
        self.state.store(StreamState::Stopped as u8, Ordering::Release);
    }
}

/// Address of the stream a complete frame asks to stop, if it is a stop
/// request: `[03][svc][id]`, or any longer frame whose start flag is
/// `false`.
pub fn stop_target(frame: &[u8]) -> Option<(ServiceId, FunctionId)> {
    match frame {
        [3, service, stream] => Some((*service, *stream)),
        [_, service, stream, 0, ..] => Some((*service, *stream)),
        _ => None,
    }
}

// ── Tests ──────────────────────────────────────────────────────
