//! lrpc: binary RPC framing, codec and dispatch for microcontrollers.
//!
//! The core is heapless and never panics on peer input. Host-side helpers
//! (definition packaging, reassembly) use `alloc`.
//!
//! ```
//! use lrpc::rpc::cursor::{Reader, Writer};
//! use lrpc::rpc::server::Server;
//! use lrpc::rpc::service::{dispatch, Call, DispatchError, Handler, Service, ServiceId};
//! use lrpc::rpc::transport::NullTransport;
//!
//! struct Led {
//!     on: bool,
//! }
//!
//! impl Led {
//!     fn set(&mut self, r: &mut Reader<'_>, _w: &mut Writer<'_>) {
//!         self.on = r.decode();
//!     }
//!
//!     const TABLE: [Handler<Self>; 1] = [Handler::Function(Self::set)];
//! }
//!
//! impl Service for Led {
//!     fn id(&self) -> ServiceId {
//!         0
//!     }
//!
//!     fn invoke(&mut self, r: &mut Reader<'_>, call: &mut Call<'_>) -> Result<(), DispatchError> {
//!         dispatch(self, &Self::TABLE, r, call)
//!     }
//! }
//!
//! let mut led = Led { on: false };
//! let mut server: Server<'_, NullTransport, 1> = Server::new(NullTransport);
//! server.register(&mut led).unwrap();
//! server.receive_bytes(&[0x04, 0x00, 0x00, 0x01]);
//! ```

#![deny(unused_must_use)]

pub mod config;
pub mod error;
pub mod rpc;

pub use error::{Error, Result};

#[doc(hidden)]
pub use log as __log;
