//! Transport-agnostic RPC subsystem.
//!
//! Byte-exact binary RPC for heapless targets: length-prefixed frames,
//! a closed catalogue of wire shapes, table-driven dispatch and
//! server-push streams.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      RPC Stack                             │
//! │                                                            │
//! │  ┌───────────┐   ┌──────────┐   ┌───────────────────────┐  │
//! │  │ Transport │──▶│  Framer  │──▶│  Server (dispatcher)  │  │
//! │  │ / RxQueue │   │          │   │  → Service table      │  │
//! │  └───────────┘   └──────────┘   └───────────────────────┘  │
//! │       ▲                                    │               │
//! │       │              ┌─────────────────────┘               │
//! │       │              ▼                                     │
//! │  ┌───────────┐   ┌───────────────┐                         │
//! │  │ Transport │◀──│ Call (reply,  │   wire codec in between │
//! │  │ (write)   │   │ push, stream) │                         │
//! │  └───────────┘   └───────────────┘                         │
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod chunked;
pub mod client;
pub mod compress;
pub mod cursor;
pub mod framer;
pub mod meta;
pub mod rx_queue;
pub mod server;
pub mod service;
pub mod stream;
pub mod transport;
pub mod wire;
