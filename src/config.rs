//! Server configuration parameters
//!
//! Buffer limits and diagnostics switches for the RPC server. The RX/TX
//! buffers themselves are fixed 256-byte arrays (the largest frame a
//! single-byte length prefix can describe); the configured sizes only
//! limit how much of them is used, so a board can mirror the buffer sizes
//! declared in its service definition.
//!
//! Values can be persisted in flash with [`ServerConfig::to_slice`] and
//! restored with [`ServerConfig::from_bytes`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rpc::framer::{BUFFER_CAPACITY, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
use crate::rpc::meta::{DEFINITION_CHUNK_OVERHEAD, ERROR_FRAME_SIZE};

/// Runtime configuration for [`crate::rpc::server::Server`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Largest inbound frame accepted (bytes, including the size byte).
    pub rx_buffer_size: u16,
    /// Usable part of the TX buffer (bytes). Bounds every response and
    /// the definition stream chunk size.
    pub tx_buffer_size: u16,
    /// Trace every transmitted frame at `trace` level.
    pub log_frames: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rx_buffer_size: BUFFER_CAPACITY as u16,
            tx_buffer_size: BUFFER_CAPACITY as u16,
            log_frames: false,
        }
    }
}

impl ServerConfig {
    /// Check the buffer sizes against the protocol limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rx = self.rx_buffer_size as usize;
        if !(MIN_FRAME_SIZE..=BUFFER_CAPACITY).contains(&rx) {
            return Err(ConfigError::RxBufferSize(self.rx_buffer_size));
        }

        // The TX buffer must at least hold an error frame.
        let tx = self.tx_buffer_size as usize;
        if !(ERROR_FRAME_SIZE..=BUFFER_CAPACITY).contains(&tx) {
            return Err(ConfigError::TxBufferSize(self.tx_buffer_size));
        }

        Ok(())
    }

    /// Largest frame the server sends. A frame never exceeds 255 bytes,
    /// even with a full 256-byte TX buffer.
    pub fn max_tx_frame(&self) -> usize {
        (self.tx_buffer_size as usize).min(MAX_FRAME_SIZE)
    }

    /// Payload bytes per definition stream chunk.
    pub fn definition_chunk_size(&self) -> usize {
        self.max_tx_frame().saturating_sub(DEFINITION_CHUNK_OVERHEAD)
    }

    /// Serialise into `buf` (postcard), returning the used prefix.
    pub fn to_slice<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Encode)
    }

    /// Restore a persisted configuration and validate it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)?;
        config.validate()?;
        Ok(config)
    }
}
