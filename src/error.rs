//! Unified error types for the lrpc core.
//!
//! A single `Error` enum that every local subsystem converts into. All
//! variants are `Copy` so they can be passed around without allocation.
//!
//! Addressing errors raised by a peer (unknown service, unknown function)
//! are deliberately NOT part of this type: they never reach the local
//! caller and are reported on the wire by the meta-service instead.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every locally fallible operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A service could not be placed in the registry.
    Registry(RegistryError),
    /// A byte sequence is not a well-formed frame.
    Frame(FrameError),
    /// Configuration is invalid or could not be (de)serialised.
    Config(ConfigError),
    /// The embedded service definition could not be reassembled.
    Definition(DefinitionError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Definition(e) => write!(f, "definition: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// The service ID does not fit the registry table.
    OutOfRange { id: u8, slots: usize },
    /// The service ID is reserved for the meta-service.
    Reserved(u8),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { id, slots } => {
                write!(f, "service id {id} exceeds registry of {slots} slots")
            }
            Self::Reserved(id) => write!(f, "service id {id:#04x} is reserved"),
        }
    }
}

impl From<RegistryError> for Error {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer bytes than the three-byte header.
    TooShort { len: usize },
    /// The length prefix disagrees with the number of bytes.
    SizeMismatch { declared: usize, actual: usize },
    /// The frame does not have the expected service/function address.
    UnexpectedAddress { service: u8, function: u8 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => write!(f, "{len} bytes is shorter than a frame header"),
            Self::SizeMismatch { declared, actual } => {
                write!(f, "declared size {declared} but got {actual} bytes")
            }
            Self::UnexpectedAddress { service, function } => {
                write!(f, "unexpected frame for service {service} function {function}")
            }
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// RX buffer size outside the accepted range.
    RxBufferSize(u16),
    /// TX buffer size outside the accepted range.
    TxBufferSize(u16),
    /// Persisted configuration could not be encoded.
    Encode,
    /// Persisted configuration could not be decoded.
    Decode,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RxBufferSize(n) => write!(f, "invalid RX buffer size {n}"),
            Self::TxBufferSize(n) => write!(f, "invalid TX buffer size {n}"),
            Self::Encode => write!(f, "encode failed"),
            Self::Decode => write!(f, "decode failed"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Definition errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionError {
    /// The compressed blob is not valid DEFLATE data.
    Inflate,
    /// The inflated definition does not match the advertised hash.
    HashMismatch,
    /// More chunk data arrived than a definition may hold.
    TooLarge { len: usize },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inflate => write!(f, "inflate failed"),
            Self::HashMismatch => write!(f, "hash mismatch"),
            Self::TooLarge { len } => write!(f, "definition of {len} bytes is too large"),
        }
    }
}

impl From<DefinitionError> for Error {
    fn from(e: DefinitionError) -> Self {
        Self::Definition(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
