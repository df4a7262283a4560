//! Error types for the adapter.

use thiserror::Error;

use zenwebp::mux::MuxError;
use zenwebp::{DecodeError, EncodeError};

/// Broad failure category, for callers that map errors onto a host
/// result code rather than inspecting individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input bytes are not a usable WebP payload.
    Malformed,
    /// An allocation or size limit was exceeded.
    ResourceExhausted,
    /// The underlying codec rejected the operation.
    Codec,
    /// The caller violated an API precondition.
    Contract,
}

/// Errors that can occur while staging pixels, driving the codec, or
/// running a read/write session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// The data does not start with a RIFF/WEBP container header.
    #[error("Invalid WebP format: {0}")]
    InvalidFormat(String),

    /// A buffer allocation failed.
    #[error("Out of memory allocating {bytes} bytes")]
    OutOfMemory {
        /// The requested allocation size.
        bytes: usize,
    },

    /// An animation carries more frames than the adapter will browse.
    #[error("Too many frames: {count} (limit {limit})")]
    TooManyFrames {
        /// The frame count reported by the container.
        count: usize,
        /// The maximum the adapter accepts.
        limit: usize,
    },

    /// The accumulated animation timeline no longer fits a millisecond
    /// timestamp.
    #[error("Animation timeline overflows at frame {frame}")]
    TimelineOverflow {
        /// Index of the frame whose timestamp could not be computed.
        frame: usize,
    },

    /// A geometry argument does not fit the source it addresses.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The source channel list cannot be packed into an interleaved image.
    #[error("Unsupported channel set: {0}")]
    UnsupportedChannels(String),

    /// A channel read returned a different rectangle than requested.
    #[error("Channel read covered {got} of {requested} requested rows")]
    ShortChannelRead {
        /// Rows actually delivered.
        got: i32,
        /// Rows requested.
        requested: i32,
    },

    /// The buffer shape does not match what the operation requires.
    #[error("Unsupported image layout: {0}")]
    UnsupportedLayout(String),

    /// A session stage was invoked out of order.
    #[error("Invalid session state: expected {expected}, found {found}")]
    InvalidState {
        /// The state the stage requires.
        expected: &'static str,
        /// The state the session was in.
        found: &'static str,
    },

    /// Writing the finished file to the host-provided sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred during encoding.
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// An error occurred during decoding.
    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    /// An error occurred while assembling or parsing the container.
    #[error("Mux error: {0}")]
    Mux(#[from] MuxError),
}

impl From<whereat::At<EncodeError>> for AdapterError {
    fn from(err: whereat::At<EncodeError>) -> Self {
        Self::Encode(err.into_inner())
    }
}

impl From<whereat::At<DecodeError>> for AdapterError {
    fn from(err: whereat::At<DecodeError>) -> Self {
        Self::Decode(err.into_inner())
    }
}

impl From<whereat::At<MuxError>> for AdapterError {
    fn from(err: whereat::At<MuxError>) -> Self {
        Self::Mux(err.into_inner())
    }
}

impl AdapterError {
    /// The broad category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidFormat(_)
            | Self::TooManyFrames { .. }
            | Self::TimelineOverflow { .. }
            | Self::UnsupportedChannels(_)
            | Self::ShortChannelRead { .. } => ErrorKind::Malformed,
            Self::OutOfMemory { .. } | Self::Io(_) => ErrorKind::ResourceExhausted,
            Self::Encode(_) | Self::Decode(_) | Self::Mux(_) => ErrorKind::Codec,
            Self::InvalidGeometry(_) | Self::UnsupportedLayout(_) | Self::InvalidState { .. } => {
                ErrorKind::Contract
            }
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, AdapterError>;
