//! Host-editor adapter core for WebP.
//!
//! This crate is the portable middle of an image-editor WebP plugin: it
//! stages host pixels, frames and metadata, maps user-facing settings
//! onto codec parameters, and drives the [`zenwebp`] codec for stills,
//! animations and metadata chunks. The host-specific glue (selector
//! dispatch, dialogs, file handles) stays outside; everything here works
//! on plain buffers and `std::io::Write` sinks.
//!
//! # Writing
//!
//! ```rust
//! use zenwebp_host::{PixelBuffer, BitDepth, ChannelOrder, Frame, FrameSequence,
//!                    WriteConfig, WriteSession};
//!
//! let mut image = PixelBuffer::new();
//! image.allocate(2, 2, 4, BitDepth::Eight)?;
//! image.set_order(ChannelOrder::Rgba);
//!
//! let mut frames = FrameSequence::new();
//! frames.push(Frame::new(image, 0));
//!
//! let mut session = WriteSession::new(WriteConfig::default());
//! session.set_frames(frames);
//! session.encode()?;
//! session.mux_metadata()?;
//! let mut file: Vec<u8> = Vec::new();
//! session.finish(&mut file)?;
//! # Ok::<(), zenwebp_host::AdapterError>(())
//! ```
//!
//! # Reading
//!
//! ```rust,no_run
//! use zenwebp_host::{PixelBuffer, ReadSession};
//!
//! # let bytes: Vec<u8> = vec![];
//! let session = ReadSession::open(bytes)?;
//! let mut image = PixelBuffer::new();
//! session.decode_image(&mut image)?;
//! let metadata = session.metadata()?;
//! # Ok::<(), zenwebp_host::AdapterError>(())
//! ```

pub mod channels;
pub mod codec;
pub mod config;
pub mod error;
pub mod frames;
pub mod geometry;
pub mod metadata;
pub mod pixels;
pub mod session;
pub mod timing;

pub use channels::{
    assemble_channels, ChannelRole, ChannelSource, ChannelWindow, MAX_CHANNEL_NODES,
};
pub use codec::{
    decode_all_frames, decode_metadata, decode_one_image, encode_all_frames, encode_metadata,
    encode_one_image, sniff_header, MAX_FRAMES,
};
pub use config::{Compression, ParamValue, WriteConfig, LOSSLESS_THRESHOLD};
pub use error::{AdapterError, ErrorKind, Result};
pub use frames::{Frame, FrameSequence, DURATION_UNSET};
pub use geometry::{crop_to_fit, map_rect, scale_to_fit, Rect};
pub use metadata::{MetadataKind, MetadataSet};
pub use pixels::{BitDepth, ChannelOrder, PixelBuffer};
pub use session::{DialogOutcome, OptionsDialog, ReadSession, WriteSession, WriteState};
pub use timing::{format_duration, is_animation, try_extract_duration, MAX_DURATION_MS};
