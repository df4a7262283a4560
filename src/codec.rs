//! The bridge between staged pixels and the WebP codec.
//!
//! Everything that touches encoded bytes funnels through here: still and
//! animated encode/decode, metadata mux/demux, and the container header
//! check. The rest of the crate only ever sees [`PixelBuffer`]s,
//! [`FrameSequence`]s and [`MetadataSet`]s.

use tracing::debug;
use zenwebp::decoder::{LoopCount, decode_rgba_into};
use zenwebp::mux::{AnimationConfig, AnimationDecoder, AnimationEncoder, WebPDemuxer, WebPMux};
use zenwebp::{EncodeRequest, PixelLayout, WebPDecoder};

use crate::config::WriteConfig;
use crate::error::{AdapterError, Result};
use crate::frames::FrameSequence;
use crate::metadata::{MetadataKind, MetadataSet};
use crate::pixels::{BitDepth, ChannelOrder, PixelBuffer};

/// Most animation frames the adapter will decode from one file.
pub const MAX_FRAMES: usize = 4096;

/// Size of the RIFF container header: `"RIFF"`, a little-endian payload
/// size, `"WEBP"`.
pub const HEADER_BYTES: usize = 12;

fn layout_for(image: &PixelBuffer) -> Result<PixelLayout> {
    if image.depth() != BitDepth::Eight || image.num_channels() != 4 || image.is_empty() {
        return Err(AdapterError::UnsupportedLayout(format!(
            "encoder needs packed 8-bit RGBA or BGRA, found {} channels at {:?}",
            image.num_channels(),
            image.depth()
        )));
    }
    Ok(match image.order() {
        ChannelOrder::Bgra => PixelLayout::Bgra8,
        ChannelOrder::Rgba => PixelLayout::Rgba8,
    })
}

/// Validates the RIFF/WEBP container header and returns the total file
/// size it declares (payload size plus the 8 header bytes outside it).
pub fn sniff_header(bytes: &[u8]) -> Result<u64> {
    if bytes.len() < HEADER_BYTES || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        return Err(AdapterError::InvalidFormat(
            "missing RIFF/WEBP container header".into(),
        ));
    }
    let payload = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    Ok(payload as u64 + 8)
}

/// Encodes one packed 8-bit image with the given settings.
pub fn encode_one_image(image: &PixelBuffer, config: &WriteConfig) -> Result<Vec<u8>> {
    let layout = layout_for(image)?;
    let (width, height) = (image.width(), image.height());
    let blob = if config.is_lossless() {
        let lossless = config.to_lossless_config();
        EncodeRequest::lossless(&lossless, image.as_bytes(), layout, width, height).encode()?
    } else {
        let lossy = config.to_lossy_config();
        EncodeRequest::lossy(&lossy, image.as_bytes(), layout, width, height).encode()?
    };
    debug!(
        width = image.width(),
        height = image.height(),
        bytes = blob.len(),
        lossless = config.is_lossless(),
        "encoded still image"
    );
    Ok(blob)
}

/// Encodes a frame sequence as an animation.
///
/// The first frame fixes the canvas size and every frame must match it.
/// Frames are fed to the codec at their running start timestamps; the
/// last frame's duration is carried by the final flush. `loop_forever`
/// selects an infinite loop, otherwise the animation plays once.
pub fn encode_all_frames(frames: &FrameSequence, config: &WriteConfig) -> Result<Vec<u8>> {
    let first = frames.get(0).ok_or(AdapterError::InvalidState {
        expected: "at least one captured frame",
        found: "empty sequence",
    })?;
    let width = first.image.width();
    let height = first.image.height();

    let loop_count = if config.loop_forever {
        LoopCount::Forever
    } else {
        // Play once.
        LoopCount::Times(core::num::NonZeroU16::MIN)
    };
    let mut encoder = AnimationEncoder::new(
        width,
        height,
        AnimationConfig {
            background_color: [0, 0, 0, 0],
            loop_count,
            minimize_size: false,
        },
    )?;
    let encoder_config = config.to_encoder_config();

    let mut timestamp_ms: u32 = 0;
    let mut last_duration_ms: u32 = 0;
    for (index, frame) in frames.iter().enumerate() {
        let layout = layout_for(&frame.image)?;
        if frame.image.width() != width || frame.image.height() != height {
            return Err(AdapterError::UnsupportedLayout(format!(
                "frame {index} is {}x{}, canvas is {width}x{height}",
                frame.image.width(),
                frame.image.height()
            )));
        }
        encoder.add_frame(frame.image.as_bytes(), layout, timestamp_ms, &encoder_config)?;
        last_duration_ms = frame.duration_ms.max(0) as u32;
        timestamp_ms = timestamp_ms
            .checked_add(last_duration_ms)
            .ok_or(AdapterError::TimelineOverflow { frame: index })?;
    }
    let blob = encoder.finalize(last_duration_ms)?;
    debug!(
        frames = frames.len(),
        total_ms = timestamp_ms,
        bytes = blob.len(),
        "encoded animation"
    );
    Ok(blob)
}

/// Decodes a still image into `image` as packed 8-bit RGBA.
///
/// The destination is (re)allocated to exactly the decoded size; a
/// buffer already holding that shape is reused as-is.
pub fn decode_one_image(blob: &[u8], image: &mut PixelBuffer) -> Result<()> {
    let decoder = WebPDecoder::new(blob)?;
    let (width, height) = decoder.dimensions();
    image.allocate(width, height, 4, BitDepth::Eight)?;
    image.set_order(ChannelOrder::Rgba);
    decode_rgba_into(blob, image.as_bytes_mut(), width)?;
    debug!(width, height, "decoded still image");
    Ok(())
}

/// Decodes an animation into `frames`, one RGBA buffer per frame.
///
/// Frame durations come from consecutive timestamps as reported by the
/// codec. Files claiming more than [`MAX_FRAMES`] frames are rejected as
/// malformed rather than decoded.
pub fn decode_all_frames(blob: &[u8], frames: &mut FrameSequence) -> Result<()> {
    let mut decoder = AnimationDecoder::new(blob)?;
    let info = decoder.info();
    let count = info.frame_count as usize;
    if count > MAX_FRAMES {
        frames.clear();
        return Err(AdapterError::TooManyFrames {
            count,
            limit: MAX_FRAMES,
        });
    }

    frames.resize(count);
    let mut read = 0usize;
    while let Some(decoded) = decoder.next_frame()? {
        if read >= count {
            break;
        }
        let frame = &mut frames[read];
        frame
            .image
            .allocate(decoded.width, decoded.height, 4, BitDepth::Eight)?;
        frame.image.set_order(ChannelOrder::Rgba);
        frame.image.as_bytes_mut().copy_from_slice(&decoded.data);
        frame.duration_ms = decoded.duration_ms as i32;
        read += 1;
    }
    // A short container is not an error; keep only what decoded.
    frames.resize(read);
    debug!(frames = read, "decoded animation");
    Ok(())
}

/// Attaches the kept metadata chunks to an encoded blob.
///
/// The mux is only constructed when at least one chunk will actually be
/// attached, and `blob` is replaced only after the container assembles
/// successfully; on failure the original bytes survive untouched.
pub fn encode_metadata(
    config: &WriteConfig,
    metadata: &MetadataSet,
    blob: &mut Vec<u8>,
) -> Result<()> {
    let wanted: Vec<MetadataKind> = MetadataKind::ALL
        .into_iter()
        .filter(|&kind| keeps(config, kind) && metadata.has(kind))
        .collect();
    if wanted.is_empty() {
        return Ok(());
    }

    let mut mux = WebPMux::from_data(blob)?;
    for kind in wanted {
        let payload = metadata.get(kind).to_vec();
        debug!(?kind, bytes = payload.len(), "attaching metadata chunk");
        match kind {
            MetadataKind::Exif => mux.set_exif(payload),
            MetadataKind::Xmp => mux.set_xmp(payload),
            MetadataKind::IccProfile => mux.set_icc_profile(payload),
        }
    }
    *blob = mux.assemble()?;
    Ok(())
}

/// Extracts all metadata chunks from an encoded blob.
///
/// Absent chunks leave their slot empty; a duplicated chunk resolves to
/// the last occurrence in the container.
pub fn decode_metadata(blob: &[u8]) -> Result<MetadataSet> {
    let demuxer = WebPDemuxer::new(blob)?;
    let mut set = MetadataSet::new();
    if let Some(exif) = demuxer.exif() {
        set.set(MetadataKind::Exif, exif.to_vec());
    }
    if let Some(xmp) = demuxer.xmp() {
        set.set(MetadataKind::Xmp, xmp.to_vec());
    }
    if let Some(icc) = demuxer.icc_profile() {
        set.set(MetadataKind::IccProfile, icc.to_vec());
    }
    Ok(set)
}

fn keeps(config: &WriteConfig, kind: MetadataKind) -> bool {
    match kind {
        MetadataKind::Exif => config.keep_exif,
        MetadataKind::Xmp => config.keep_xmp,
        MetadataKind::IccProfile => config.keep_color_profile,
    }
}
