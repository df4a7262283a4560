//! Packing host channel planes into one interleaved buffer.
//!
//! Hosts hand the document over as a list of per-channel planes at the
//! document's native depth. [`assemble_channels`] walks that list (with a
//! hard cap, the list is host-controlled), has each channel write itself
//! into a strided window over the packed buffer, and reduces to the
//! 8-bit, 4-channel B,G,R,A layout the codec adapter consumes.

use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::geometry::Rect;
use crate::pixels::{BitDepth, ChannelOrder, PixelBuffer};

/// Most channel descriptors walked per document.
pub const MAX_CHANNEL_NODES: usize = 16;

/// What a host channel plane contributes to the packed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Red,
    Green,
    Blue,
    /// Document transparency.
    Transparency,
    /// A layer mask standing in for transparency.
    LayerMask,
}

impl ChannelRole {
    /// Byte index of this role within a packed B,G,R,A pixel.
    pub fn packed_offset(self) -> u32 {
        match self {
            Self::Blue => 0,
            Self::Green => 1,
            Self::Red => 2,
            Self::Transparency | Self::LayerMask => 3,
        }
    }
}

/// A mutable, strided view over one channel of a packed buffer.
///
/// The window addresses samples by `(x, y)`; the stride arithmetic stays
/// here so channel sources never see the packed layout.
pub struct ChannelWindow<'a> {
    data: &'a mut [u8],
    base: usize,
    col_bytes: usize,
    row_bytes: usize,
    sample_bytes: usize,
    width: u32,
    height: u32,
}

impl ChannelWindow<'_> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per sample, as dictated by the destination depth.
    pub fn sample_bytes(&self) -> usize {
        self.sample_bytes
    }

    /// Writes one native-endian sample at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the window or `sample` is not
    /// exactly [`sample_bytes`](Self::sample_bytes) long.
    pub fn put_sample(&mut self, x: u32, y: u32, sample: &[u8]) {
        assert!(x < self.width && y < self.height);
        assert_eq!(sample.len(), self.sample_bytes);
        let at = self.base + y as usize * self.row_bytes + x as usize * self.col_bytes;
        self.data[at..at + self.sample_bytes].copy_from_slice(sample);
    }

    /// Writes a full row of contiguous samples starting at `(0, y)`.
    pub fn put_row(&mut self, y: u32, samples: &[u8]) {
        assert!(y < self.height);
        assert_eq!(samples.len(), self.width as usize * self.sample_bytes);
        for x in 0..self.width {
            let from = x as usize * self.sample_bytes;
            let at = self.base + y as usize * self.row_bytes + x as usize * self.col_bytes;
            self.data[at..at + self.sample_bytes]
                .copy_from_slice(&samples[from..from + self.sample_bytes]);
        }
    }
}

/// A host channel plane that can deliver its samples for a rectangle.
pub trait ChannelSource {
    /// What this plane contributes.
    fn role(&self) -> ChannelRole;

    /// Delivers samples for `rect` into `window` and reports the
    /// rectangle actually covered. Covering less than `rect` aborts the
    /// assembly.
    fn read_rect(&mut self, rect: Rect, window: &mut ChannelWindow<'_>) -> Result<Rect>;
}

/// Packs channel planes into an 8-bit, 4-channel, B,G,R,A-ordered buffer
/// covering `(width, height)` at the document depth `depth`.
///
/// Red, green and blue must each be present, joined by at most one alpha
/// plane (transparency or a layer mask). A plane repeating a role
/// overwrites the earlier one, and descriptors past
/// [`MAX_CHANNEL_NODES`] are ignored outright. A missing alpha plane is
/// synthesized as fully opaque. Documents deeper than 8 bits are staged
/// at native depth and reduced afterwards.
pub fn assemble_channels(
    sources: &mut [&mut dyn ChannelSource],
    width: u32,
    height: u32,
    depth: BitDepth,
) -> Result<PixelBuffer> {
    if width == 0 || height == 0 {
        return Err(AdapterError::InvalidGeometry(format!(
            "assembly canvas {width}x{height}"
        )));
    }

    // Duplicated roles collapse to presence; only completeness matters.
    let (mut red, mut green, mut blue) = (false, false, false);
    let (mut transparency, mut mask) = (false, false);
    for source in sources.iter().take(MAX_CHANNEL_NODES) {
        match source.role() {
            ChannelRole::Red => red = true,
            ChannelRole::Green => green = true,
            ChannelRole::Blue => blue = true,
            ChannelRole::Transparency => transparency = true,
            ChannelRole::LayerMask => mask = true,
        }
    }
    if !(red && green && blue) || (transparency && mask) {
        return Err(AdapterError::UnsupportedChannels(format!(
            "red {red}, green {green}, blue {blue}, transparency {transparency}, mask {mask}"
        )));
    }
    let num_channels = 3 + (transparency || mask) as u32;
    debug!(width, height, num_channels, ?depth, "assembling channels");

    let rect = Rect::from_size(width as i32, height as i32);
    let mut staged = PixelBuffer::new();

    if depth == BitDepth::Eight {
        // Pack straight into the final 4-channel layout.
        staged.allocate(width, height, 4, BitDepth::Eight)?;
        staged.set_order(ChannelOrder::Bgra);
        read_all(sources, rect, &mut staged)?;
        if num_channels < 4 {
            staged.fill_channel(3, 255)?;
        }
        return Ok(staged);
    }

    // Deep documents stage at native depth with the true channel count,
    // then reduce; alpha synthesis happens during the reduction.
    staged.allocate(width, height, num_channels, depth)?;
    staged.set_order(ChannelOrder::Bgra);
    read_all(sources, rect, &mut staged)?;

    let mut reduced = PixelBuffer::new();
    staged.to_8bit_into(&mut reduced, num_channels < 4)?;
    Ok(reduced)
}

fn read_all(
    sources: &mut [&mut dyn ChannelSource],
    rect: Rect,
    dst: &mut PixelBuffer,
) -> Result<()> {
    let col_bytes = dst.col_bytes();
    let row_bytes = dst.row_bytes();
    let sample_bytes = dst.depth().bytes();
    let width = dst.width();
    let height = dst.height();
    for source in sources.iter_mut().take(MAX_CHANNEL_NODES) {
        let base = source.role().packed_offset() as usize * sample_bytes;
        let mut window = ChannelWindow {
            data: dst.as_bytes_mut(),
            base,
            col_bytes,
            row_bytes,
            sample_bytes,
            width,
            height,
        };
        let covered = source.read_rect(rect, &mut window)?;
        if covered != rect {
            return Err(AdapterError::ShortChannelRead {
                got: covered.height(),
                requested: rect.height(),
            });
        }
    }
    Ok(())
}
