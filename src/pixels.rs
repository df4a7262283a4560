//! Interleaved pixel staging buffers.
//!
//! [`PixelBuffer`] is the single in-memory image representation the crate
//! moves pixels through: host channels are packed into one, previews are
//! scaled/cropped from one, and the codec reads and writes one. Buffers at
//! 16 or 32 bits per sample exist only as staging for [`PixelBuffer::to_8bit_into`];
//! everything handed to the codec is 8-bit, 4-channel.

use tracing::debug;

use crate::error::{AdapterError, Result};

/// Bits per sample of a staging buffer.
///
/// Sixteen-bit samples use the host range `[0, 32768]` (not the full u16
/// range); thirty-two-bit samples are `f32` in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Eight,
    Sixteen,
    ThirtyTwo,
}

impl BitDepth {
    /// Bytes occupied by one sample.
    pub fn bytes(self) -> usize {
        match self {
            Self::Eight => 1,
            Self::Sixteen => 2,
            Self::ThirtyTwo => 4,
        }
    }
}

/// Channel interleave carried by a buffer.
///
/// Host channel packing produces `Bgra` (blue in byte 0); decoded images
/// are `Rgba`. The codec adapter maps this onto the codec's pixel layout,
/// so both orders encode correctly without a swizzle pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Bgra,
    Rgba,
}

/// An owned, contiguous, interleaved image buffer.
#[derive(Debug, Default, Clone)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    num_channels: u32,
    depth: BitDepth,
    order: ChannelOrder,
}

impl Default for BitDepth {
    fn default() -> Self {
        Self::Eight
    }
}

impl Default for ChannelOrder {
    fn default() -> Self {
        Self::Bgra
    }
}

impl PixelBuffer {
    /// An empty buffer with no storage.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn num_channels(&self) -> u32 {
        self.num_channels
    }

    pub fn depth(&self) -> BitDepth {
        self.depth
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ChannelOrder) {
        self.order = order;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes from one sample to the next within a pixel.
    pub fn col_bytes(&self) -> usize {
        self.num_channels as usize * self.depth.bytes()
    }

    /// Bytes from one row to the next.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.col_bytes()
    }

    /// Byte offset of sample `(x, y, channel)`.
    pub fn sample_offset(&self, x: u32, y: u32, channel: u32) -> usize {
        y as usize * self.row_bytes()
            + x as usize * self.col_bytes()
            + channel as usize * self.depth.bytes()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consumes the buffer, returning the backing bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Ensures the buffer holds exactly `width * height * num_channels`
    /// samples at `depth`.
    ///
    /// Reallocation only happens when the shape differs from the current
    /// one; repeated calls with the same shape are free. Allocation
    /// failure is reported as [`AdapterError::OutOfMemory`], never an
    /// abort.
    pub fn allocate(
        &mut self,
        width: u32,
        height: u32,
        num_channels: u32,
        depth: BitDepth,
    ) -> Result<()> {
        let same_shape = !self.data.is_empty()
            && self.width == width
            && self.height == height
            && self.num_channels == num_channels
            && self.depth == depth;
        if same_shape {
            return Ok(());
        }
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(num_channels as usize))
            .and_then(|n| n.checked_mul(depth.bytes()))
            .ok_or(AdapterError::OutOfMemory { bytes: usize::MAX })?;

        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| AdapterError::OutOfMemory { bytes })?;
        data.resize(bytes, 0);

        debug!(width, height, num_channels, bytes, "allocated pixel buffer");
        self.data = data;
        self.width = width;
        self.height = height;
        self.num_channels = num_channels;
        self.depth = depth;
        Ok(())
    }

    /// Releases the backing storage. Safe on an already-empty buffer.
    pub fn deallocate(&mut self) {
        self.data = Vec::new();
        self.width = 0;
        self.height = 0;
        self.num_channels = 0;
    }

    /// Nearest-neighbour scale into `dst` at `(width, height)`.
    ///
    /// Channel count, depth and order carry over. The source pixel for
    /// destination coordinate `d` along an axis is `d * src_extent /
    /// dst_extent` (integer truncation).
    pub fn scale_into(&self, dst: &mut PixelBuffer, width: u32, height: u32) -> Result<()> {
        if self.is_empty() || self.width == 0 || self.height == 0 {
            return Err(AdapterError::InvalidGeometry("scale of empty buffer".into()));
        }
        if width == 0 || height == 0 {
            return Err(AdapterError::InvalidGeometry(format!(
                "scale target {width}x{height}"
            )));
        }
        dst.allocate(width, height, self.num_channels, self.depth)?;
        dst.order = self.order;

        let pixel_bytes = self.col_bytes();
        let src_row = self.row_bytes();
        let dst_row = dst.row_bytes();
        for y in 0..height as usize {
            let sy = y * self.height as usize / height as usize;
            let src_base = sy * src_row;
            let dst_base = y * dst_row;
            for x in 0..width as usize {
                let sx = x * self.width as usize / width as usize;
                let s = src_base + sx * pixel_bytes;
                let d = dst_base + x * pixel_bytes;
                dst.data[d..d + pixel_bytes].copy_from_slice(&self.data[s..s + pixel_bytes]);
            }
        }
        Ok(())
    }

    /// Copies the `(width, height)` rectangle at `(left, top)` into `dst`.
    pub fn crop_into(
        &self,
        dst: &mut PixelBuffer,
        width: u32,
        height: u32,
        left: u32,
        top: u32,
    ) -> Result<()> {
        if self.is_empty() {
            return Err(AdapterError::InvalidGeometry("crop of empty buffer".into()));
        }
        if width == 0
            || height == 0
            || left.checked_add(width).is_none_or(|r| r > self.width)
            || top.checked_add(height).is_none_or(|b| b > self.height)
        {
            return Err(AdapterError::InvalidGeometry(format!(
                "crop {width}x{height}+{left}+{top} exceeds {}x{}",
                self.width, self.height
            )));
        }
        dst.allocate(width, height, self.num_channels, self.depth)?;
        dst.order = self.order;

        let pixel_bytes = self.col_bytes();
        let copy_bytes = width as usize * pixel_bytes;
        let src_row = self.row_bytes();
        let dst_row = dst.row_bytes();
        for y in 0..height as usize {
            let s = (top as usize + y) * src_row + left as usize * pixel_bytes;
            let d = y * dst_row;
            dst.data[d..d + copy_bytes].copy_from_slice(&self.data[s..s + copy_bytes]);
        }
        Ok(())
    }

    /// Reduces this buffer to 8 bits per sample in `dst`.
    ///
    /// 16-bit samples (host range `[0, 32768]`) map as `value >> 7`
    /// clamped to 255; 32-bit samples are `f32` in `[0.0, 1.0]` scaled by
    /// 255 and rounded to nearest. With `add_alpha` the source must have
    /// exactly 3 channels and the output gains an opaque fourth channel.
    pub fn to_8bit_into(&self, dst: &mut PixelBuffer, add_alpha: bool) -> Result<()> {
        if self.is_empty() {
            return Err(AdapterError::UnsupportedLayout(
                "depth reduction of empty buffer".into(),
            ));
        }
        if add_alpha && self.num_channels != 3 {
            return Err(AdapterError::UnsupportedLayout(format!(
                "alpha synthesis needs 3 channels, found {}",
                self.num_channels
            )));
        }
        let dst_channels = if add_alpha { 4 } else { self.num_channels };
        dst.allocate(self.width, self.height, dst_channels, BitDepth::Eight)?;
        dst.order = self.order;

        let pixels = self.width as usize * self.height as usize;
        let src_c = self.num_channels as usize;
        let dst_c = dst_channels as usize;
        for p in 0..pixels {
            for c in 0..src_c {
                let v = match self.depth {
                    BitDepth::Eight => self.data[p * src_c + c],
                    BitDepth::Sixteen => {
                        let at = (p * src_c + c) * 2;
                        let raw = u16::from_ne_bytes([self.data[at], self.data[at + 1]]);
                        (raw >> 7).min(255) as u8
                    }
                    BitDepth::ThirtyTwo => {
                        let at = (p * src_c + c) * 4;
                        let raw = f32::from_ne_bytes([
                            self.data[at],
                            self.data[at + 1],
                            self.data[at + 2],
                            self.data[at + 3],
                        ]);
                        (raw * 255.0).round().clamp(0.0, 255.0) as u8
                    }
                };
                dst.data[p * dst_c + c] = v;
            }
            if add_alpha {
                dst.data[p * dst_c + 3] = 255;
            }
        }
        Ok(())
    }

    /// Fills channel `channel` of every pixel with `value`. 8-bit only.
    pub fn fill_channel(&mut self, channel: u32, value: u8) -> Result<()> {
        if self.depth != BitDepth::Eight || channel >= self.num_channels {
            return Err(AdapterError::UnsupportedLayout(format!(
                "channel fill at index {channel}"
            )));
        }
        let c = self.num_channels as usize;
        let start = channel as usize;
        for s in self.data[start..].iter_mut().step_by(c) {
            *s = value;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, channels: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new();
        buf.allocate(width, height, channels, BitDepth::Eight).unwrap();
        for y in 0..height {
            for x in 0..width {
                for c in 0..channels {
                    let off = buf.sample_offset(x, y, c);
                    buf.as_bytes_mut()[off] = (x * 7 + y * 31 + c * 101) as u8;
                }
            }
        }
        buf
    }

    #[test]
    fn allocate_is_lazy_for_same_shape() {
        let mut buf = PixelBuffer::new();
        buf.allocate(4, 4, 4, BitDepth::Eight).unwrap();
        buf.as_bytes_mut()[0] = 42;
        buf.allocate(4, 4, 4, BitDepth::Eight).unwrap();
        assert_eq!(buf.as_bytes()[0], 42, "same-shape allocate must not clear");
        buf.allocate(4, 4, 4, BitDepth::Sixteen).unwrap();
        assert_eq!(buf.as_bytes().len(), 4 * 4 * 4 * 2);
        assert_eq!(buf.as_bytes()[0], 0, "shape change reallocates");
    }

    #[test]
    fn deallocate_is_idempotent() {
        let mut buf = gradient(2, 2, 4);
        buf.deallocate();
        assert!(buf.is_empty());
        buf.deallocate();
        assert_eq!(buf.width(), 0);
    }

    #[test]
    fn scale_uses_nearest_neighbour_truncation() {
        let src = gradient(4, 4, 1);
        let mut dst = PixelBuffer::new();
        src.scale_into(&mut dst, 2, 2).unwrap();
        // dst(x, y) samples src(x * 4 / 2, y * 4 / 2).
        for y in 0..2u32 {
            for x in 0..2u32 {
                let d = dst.as_bytes()[dst.sample_offset(x, y, 0)];
                let s = src.as_bytes()[src.sample_offset(x * 2, y * 2, 0)];
                assert_eq!(d, s);
            }
        }
    }

    #[test]
    fn scale_up_repeats_pixels() {
        let src = gradient(2, 1, 1);
        let mut dst = PixelBuffer::new();
        src.scale_into(&mut dst, 4, 1).unwrap();
        let b = dst.as_bytes();
        assert_eq!(b[0], b[1]);
        assert_eq!(b[2], b[3]);
        assert_ne!(b[0], b[2]);
    }

    #[test]
    fn scale_of_empty_buffer_fails() {
        let src = PixelBuffer::new();
        let mut dst = PixelBuffer::new();
        assert!(src.scale_into(&mut dst, 2, 2).is_err());
    }

    #[test]
    fn crop_extracts_the_rectangle() {
        let src = gradient(6, 6, 3);
        let mut dst = PixelBuffer::new();
        src.crop_into(&mut dst, 2, 3, 1, 2).unwrap();
        for y in 0..3u32 {
            for x in 0..2u32 {
                for c in 0..3u32 {
                    let d = dst.as_bytes()[dst.sample_offset(x, y, c)];
                    let s = src.as_bytes()[src.sample_offset(x + 1, y + 2, c)];
                    assert_eq!(d, s);
                }
            }
        }
    }

    #[test]
    fn crop_out_of_bounds_fails() {
        let src = gradient(4, 4, 1);
        let mut dst = PixelBuffer::new();
        assert!(src.crop_into(&mut dst, 4, 1, 1, 0).is_err());
        assert!(src.crop_into(&mut dst, 1, 4, 0, 1).is_err());
    }

    #[test]
    fn sixteen_bit_reduction_shifts_and_clamps() {
        let mut src = PixelBuffer::new();
        src.allocate(2, 1, 1, BitDepth::Sixteen).unwrap();
        // 32768 is the host white point; >>7 gives 256, clamped to 255.
        src.as_bytes_mut()[0..2].copy_from_slice(&32768u16.to_ne_bytes());
        src.as_bytes_mut()[2..4].copy_from_slice(&16384u16.to_ne_bytes());
        let mut dst = PixelBuffer::new();
        src.to_8bit_into(&mut dst, false).unwrap();
        assert_eq!(dst.as_bytes(), &[255, 128]);
    }

    #[test]
    fn float_reduction_rounds_and_clamps() {
        let mut src = PixelBuffer::new();
        src.allocate(3, 1, 1, BitDepth::ThirtyTwo).unwrap();
        src.as_bytes_mut()[0..4].copy_from_slice(&1.0f32.to_ne_bytes());
        src.as_bytes_mut()[4..8].copy_from_slice(&0.5f32.to_ne_bytes());
        src.as_bytes_mut()[8..12].copy_from_slice(&2.0f32.to_ne_bytes());
        let mut dst = PixelBuffer::new();
        src.to_8bit_into(&mut dst, false).unwrap();
        assert_eq!(dst.as_bytes(), &[255, 128, 255]);
    }

    #[test]
    fn alpha_synthesis_appends_opaque_channel() {
        let src = gradient(2, 2, 3);
        let mut dst = PixelBuffer::new();
        src.to_8bit_into(&mut dst, true).unwrap();
        assert_eq!(dst.num_channels(), 4);
        for y in 0..2u32 {
            for x in 0..2u32 {
                assert_eq!(dst.as_bytes()[dst.sample_offset(x, y, 3)], 255);
            }
        }
    }

    #[test]
    fn alpha_synthesis_requires_three_channels() {
        let src = gradient(2, 2, 4);
        let mut dst = PixelBuffer::new();
        assert!(src.to_8bit_into(&mut dst, true).is_err());
    }

    #[test]
    fn fill_channel_touches_only_that_channel() {
        let mut buf = gradient(3, 2, 4);
        let before = buf.clone();
        buf.fill_channel(3, 255).unwrap();
        for y in 0..2u32 {
            for x in 0..3u32 {
                for c in 0..3u32 {
                    assert_eq!(
                        buf.as_bytes()[buf.sample_offset(x, y, c)],
                        before.as_bytes()[before.sample_offset(x, y, c)]
                    );
                }
                assert_eq!(buf.as_bytes()[buf.sample_offset(x, y, 3)], 255);
            }
        }
    }
}
