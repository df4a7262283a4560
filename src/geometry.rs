//! Rectangle arithmetic for preview scaling and cropping.
//!
//! All planning functions are pure: they compute target sizes without
//! touching pixel data. [`crate::pixels::PixelBuffer`] applies the results.

/// An axis-aligned rectangle with exclusive right/bottom edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub left: i32,
    /// Top edge (inclusive).
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Rect {
    /// A rectangle anchored at the origin with the given size.
    pub fn from_size(width: i32, height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }
}

/// Plans a downscale of `(width, height)` so both extents fit in
/// `(max_width, max_height)`, preserving aspect ratio with integer
/// arithmetic.
///
/// Returns `None` when the size already fits (the caller keeps the
/// original). Scaled extents are clamped to at least 1 pixel.
pub fn scale_to_fit(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> Option<(u32, u32)> {
    if width <= max_width && height <= max_height {
        return None;
    }
    let mut w = width;
    let mut h = height;
    if w > max_width {
        h = (h as u64 * max_width as u64 / w as u64) as u32;
        w = max_width;
    }
    if h > max_height {
        w = (w as u64 * max_height as u64 / h as u64) as u32;
        h = max_height;
    }
    Some((w.max(1), h.max(1)))
}

/// Plans a crop of `(width, height)` at offset `(left, top)` down to at
/// most `(max_width, max_height)`.
///
/// Returns `None` when the image already fits and the offset is zero, or
/// when the offset lies outside the image (nothing to crop to).
pub fn crop_to_fit(
    width: u32,
    height: u32,
    left: u32,
    top: u32,
    max_width: u32,
    max_height: u32,
) -> Option<(u32, u32)> {
    if left >= width || top >= height {
        return None;
    }
    if left == 0 && top == 0 && width <= max_width && height <= max_height {
        return None;
    }
    let w = (width - left).min(max_width);
    let h = (height - top).min(max_height);
    Some((w, h))
}

/// Remaps `rect` from the coordinate space of `src_area` into the space
/// of `dst_area`, scaling each edge by the ratio of extents with integer
/// truncation.
pub fn map_rect(rect: Rect, src_area: Rect, dst_area: Rect) -> Rect {
    let sx = |v: i32| {
        if src_area.width() == 0 {
            0
        } else {
            (v as i64 * dst_area.width() as i64 / src_area.width() as i64) as i32
        }
    };
    let sy = |v: i32| {
        if src_area.height() == 0 {
            0
        } else {
            (v as i64 * dst_area.height() as i64 / src_area.height() as i64) as i32
        }
    };
    Rect {
        left: sx(rect.left - src_area.left) + dst_area.left,
        top: sy(rect.top - src_area.top) + dst_area.top,
        right: sx(rect.right - src_area.left) + dst_area.left,
        bottom: sy(rect.bottom - src_area.top) + dst_area.top,
    }
}
