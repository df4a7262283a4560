//! Animation frame sequences.

use crate::pixels::PixelBuffer;

/// Duration value meaning "not yet known".
pub const DURATION_UNSET: i32 = -1;

/// One animation frame: a staged image plus its display duration.
#[derive(Debug, Default, Clone)]
pub struct Frame {
    /// The staged pixels for this frame.
    pub image: PixelBuffer,
    /// Display duration in milliseconds; [`DURATION_UNSET`] until assigned.
    pub duration_ms: i32,
}

impl Frame {
    pub fn new(image: PixelBuffer, duration_ms: i32) -> Self {
        Self { image, duration_ms }
    }
}

/// An ordered sequence of frames.
///
/// All growth and discard goes through [`resize`](Self::resize): shrinking
/// drops the tail frames, and dropping a frame releases its pixel storage.
/// There is no other way to discard frames, so a sequence can never leak a
/// buffer by truncating around the funnel.
#[derive(Debug, Default)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Grows with default (empty, duration-unset) frames or shrinks by
    /// dropping tail frames and their buffers.
    pub fn resize(&mut self, len: usize) {
        self.frames.resize_with(len, || Frame {
            image: PixelBuffer::new(),
            duration_ms: DURATION_UNSET,
        });
        if len < self.frames.capacity() / 2 {
            self.frames.shrink_to_fit();
        }
    }

    /// Drops every frame.
    pub fn clear(&mut self) {
        self.resize(0);
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Frame> {
        self.frames.get_mut(index)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, Frame> {
        self.frames.iter_mut()
    }

    /// Sum of all assigned durations; unset durations count as zero.
    pub fn total_duration_ms(&self) -> i64 {
        self.frames
            .iter()
            .map(|f| f.duration_ms.max(0) as i64)
            .sum()
    }
}

impl core::ops::Index<usize> for FrameSequence {
    type Output = Frame;

    fn index(&self, index: usize) -> &Frame {
        &self.frames[index]
    }
}

impl core::ops::IndexMut<usize> for FrameSequence {
    fn index_mut(&mut self, index: usize) -> &mut Frame {
        &mut self.frames[index]
    }
}

impl<'a> IntoIterator for &'a FrameSequence {
    type Item = &'a Frame;
    type IntoIter = core::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::BitDepth;

    #[test]
    fn resize_grows_with_unset_durations() {
        let mut seq = FrameSequence::new();
        seq.resize(3);
        assert_eq!(seq.len(), 3);
        assert!(seq[0].image.is_empty());
        assert_eq!(seq[2].duration_ms, DURATION_UNSET);
    }

    #[test]
    fn resize_shrinks_and_drops_buffers() {
        let mut seq = FrameSequence::new();
        seq.resize(4);
        for frame in seq.iter_mut() {
            frame.image.allocate(8, 8, 4, BitDepth::Eight).unwrap();
            frame.duration_ms = 100;
        }
        seq.resize(1);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].duration_ms, 100);
        seq.clear();
        assert!(seq.is_empty());
    }

    #[test]
    fn total_duration_ignores_unset() {
        let mut seq = FrameSequence::new();
        seq.resize(3);
        seq[0].duration_ms = 40;
        seq[1].duration_ms = DURATION_UNSET;
        seq[2].duration_ms = 60;
        assert_eq!(seq.total_duration_ms(), 100);
    }
}
