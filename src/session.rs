//! Read and write sessions.
//!
//! A session owns every piece of state a host round-trip touches, so the
//! host glue holds a single value instead of a bag of globals. The write
//! side is a strict state machine: pixels are captured, encoded, metadata
//! is attached, and the blob is written out, in that order, with any
//! failure resetting the session so the next attempt starts clean.

use std::io::Write;

use tracing::{debug, warn};

use crate::codec;
use crate::config::WriteConfig;
use crate::error::{AdapterError, Result};
use crate::frames::FrameSequence;
use crate::metadata::MetadataSet;
use crate::pixels::PixelBuffer;
use crate::timing::format_duration;

/// Where a write session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteState {
    /// Nothing captured yet.
    Idle,
    /// Frames are staged; settings may still change.
    FramesCaptured,
    /// An encoded blob exists for the current settings.
    Encoded,
    /// Metadata chunks are attached to the blob.
    MetadataMuxed,
    /// The blob has been handed to the sink.
    Written,
}

impl WriteState {
    fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::FramesCaptured => "FramesCaptured",
            Self::Encoded => "Encoded",
            Self::MetadataMuxed => "MetadataMuxed",
            Self::Written => "Written",
        }
    }
}

/// What the options dialog decided.
#[derive(Debug)]
pub enum DialogOutcome {
    /// The user accepted the settings. A dialog that already encoded a
    /// full-size preview with those exact settings may hand the blob
    /// back so the session skips re-encoding it.
    Accepted {
        /// Blob encoded by the dialog's preview pipeline, if any.
        precomputed: Option<Vec<u8>>,
    },
    /// The user cancelled the write.
    Cancelled,
}

/// The settings dialog, as seen by the session.
///
/// Implementations get the mutable settings plus read access to the
/// staged frames and metadata, enough to drive live previews.
pub trait OptionsDialog {
    fn run(
        &mut self,
        config: &mut WriteConfig,
        metadata: &MetadataSet,
        frames: &FrameSequence,
    ) -> Result<DialogOutcome>;
}

/// One write round-trip: capture, settings, encode, metadata, write.
#[derive(Debug, Default)]
pub struct WriteSession {
    config: WriteConfig,
    frames: FrameSequence,
    metadata: MetadataSet,
    encoded: Vec<u8>,
    state: WriteState,
}

impl Default for WriteState {
    fn default() -> Self {
        Self::Idle
    }
}

impl WriteSession {
    pub fn new(config: WriteConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn state(&self) -> WriteState {
        self.state
    }

    pub fn config(&self) -> &WriteConfig {
        &self.config
    }

    /// Settings changes invalidate any blob already encoded.
    pub fn config_mut(&mut self) -> &mut WriteConfig {
        if self.state == WriteState::Encoded || self.state == WriteState::MetadataMuxed {
            self.encoded = Vec::new();
            self.state = WriteState::FramesCaptured;
        }
        &mut self.config
    }

    pub fn frames(&self) -> &FrameSequence {
        &self.frames
    }

    pub fn metadata(&self) -> &MetadataSet {
        &self.metadata
    }

    /// Stages the metadata chunks that may be carried into the output.
    pub fn set_metadata(&mut self, metadata: MetadataSet) {
        self.metadata = metadata;
    }

    /// Stages the captured frames, discarding any previous capture and
    /// any stale blob.
    pub fn set_frames(&mut self, frames: FrameSequence) {
        self.encoded = Vec::new();
        self.frames = frames;
        self.state = WriteState::FramesCaptured;
    }

    /// Runs the settings dialog. Returns `false` when the user
    /// cancelled, which resets the session.
    pub fn run_dialog(&mut self, dialog: &mut dyn OptionsDialog) -> Result<bool> {
        self.expect(WriteState::FramesCaptured)?;
        match dialog.run(&mut self.config, &self.metadata, &self.frames) {
            Ok(DialogOutcome::Accepted { precomputed }) => {
                if let Some(blob) = precomputed {
                    self.adopt_encoded(blob)?;
                }
                Ok(true)
            }
            Ok(DialogOutcome::Cancelled) => {
                self.reset();
                Ok(false)
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    /// Accepts a blob already encoded elsewhere (the dialog's full-size
    /// preview) in place of running [`encode`](Self::encode) again.
    pub fn adopt_encoded(&mut self, blob: Vec<u8>) -> Result<()> {
        self.expect(WriteState::FramesCaptured)?;
        debug!(bytes = blob.len(), "adopting externally encoded blob");
        self.encoded = blob;
        self.state = WriteState::Encoded;
        Ok(())
    }

    /// Encodes the staged frames with the current settings.
    ///
    /// Animation mode with more than one frame produces an animated
    /// container; otherwise the first frame encodes as a still image.
    /// Re-running after a settings change replaces the previous blob.
    pub fn encode(&mut self) -> Result<()> {
        if self.state != WriteState::FramesCaptured && self.state != WriteState::Encoded {
            return Err(self.bad_state("FramesCaptured"));
        }
        let result = if self.config.animation && self.frames.len() > 1 {
            codec::encode_all_frames(&self.frames, &self.config)
        } else {
            match self.frames.get(0) {
                Some(first) => codec::encode_one_image(&first.image, &self.config),
                None => Err(AdapterError::InvalidState {
                    expected: "at least one captured frame",
                    found: "empty sequence",
                }),
            }
        };
        match result {
            Ok(blob) => {
                self.encoded = blob;
                self.state = WriteState::Encoded;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "encode failed, resetting session");
                self.reset();
                Err(err)
            }
        }
    }

    /// Attaches the kept metadata chunks to the encoded blob.
    pub fn mux_metadata(&mut self) -> Result<()> {
        self.expect(WriteState::Encoded)?;
        match codec::encode_metadata(&self.config, &self.metadata, &mut self.encoded) {
            Ok(()) => {
                self.state = WriteState::MetadataMuxed;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "metadata mux failed, resetting session");
                self.reset();
                Err(err)
            }
        }
    }

    /// Writes the finished blob to `sink` and returns its size.
    pub fn finish<W: Write>(&mut self, sink: &mut W) -> Result<u64> {
        if self.state != WriteState::Encoded && self.state != WriteState::MetadataMuxed {
            return Err(self.bad_state("Encoded or MetadataMuxed"));
        }
        let write = sink
            .write_all(&self.encoded)
            .and_then(|()| sink.flush())
            .map_err(AdapterError::from);
        match write {
            Ok(()) => {
                let bytes = self.encoded.len() as u64;
                debug!(bytes, "wrote WebP file");
                self.state = WriteState::Written;
                Ok(bytes)
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    /// Consumes the finished blob instead of writing it to a sink.
    pub fn take_encoded(&mut self) -> Result<Vec<u8>> {
        if self.state != WriteState::Encoded && self.state != WriteState::MetadataMuxed {
            return Err(self.bad_state("Encoded or MetadataMuxed"));
        }
        self.state = WriteState::Written;
        Ok(core::mem::take(&mut self.encoded))
    }

    /// Drops everything staged and returns to [`WriteState::Idle`].
    pub fn reset(&mut self) {
        self.encoded = Vec::new();
        self.frames.clear();
        self.metadata.clear_all();
        self.state = WriteState::Idle;
    }

    fn expect(&self, state: WriteState) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(AdapterError::InvalidState {
                expected: state.name(),
                found: self.state.name(),
            })
        }
    }

    fn bad_state(&self, expected: &'static str) -> AdapterError {
        AdapterError::InvalidState {
            expected,
            found: self.state.name(),
        }
    }
}

/// One read round-trip over an in-memory WebP file.
pub struct ReadSession {
    blob: Vec<u8>,
    declared_size: u64,
}

impl ReadSession {
    /// Takes ownership of the file bytes after validating the container
    /// header.
    pub fn open(blob: Vec<u8>) -> Result<Self> {
        let declared_size = codec::sniff_header(&blob)?;
        Ok(Self {
            blob,
            declared_size,
        })
    }

    /// Total file size declared by the container header.
    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Whether the file carries an animation.
    pub fn is_animated(&self) -> Result<bool> {
        Ok(zenwebp::WebPDecoder::new(&self.blob)?.is_animated())
    }

    /// Decodes the (first or only) image into `image`.
    pub fn decode_image(&self, image: &mut PixelBuffer) -> Result<()> {
        codec::decode_one_image(&self.blob, image)
    }

    /// Decodes every animation frame into `frames`.
    pub fn decode_frames(&self, frames: &mut FrameSequence) -> Result<()> {
        codec::decode_all_frames(&self.blob, frames)
    }

    /// Extracts the metadata chunks.
    pub fn metadata(&self) -> Result<MetadataSet> {
        codec::decode_metadata(&self.blob)
    }

    /// Layer names for decoded frames, carrying each frame's duration.
    pub fn frame_labels(frames: &FrameSequence) -> Vec<String> {
        frames
            .iter()
            .enumerate()
            .map(|(index, frame)| format_duration(index, frame.duration_ms.max(0) as u32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_out_of_order_are_contract_errors() {
        let mut session = WriteSession::new(WriteConfig::default());
        assert!(matches!(
            session.mux_metadata(),
            Err(AdapterError::InvalidState { .. })
        ));
        assert!(matches!(
            session.finish(&mut Vec::<u8>::new()),
            Err(AdapterError::InvalidState { .. })
        ));
        assert!(matches!(
            session.encode(),
            Err(AdapterError::InvalidState { .. })
        ));
        assert_eq!(session.state(), WriteState::Idle);
    }

    #[test]
    fn encode_of_an_empty_capture_resets_to_idle() {
        let mut session = WriteSession::new(WriteConfig::default());
        session.set_frames(FrameSequence::new());
        assert_eq!(session.state(), WriteState::FramesCaptured);
        assert!(session.encode().is_err());
        assert_eq!(session.state(), WriteState::Idle);
    }

    #[test]
    fn cancelled_dialog_resets_the_session() {
        struct Cancels;
        impl OptionsDialog for Cancels {
            fn run(
                &mut self,
                _config: &mut WriteConfig,
                _metadata: &MetadataSet,
                _frames: &FrameSequence,
            ) -> Result<DialogOutcome> {
                Ok(DialogOutcome::Cancelled)
            }
        }
        let mut session = WriteSession::new(WriteConfig::default());
        let mut frames = FrameSequence::new();
        frames.resize(1);
        session.set_frames(frames);
        assert!(!session.run_dialog(&mut Cancels).unwrap());
        assert_eq!(session.state(), WriteState::Idle);
        assert!(session.frames().is_empty());
    }

    #[test]
    fn accepted_dialog_may_hand_back_a_blob() {
        struct Precomputes;
        impl OptionsDialog for Precomputes {
            fn run(
                &mut self,
                config: &mut WriteConfig,
                _metadata: &MetadataSet,
                _frames: &FrameSequence,
            ) -> Result<DialogOutcome> {
                config.quality = 90;
                Ok(DialogOutcome::Accepted {
                    precomputed: Some(vec![1, 2, 3]),
                })
            }
        }
        let mut session = WriteSession::new(WriteConfig::default());
        let mut frames = FrameSequence::new();
        frames.resize(1);
        session.set_frames(frames);
        assert!(session.run_dialog(&mut Precomputes).unwrap());
        assert_eq!(session.state(), WriteState::Encoded);
        assert_eq!(session.config().quality, 90);
        assert_eq!(session.take_encoded().unwrap(), vec![1, 2, 3]);
        assert_eq!(session.state(), WriteState::Written);
    }

    #[test]
    fn settings_change_invalidates_the_blob() {
        let mut session = WriteSession::new(WriteConfig::default());
        let mut frames = FrameSequence::new();
        frames.resize(1);
        session.set_frames(frames);
        session.encoded = vec![9];
        session.state = WriteState::Encoded;
        session.config_mut().quality = 10;
        assert_eq!(session.state(), WriteState::FramesCaptured);
        assert!(session.encoded.is_empty());
    }

    #[test]
    fn read_session_rejects_non_webp_bytes() {
        assert!(ReadSession::open(b"GIF89a".to_vec()).is_err());
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"WEBP");
        let session = ReadSession::open(bytes).unwrap();
        assert_eq!(session.declared_size(), 12);
    }

    #[test]
    fn frame_labels_carry_durations() {
        let mut frames = FrameSequence::new();
        frames.resize(2);
        frames[0].duration_ms = 40;
        frames[1].duration_ms = 70;
        assert_eq!(
            ReadSession::frame_labels(&frames),
            vec!["Frame 1 (40 ms)", "Frame 2 (70 ms)"]
        );
    }
}
