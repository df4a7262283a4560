//! Write settings and their mapping onto codec parameters.

use tracing::warn;
use zenwebp::{EncoderConfig, LosslessConfig, LossyConfig};

/// Encoder speed/quality tradeoff exposed to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    Fastest,
    #[default]
    Default,
    Slowest,
}

impl Compression {
    fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Fastest),
            1 => Some(Self::Default),
            2 => Some(Self::Slowest),
            _ => None,
        }
    }

    fn index(self) -> i32 {
        match self {
            Self::Fastest => 0,
            Self::Default => 1,
            Self::Slowest => 2,
        }
    }
}

/// Quality at or above which encoding switches to the lossless path.
pub const LOSSLESS_THRESHOLD: u8 = 98;

/// User-facing write settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteConfig {
    /// Overall quality in `[0, 100]`. 98 and above selects lossless.
    pub quality: u8,
    /// Speed/quality tradeoff.
    pub compression: Compression,
    /// Carry EXIF metadata into the output.
    pub keep_exif: bool,
    /// Carry XMP metadata into the output.
    pub keep_xmp: bool,
    /// Carry the ICC profile into the output.
    pub keep_color_profile: bool,
    /// Loop animations forever rather than playing once.
    pub loop_forever: bool,
    /// Encode the document's frames as an animation.
    ///
    /// Derived from the open document, not persisted with the other
    /// settings.
    pub animation: bool,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            quality: 75,
            compression: Compression::Default,
            keep_exif: false,
            keep_xmp: false,
            keep_color_profile: false,
            loop_forever: true,
            animation: false,
        }
    }
}

impl WriteConfig {
    /// Whether these settings select the lossless path.
    pub fn is_lossless(&self) -> bool {
        self.quality >= LOSSLESS_THRESHOLD
    }

    /// Maps the user settings onto codec parameters.
    ///
    /// Quality 98/99/100 selects lossless with increasing near-lossless
    /// fidelity (60/80/100) and effort set by the compression level.
    /// Below 98 the quality is stretched over the full lossy range
    /// (`q * 100 / 97`) and sharp YUV conversion is enabled only at the
    /// slowest level. Alpha quality tracks `50 + q / 2` on both paths.
    pub fn to_encoder_config(&self) -> EncoderConfig {
        if self.is_lossless() {
            EncoderConfig::Lossless(self.to_lossless_config())
        } else {
            EncoderConfig::Lossy(self.to_lossy_config())
        }
    }

    /// The lossless parameters, for requests that take the split config
    /// types. Meaningful only when [`is_lossless`](Self::is_lossless).
    pub fn to_lossless_config(&self) -> LosslessConfig {
        LosslessConfig::new()
            .with_quality(self.lossless_effort())
            .with_near_lossless(self.near_lossless())
            .with_method(self.method())
            .with_alpha_quality(self.alpha_quality())
    }

    /// The lossy parameters, for requests that take the split config
    /// types. Meaningful only when not [`is_lossless`](Self::is_lossless).
    pub fn to_lossy_config(&self) -> LossyConfig {
        LossyConfig::new()
            .with_quality(self.lossy_quality())
            .with_method(self.method())
            .with_sharp_yuv(self.compression == Compression::Slowest)
            .with_alpha_quality(self.alpha_quality())
    }

    fn method(&self) -> u8 {
        match self.compression {
            Compression::Fastest => 1,
            Compression::Default => 4,
            Compression::Slowest => 6,
        }
    }

    fn near_lossless(&self) -> u8 {
        match self.quality {
            98 => 60,
            99 => 80,
            _ => 100,
        }
    }

    fn lossless_effort(&self) -> f32 {
        match self.compression {
            Compression::Fastest => 0.0,
            Compression::Default => 75.0,
            Compression::Slowest => 100.0,
        }
    }

    fn lossy_quality(&self) -> f32 {
        self.quality as f32 * 100.0 / 97.0
    }

    fn alpha_quality(&self) -> u8 {
        (50 + self.quality as u32 / 2).min(100) as u8
    }
}

// --- Scripting parameter store ---------------------------------------------

/// A typed scripting parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamValue {
    Integer(i32),
    Boolean(bool),
}

/// Parameter keys, as recorded by the host's scripting system.
pub mod param_keys {
    pub const QUALITY: &str = "quality";
    pub const COMPRESSION: &str = "compression";
    pub const KEEP_EXIF: &str = "keepExif";
    pub const KEEP_XMP: &str = "keepXmp";
    pub const KEEP_COLOR_PROFILE: &str = "keepColorProfile";
    pub const LOOP_FOREVER: &str = "loopForever";
}

impl WriteConfig {
    /// The persisted settings as key/value parameters. `animation` is
    /// deliberately absent.
    pub fn to_params(&self) -> Vec<(&'static str, ParamValue)> {
        vec![
            (param_keys::QUALITY, ParamValue::Integer(self.quality as i32)),
            (
                param_keys::COMPRESSION,
                ParamValue::Integer(self.compression.index()),
            ),
            (param_keys::KEEP_EXIF, ParamValue::Boolean(self.keep_exif)),
            (param_keys::KEEP_XMP, ParamValue::Boolean(self.keep_xmp)),
            (
                param_keys::KEEP_COLOR_PROFILE,
                ParamValue::Boolean(self.keep_color_profile),
            ),
            (
                param_keys::LOOP_FOREVER,
                ParamValue::Boolean(self.loop_forever),
            ),
        ]
    }

    /// Applies recorded parameters over the current settings.
    ///
    /// Unknown keys are ignored and out-of-range or wrongly-typed values
    /// are discarded, leaving the affected setting unchanged; a recording
    /// made by a newer version must never poison an older reader.
    pub fn apply_params<'a, I>(&mut self, params: I)
    where
        I: IntoIterator<Item = (&'a str, ParamValue)>,
    {
        for (key, value) in params {
            match (key, value) {
                (param_keys::QUALITY, ParamValue::Integer(q)) if (0..=100).contains(&q) => {
                    self.quality = q as u8;
                }
                (param_keys::COMPRESSION, ParamValue::Integer(c)) => {
                    match Compression::from_index(c) {
                        Some(level) => self.compression = level,
                        None => warn!(key, value = c, "discarding out-of-range parameter"),
                    }
                }
                (param_keys::KEEP_EXIF, ParamValue::Boolean(b)) => self.keep_exif = b,
                (param_keys::KEEP_XMP, ParamValue::Boolean(b)) => self.keep_xmp = b,
                (param_keys::KEEP_COLOR_PROFILE, ParamValue::Boolean(b)) => {
                    self.keep_color_profile = b;
                }
                (param_keys::LOOP_FOREVER, ParamValue::Boolean(b)) => self.loop_forever = b,
                (param_keys::QUALITY, ParamValue::Integer(q)) => {
                    warn!(key, value = q, "discarding out-of-range parameter");
                }
                _ => warn!(key, "ignoring unknown or mistyped parameter"),
            }
        }
    }
}
