//! Metadata chunks carried alongside the image payload.

/// The metadata chunk kinds a WebP container can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataKind {
    Exif,
    Xmp,
    IccProfile,
}

impl MetadataKind {
    /// All kinds, in container order.
    pub const ALL: [MetadataKind; 3] = [Self::Exif, Self::Xmp, Self::IccProfile];

    /// The chunk FourCC. Note the trailing space in `"XMP "`.
    pub fn four_cc(self) -> [u8; 4] {
        match self {
            Self::Exif => *b"EXIF",
            Self::Xmp => *b"XMP ",
            Self::IccProfile => *b"ICCP",
        }
    }
}

/// One slot per metadata kind, each holding the raw chunk payload.
#[derive(Debug, Default, Clone)]
pub struct MetadataSet {
    exif: Vec<u8>,
    xmp: Vec<u8>,
    icc_profile: Vec<u8>,
}

impl MetadataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: MetadataKind) -> &[u8] {
        match kind {
            MetadataKind::Exif => &self.exif,
            MetadataKind::Xmp => &self.xmp,
            MetadataKind::IccProfile => &self.icc_profile,
        }
    }

    pub fn set(&mut self, kind: MetadataKind, payload: Vec<u8>) {
        *self.slot_mut(kind) = payload;
    }

    /// Takes the payload out of a slot, leaving it empty.
    pub fn take(&mut self, kind: MetadataKind) -> Vec<u8> {
        core::mem::take(self.slot_mut(kind))
    }

    pub fn clear(&mut self, kind: MetadataKind) {
        self.slot_mut(kind).clear();
    }

    /// Releases all three payloads.
    pub fn clear_all(&mut self) {
        for kind in MetadataKind::ALL {
            *self.slot_mut(kind) = Vec::new();
        }
    }

    pub fn has(&self, kind: MetadataKind) -> bool {
        !self.get(kind).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        MetadataKind::ALL.iter().all(|&k| !self.has(k))
    }

    fn slot_mut(&mut self, kind: MetadataKind) -> &mut Vec<u8> {
        match kind {
            MetadataKind::Exif => &mut self.exif,
            MetadataKind::Xmp => &mut self.xmp,
            MetadataKind::IccProfile => &mut self.icc_profile,
        }
    }
}
