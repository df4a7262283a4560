//! Frame duration labels.
//!
//! Hosts carry per-frame timing in layer names rather than structured
//! data, so durations round-trip through strings: `format_duration`
//! writes the canonical `"Frame 3 (120 ms)"` form and
//! `try_extract_duration` scans arbitrary user-edited names for the last
//! well-formed `(<digits> ms)` marker.

/// Longest label prefix the scanner examines, in characters.
pub const MAX_LABEL_CHARS: usize = 256;

/// Largest duration the scanner accepts, in milliseconds.
pub const MAX_DURATION_MS: u32 = (1 << 30) / 10;

#[derive(Clone, Copy, PartialEq)]
enum ScanState {
    SeekOpen,
    Digits,
    ExpectS,
    ExpectClose,
}

/// Scans `label` for a `(<digits> ms)` marker and returns its value.
///
/// Spaces are ignored, `ms` is case-insensitive, and a malformed marker
/// restarts the scan, so the last well-formed occurrence wins. Values
/// above [`MAX_DURATION_MS`] are treated as malformed. At most
/// [`MAX_LABEL_CHARS`] characters are examined.
pub fn try_extract_duration(label: &str) -> Option<u32> {
    let mut state = ScanState::SeekOpen;
    let mut value: u32 = 0;
    let mut have_digit = false;
    let mut found: Option<u32> = None;

    for ch in label.chars().take(MAX_LABEL_CHARS) {
        if ch == ' ' {
            continue;
        }
        state = match (state, ch) {
            (ScanState::SeekOpen, '(') => {
                value = 0;
                have_digit = false;
                ScanState::Digits
            }
            (ScanState::SeekOpen, _) => ScanState::SeekOpen,
            (ScanState::Digits, '0'..='9') => {
                value = value * 10 + (ch as u32 - '0' as u32);
                if value > MAX_DURATION_MS {
                    ScanState::SeekOpen
                } else {
                    have_digit = true;
                    ScanState::Digits
                }
            }
            (ScanState::Digits, 'm' | 'M') if have_digit => ScanState::ExpectS,
            (ScanState::ExpectS, 's' | 'S') => ScanState::ExpectClose,
            (ScanState::ExpectClose, ')') => {
                found = Some(value);
                ScanState::SeekOpen
            }
            // A stray '(' anywhere restarts a fresh marker.
            (_, '(') => {
                value = 0;
                have_digit = false;
                ScanState::Digits
            }
            _ => ScanState::SeekOpen,
        };
    }
    found
}

/// The canonical frame label: `"Frame {index + 1} ({duration} ms)"`.
pub fn format_duration(frame_index: usize, duration_ms: u32) -> String {
    format!("Frame {} ({} ms)", frame_index + 1, duration_ms)
}

/// Whether a set of layer names describes an animation: every name must
/// carry a duration marker and the count must be strictly between 1 and
/// `max_frames`.
pub fn is_animation<'a, I>(names: I, max_frames: usize) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let mut count = 0usize;
    for name in names {
        if try_extract_duration(name).is_none() {
            return false;
        }
        count += 1;
        if count >= max_frames {
            return false;
        }
    }
    count > 1
}
