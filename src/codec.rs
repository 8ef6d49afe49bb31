//! Recording file format
//!
//! Plain text, one event per line, no header:
//!
//! ```text
//! <scancode> <extended 0|1> <kind 0=press 1=release> <frame> <key name>
//! 30 0 0 12 A
//! 30 0 1 15 A
//! 29 1 0 40 Right Ctrl
//! ```
//!
//! The key name is informational and ignored on read. Lines that do not
//! start with four valid fields are skipped rather than failing the load;
//! the decoder reports how many were skipped and where.

use crate::error::RecordingFileError;
use crate::key::{KeyIdentity, KeyTransition, TransitionKind};
use crate::recording::{RecordedEvent, Recording};
use std::fmt::Write as _;
use std::path::Path;

/// Result of decoding a recording file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub recording: Recording,
    /// 1-based line numbers of lines that were skipped as malformed
    pub skipped_lines: Vec<usize>,
}

impl Decoded {
    pub fn skipped(&self) -> usize {
        self.skipped_lines.len()
    }
}

/// Format a single event as one line (without the newline)
pub fn encode_event(event: &RecordedEvent) -> String {
    let key = event.transition.key;
    format!(
        "{} {} {} {} {}",
        key.scancode,
        u8::from(key.extended),
        event.transition.kind.ordinal(),
        event.frame,
        key.name()
    )
}

/// Serialize a recording to the line format
pub fn encode(recording: &Recording) -> String {
    let mut out = String::with_capacity(recording.len() * 16);
    for event in recording {
        let _ = writeln!(out, "{}", encode_event(event));
    }
    out
}

/// Parse the four leading fields of a line
///
/// Returns `None` when any field is missing or out of range. Anything after
/// the fourth field is ignored.
pub fn decode_line(line: &str) -> Option<RecordedEvent> {
    let mut fields = line.split_whitespace();
    let scancode: u8 = fields.next()?.parse().ok()?;
    let extended = match fields.next()? {
        "0" => false,
        "1" => true,
        _ => return None,
    };
    let kind = TransitionKind::from_ordinal(fields.next()?.parse().ok()?)?;
    let frame: u32 = fields.next()?.parse().ok()?;

    Some(RecordedEvent::new(
        KeyTransition {
            key: KeyIdentity::new(scancode, extended),
            kind,
        },
        frame,
    ))
}

/// Deserialize a recording, skipping malformed lines
///
/// A line whose frame is lower than the previous accepted frame counts as
/// malformed, so the decoded recording always keeps its frame ordering.
/// Blank lines are ignored and not counted.
pub fn decode(text: &str) -> Decoded {
    let mut decoded = Decoded::default();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        match decode_line(line) {
            Some(event) if decoded.recording.push(event) => {}
            Some(event) => {
                tracing::debug!(
                    "Line {}: frame {} goes backwards, skipping",
                    line_number,
                    event.frame
                );
                decoded.skipped_lines.push(line_number);
            }
            None => {
                tracing::debug!("Line {}: malformed, skipping: {:?}", line_number, line);
                decoded.skipped_lines.push(line_number);
            }
        }
    }

    decoded
}

/// Write a recording to a file, creating parent directories as needed
pub fn save(path: &Path, recording: &Recording) -> Result<(), RecordingFileError> {
    let write_err = |source| RecordingFileError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    std::fs::write(path, encode(recording)).map_err(write_err)?;

    tracing::debug!("Saved {} events to {:?}", recording.len(), path);
    Ok(())
}

/// Read a recording from a file
pub fn load(path: &Path) -> Result<Decoded, RecordingFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| RecordingFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = decode(&text);
    if decoded.skipped() > 0 {
        tracing::warn!(
            "Skipped {} malformed line(s) in {:?} (lines {:?})",
            decoded.skipped(),
            path,
            decoded.skipped_lines
        );
    }
    tracing::debug!("Loaded {} events from {:?}", decoded.recording.len(), path);
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recording {
        Recording::from_events(vec![
            RecordedEvent::new(KeyTransition::press(KeyIdentity::plain(0x1E)), 12),
            RecordedEvent::new(KeyTransition::release(KeyIdentity::plain(0x1E)), 15),
            RecordedEvent::new(KeyTransition::press(KeyIdentity::extended(0x1D)), 15),
            RecordedEvent::new(KeyTransition::release(KeyIdentity::extended(0x1D)), 40),
        ])
        .unwrap()
    }

    #[test]
    fn test_encode_format() {
        let text = encode(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "30 0 0 12 A");
        assert_eq!(lines[1], "30 0 1 15 A");
        assert_eq!(lines[2], "29 1 0 15 Right Ctrl");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_round_trip() {
        let recording = sample();
        let decoded = decode(&encode(&recording));
        assert_eq!(decoded.recording, recording);
        assert_eq!(decoded.skipped(), 0);
    }

    #[test]
    fn test_round_trip_extremes() {
        let recording = Recording::from_events(vec![
            RecordedEvent::new(KeyTransition::press(KeyIdentity::plain(0)), 0),
            RecordedEvent::new(KeyTransition::press(KeyIdentity::extended(0)), 0),
            RecordedEvent::new(KeyTransition::release(KeyIdentity::plain(255)), 7),
            RecordedEvent::new(KeyTransition::release(KeyIdentity::extended(255)), u32::MAX),
            RecordedEvent::new(KeyTransition::press(KeyIdentity::plain(255)), u32::MAX),
        ])
        .unwrap();

        let text = encode(&recording);
        assert!(text.contains("255 1 1 4294967295"));

        let decoded = decode(&text);
        assert_eq!(decoded.recording, recording);
        assert_eq!(decoded.skipped(), 0);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(encode(&Recording::new()), "");
        let decoded = decode("");
        assert!(decoded.recording.is_empty());
        assert_eq!(decoded.skipped(), 0);
    }

    #[test]
    fn test_trailing_name_is_ignored() {
        let event = decode_line("59 0 1 7 this is not F1 at all").unwrap();
        assert_eq!(event.transition, KeyTransition::release(KeyIdentity::plain(0x3B)));
        assert_eq!(event.frame, 7);

        // No name at all is fine too
        assert!(decode_line("59 0 1 7").is_some());
    }

    #[test]
    fn test_malformed_lines_are_skipped_and_counted() {
        let text = "\
30 0 0 1 A
garbage
300 0 0 2 out of byte range
30 2 0 2 bad flag
30 0 5 2 bad kind
30 0 1 -3 negative frame
30 0 1

30 0 1 4 A
";
        let decoded = decode(text);
        assert_eq!(decoded.recording.len(), 2);
        assert_eq!(decoded.skipped_lines, vec![2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_backwards_frame_is_skipped() {
        let decoded = decode("30 0 0 10 A\n30 0 1 5 A\n30 0 1 10 A\n");
        assert_eq!(decoded.recording.len(), 2);
        assert_eq!(decoded.skipped_lines, vec![2]);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("recording.txt");
        save(&path, &sample()).unwrap();

        let decoded = load(&path).unwrap();
        assert_eq!(decoded.recording, sample());
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = load(&dir.path().join("missing.txt"));
        assert!(matches!(result, Err(RecordingFileError::Read { .. })));
    }
}
