use std::io::BufRead;

use tracing::warn;

use crate::PositionFix;

/// JSON-lines fix stream reader
///
/// Turns a stream of text lines, one JSON object per line, into
/// [`PositionFix`] values:
/// - blank lines and lines starting with `#` are skipped
/// - malformed lines are counted and skipped, they never end the stream
/// - headings are normalised into [0, 360)
///
/// # Usage
///
/// ```no_run
/// use geofix::FixStreamReader;
///
/// let mut reader = FixStreamReader::new();
/// if let Some(fix) = reader.process_line(r#"{"latitude":1.0,"longitude":2.0,"timestamp_ms":0}"#) {
///     println!("{}", fix);
/// }
/// ```
#[derive(Debug, Default)]
pub struct FixStreamReader {
    lines_read: u64,
    malformed_lines: u64,
}

impl FixStreamReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one line. Returns `None` for skipped or malformed lines.
    pub fn process_line(&mut self, line: &str) -> Option<PositionFix> {
        self.lines_read += 1;

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        match serde_json::from_str::<PositionFix>(line) {
            Ok(mut fix) => {
                fix.heading = fix.heading.map(normalize_heading);
                Some(fix)
            }
            Err(e) => {
                self.malformed_lines += 1;
                warn!("Skipping malformed fix on line {}: {}", self.lines_read, e);
                None
            }
        }
    }

    /// Read every fix from a buffered reader, in order.
    pub fn read_all<R: BufRead>(&mut self, input: R) -> std::io::Result<Vec<PositionFix>> {
        let mut fixes = Vec::new();
        for line in input.lines() {
            if let Some(fix) = self.process_line(&line?) {
                fixes.push(fix);
            }
        }
        Ok(fixes)
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn malformed_lines(&self) -> u64 {
        self.malformed_lines
    }
}

fn normalize_heading(heading: f64) -> f64 {
    (heading % 360.0 + 360.0) % 360.0
}
