//! Transcoder diagnostic stream parsing.

use std::io::{self, BufRead};

const DURATION_TOKEN: &str = "Duration: ";
const TIME_TOKEN: &str = "time=";
/// Width of an `HH:MM:SS.cc` field
const TIMESTAMP_LEN: usize = 11;

/// Parses an `HH:MM:SS.cc` timestamp into seconds
pub fn parse_timestamp(field: &str) -> Option<f64> {
    let mut parts = field.trim().splitn(3, ':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if hours < 0.0 || minutes < 0.0 || seconds < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn timestamp_after(line: &str, token: &str) -> Option<f64> {
    let start = line.find(token)? + token.len();
    let rest = &line[start..];
    let field = rest.get(..TIMESTAMP_LEN).unwrap_or(rest);
    parse_timestamp(field)
}

/// Tracks the expected and current media time reported by the transcoder
#[derive(Debug, Clone, Default)]
pub struct ProgressParser {
    total_secs: Option<f64>,
    current_secs: Option<f64>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one diagnostic line. Returns the completion percentage in
    /// `[0, 100]` once both the total and current time are known.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        if self.total_secs.is_none() {
            if let Some(total) = timestamp_after(line, DURATION_TOKEN) {
                log::debug!("Transcoder reports duration {:.2}s", total);
                self.total_secs = Some(total);
            }
        }

        let current = timestamp_after(line, TIME_TOKEN)?;
        self.current_secs = Some(current);

        let total = self.total_secs?;
        if total <= 0.0 {
            return None;
        }
        Some((current / total * 100.0).clamp(0.0, 100.0))
    }

    pub fn total_secs(&self) -> Option<f64> {
        self.total_secs
    }
}

/// Splits a diagnostic stream into lines on `\n` and on `\r`, since status
/// lines are rewritten in place with carriage returns
pub struct DiagnosticLines<R> {
    reader: R,
    pending: Vec<u8>,
}

impl<R: BufRead> DiagnosticLines<R> {
    pub fn new(reader: R) -> Self {
        DiagnosticLines {
            reader,
            pending: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for DiagnosticLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let available = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Some(Err(e)),
            };

            if available.is_empty() {
                if self.pending.is_empty() {
                    return None;
                }
                let line = String::from_utf8_lossy(&self.pending).to_string();
                self.pending.clear();
                return Some(Ok(line));
            }

            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    self.pending.extend_from_slice(&available[..end]);
                    self.reader.consume(end + 1);
                    if self.pending.is_empty() {
                        // \r\n pair or blank line
                        continue;
                    }
                    let line = String::from_utf8_lossy(&self.pending).to_string();
                    self.pending.clear();
                    return Some(Ok(line));
                }
                None => {
                    let len = available.len();
                    self.pending.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }
    }
}
