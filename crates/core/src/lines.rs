//! Bounded line reader for JSONL transcripts.
//!
//! Transcripts are append-only and a single record can carry a whole file
//! attachment, so lines are read with an explicit ceiling instead of
//! `BufRead::lines`. A line longer than the ceiling is consumed and dropped
//! without ever being held in memory in full.

use std::io::{self, BufRead};

use memchr::memchr;
use tracing::warn;

/// Largest single line accepted, in bytes: 10 MiB.
pub const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

/// Iterator over the non-empty lines of a reader, as raw bytes without the
/// trailing newline.
pub struct JsonlLines<R> {
    reader: R,
    max_len: usize,
    line_number: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> JsonlLines<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_LINE_BYTES)
    }

    pub fn with_limit(reader: R, max_len: usize) -> Self {
        Self {
            reader,
            max_len,
            line_number: 0,
            buf: Vec::new(),
        }
    }

    /// 1-based number of the line most recently returned.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read one physical line into `self.buf`. Returns `Ok(false)` at EOF.
    /// `self.buf` is left empty when the line exceeded the limit.
    fn read_line(&mut self) -> io::Result<bool> {
        self.buf.clear();
        let mut oversized = false;
        let mut read_any = false;

        loop {
            let available = match self.reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                break;
            }
            read_any = true;

            let (take, done) = match memchr(b'\n', available) {
                Some(pos) => (pos, true),
                None => (available.len(), false),
            };

            if !oversized {
                if self.buf.len() + take > self.max_len {
                    oversized = true;
                    self.buf.clear();
                } else {
                    self.buf.extend_from_slice(&available[..take]);
                }
            }

            let consumed = if done { take + 1 } else { take };
            self.reader.consume(consumed);
            if done {
                break;
            }
        }

        if !read_any {
            return Ok(false);
        }
        self.line_number += 1;
        if oversized {
            warn!(
                line = self.line_number,
                limit = self.max_len,
                "Skipping transcript line over size limit"
            );
        }
        Ok(true)
    }
}

impl<R: BufRead> Iterator for JsonlLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.read_line() {
                Ok(false) => return None,
                Ok(true) => {
                    let trimmed = self.buf.trim_ascii();
                    if trimmed.is_empty() {
                        continue;
                    }
                    return Some(Ok(trimmed.to_vec()));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
