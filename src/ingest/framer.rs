//! Slices the metadata stream into one raw item per `</item>` line

use std::io::{BufRead, ErrorKind};

use crate::ingest::error::FrameError;

/// Closing marker of one metadata item
pub const ITEM_CLOSE: &str = "</item>";

/// Text of one framed item, not yet parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord(pub String);

impl RawRecord {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Lazily reads lines from `input` and yields one [`RawRecord`] per item.
///
/// Each call to `next` reads as many lines as needed to close the current
/// item, one line per read. Iteration ends when the input is exhausted.
pub struct Framer<R> {
    input: R,
    buffer: String,
    line: Vec<u8>,
    done: bool,
}

impl<R: BufRead> Framer<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            buffer: String::new(),
            line: Vec::new(),
            done: false,
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, std::io::Error> {
        self.line.clear();
        loop {
            match self.input.read_until(b'\n', &mut self.line) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(String::from_utf8_lossy(&self.line).into_owned())),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

fn closes_item(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']).ends_with(ITEM_CLOSE)
}

impl<R: BufRead> Iterator for Framer<R> {
    type Item = Result<RawRecord, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.done = true;
                    if self.buffer.trim().is_empty() {
                        return None;
                    }
                    let len = self.buffer.len();
                    self.buffer.clear();
                    return Some(Err(FrameError::Truncated(len)));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(FrameError::Io(e)));
                }
            };

            if self.buffer.is_empty() && line.trim().is_empty() {
                continue;
            }
            self.buffer.push_str(&line);

            if closes_item(&line) {
                return Some(Ok(RawRecord(std::mem::take(&mut self.buffer))));
            }
        }
    }
}
