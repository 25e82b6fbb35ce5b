//! Incremental HTTP request head reader
//!
//! Bytes may arrive split at any boundary. The reader accumulates them into
//! CRLF-terminated lines, dispatches each line to the [`HttpRequestHead`] and
//! stops at the blank line ending the head. Anything after the head is left
//! to the caller.

use super::head::HttpRequestHead;
use crate::error::{ProxyError, ProxyResult};
use bytes::{BufMut, BytesMut};

/// Default cap on the size of a request head
pub const DEFAULT_MAX_HEAD_BYTES: usize = 64 * 1024;

/// Outcome of one [`FrameReader::feed`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseResult {
    /// The head terminator has been seen
    pub complete: bool,
    /// Bytes of the chunk that belong to the head
    pub consumed: usize,
}

/// Accumulates one request head across partial reads
#[derive(Debug)]
pub struct FrameReader {
    head: HttpRequestHead,
    raw: BytesMut,
    line_start: usize,
    seen_request_line: bool,
    max_head_bytes: usize,
}

impl FrameReader {
    pub fn new(max_head_bytes: usize) -> Self {
        FrameReader {
            head: HttpRequestHead::default(),
            raw: BytesMut::new(),
            line_start: 0,
            seen_request_line: false,
            max_head_bytes,
        }
    }

    /// Consume bytes up to and including the head terminator.
    ///
    /// Once the head is complete further calls consume nothing.
    pub fn feed(&mut self, data: &[u8]) -> ProxyResult<ParseResult> {
        if self.head.is_complete() {
            return Ok(ParseResult {
                complete: true,
                consumed: 0,
            });
        }

        for (i, &byte) in data.iter().enumerate() {
            if self.raw.len() >= self.max_head_bytes {
                return Err(ProxyError::Parse(format!(
                    "request head exceeds {} bytes",
                    self.max_head_bytes
                )));
            }
            self.raw.put_u8(byte);

            if byte == b'\n' && self.ends_with_crlf() {
                self.dispatch_line()?;
                if self.head.is_complete() {
                    return Ok(ParseResult {
                        complete: true,
                        consumed: i + 1,
                    });
                }
            }
        }

        Ok(ParseResult {
            complete: false,
            consumed: data.len(),
        })
    }

    /// The head parsed so far
    pub fn head(&self) -> &HttpRequestHead {
        &self.head
    }

    pub fn is_complete(&self) -> bool {
        self.head.is_complete()
    }

    fn ends_with_crlf(&self) -> bool {
        let len = self.raw.len();
        len - self.line_start >= 2 && self.raw[len - 2] == b'\r'
    }

    fn dispatch_line(&mut self) -> ProxyResult<()> {
        let end = self.raw.len() - 2;
        let line = String::from_utf8_lossy(&self.raw[self.line_start..end]).into_owned();
        self.line_start = self.raw.len();

        if line.is_empty() {
            let raw = self.raw.split().freeze();
            self.line_start = 0;
            return self.head.finish(raw);
        }

        if self.seen_request_line {
            self.head.apply_header_line(&line)
        } else {
            self.seen_request_line = true;
            self.head.apply_request_line(&line)
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        FrameReader::new(DEFAULT_MAX_HEAD_BYTES)
    }
}
