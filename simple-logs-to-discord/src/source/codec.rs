//! Line framing for child process output.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Longest line handed on, in bytes. Anything past this is dropped up to the
/// next newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Splits output on `\n` into lossily decoded strings.
///
/// A trailing `\r` is removed and invalid UTF-8 is replaced. A line longer
/// than `max_length` is cut to `max_length` bytes and the rest of it is
/// skipped, so a writer that never emits a newline cannot grow the buffer
/// without bound. Decoding never fails.
#[derive(Debug, Clone)]
pub struct LogLineCodec {
    max_length: usize,
    /// Skipping the remainder of a line that was already emitted cut short.
    discarding: bool,
    /// Bytes of the buffer already searched for a newline.
    next_index: usize,
}

impl LogLineCodec {
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            discarding: false,
            next_index: 0,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn emit(&self, raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let raw = &raw[..raw.len().min(self.max_length)];
        String::from_utf8_lossy(raw).into_owned()
    }
}

impl Default for LogLineCodec {
    fn default() -> Self {
        Self::new(MAX_LINE_BYTES)
    }
}

impl Decoder for LogLineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match newline {
                Some(end) => {
                    let line = src.split_to(end + 1);
                    self.next_index = 0;
                    if self.discarding {
                        self.discarding = false;
                        continue;
                    }
                    return Ok(Some(self.emit(&line)));
                }
                None if self.discarding => {
                    src.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                None if src.len() > self.max_length => {
                    let line = src.split_to(self.max_length);
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                    return Ok(Some(self.emit(&line)));
                }
                None => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        // Unterminated last line.
        let line = src.split();
        Ok(Some(self.emit(&line)))
    }
}
