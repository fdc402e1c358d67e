//! Line framer
//!
//! Reassembles the device's byte stream into lines. A line ends at `\n`;
//! a `\r` right before it is dropped too. Bytes are pushed one at a time,
//! so the caller can read in whatever chunk size keeps its reads prompt.

/// Longest line retained, in bytes. Anything past this is discarded up to
/// the next terminator.
pub const DEFAULT_MAX_LINE_LEN: usize = 10000;

pub struct LineFramer {
    buf: Vec<u8>,
    max_len: usize,
    truncated: bool,
}

impl LineFramer {
    pub fn new(max_len: usize) -> LineFramer {
        LineFramer {
            buf: Vec::with_capacity(256),
            max_len: max_len.max(1),
            truncated: false,
        }
    }

    /// Feeds one byte. Returns the completed line when `byte` is the
    /// terminator.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        if byte == b'\n' {
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
            if self.truncated {
                log::debug!(
                    "line exceeded {} bytes and was truncated",
                    self.max_len
                );
                self.truncated = false;
            }
            let line = String::from_utf8_lossy(&self.buf).into_owned();
            self.buf.clear();
            return Some(line);
        }
        if self.buf.len() < self.max_len {
            self.buf.push(byte);
        } else {
            self.truncated = true;
        }
        None
    }

    /// Feeds a chunk, calling `emit` for every line completed within it.
    pub fn push_all<F: FnMut(String)>(&mut self, bytes: &[u8], mut emit: F) {
        for &b in bytes {
            if let Some(line) = self.push(b) {
                emit(line);
            }
        }
    }

    /// Drops any partial line, e.g. when the link is reopened.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.truncated = false;
    }

    /// Bytes accumulated toward the current line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

impl Default for LineFramer {
    fn default() -> LineFramer {
        LineFramer::new(DEFAULT_MAX_LINE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(stream: &[u8]) -> Vec<String> {
        let mut framer = LineFramer::default();
        let mut out = Vec::new();
        for &b in stream {
            if let Some(line) = framer.push(b) {
                out.push(line);
            }
        }
        out
    }

    #[test]
    fn crlf_segments_fed_bytewise() {
        let texts = ["STATUS >> Scale:F", "", "Timestamp 1700000000 UTC", "x"];
        let mut stream = Vec::new();
        for t in texts.iter() {
            stream.extend_from_slice(t.as_bytes());
            stream.extend_from_slice(b"\r\n");
        }
        assert_eq!(frame(&stream), texts);
    }

    #[test]
    fn bare_lf_keeps_last_character() {
        assert_eq!(frame(b"abc\n"), vec!["abc"]);
    }

    #[test]
    fn early_terminators_yield_empty_lines() {
        assert_eq!(frame(b"\n\r\n"), vec!["", ""]);
    }

    #[test]
    fn partial_line_is_held() {
        let mut framer = LineFramer::default();
        framer.push_all(b"no terminator yet", |_| panic!("unexpected line"));
        assert_eq!(framer.pending(), 17);
        framer.reset();
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn overlong_line_is_truncated_not_split() {
        let mut framer = LineFramer::new(4);
        let mut out = Vec::new();
        framer.push_all(b"abcdefgh\r\nok\r\n", |l| out.push(l));
        assert_eq!(out, vec!["abcd", "ok"]);
    }
}
