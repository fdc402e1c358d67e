//! Byte buffer between the serial stream and the framer / outbound writes.

use crate::link::{RecvError, SendError};
use std::io;

/// Size of the internal buffer. Outbound lines longer than this are
/// rejected before they reach the buffer.
pub const IOBUF_SIZE: usize = 4096;

/// Buffer holding bytes read from, or waiting to be written to, a
/// non-blocking stream.
pub struct IOBuf {
    /// Valid data (possibly none) is `buf[start..end]`.
    buf: [u8; IOBUF_SIZE],
    start: usize,
    end: usize,
}

impl IOBuf {
    pub fn new() -> IOBuf {
        IOBuf {
            buf: [0; IOBUF_SIZE],
            start: 0,
            end: 0,
        }
    }

    pub fn empty(&self) -> bool {
        self.start == self.end
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn data(&self) -> &[u8] {
        &self.buf[self.start..self.end]
    }

    /// Discards up to `len` bytes off the front.
    pub fn consume(&mut self, len: usize) {
        self.start += std::cmp::min(len, self.size());
        if self.empty() {
            self.flush();
        }
    }

    /// Empties the buffer.
    pub fn flush(&mut self) {
        self.start = 0;
        self.end = 0;
    }

    fn compact(&mut self) {
        if self.start != 0 {
            let len = self.size();
            self.buf.copy_within(self.start..self.end, 0);
            self.start = 0;
            self.end = len;
        }
    }

    /// Reads whatever `reader` has available without blocking.
    /// A zero-length read means the other end hung up.
    pub fn refill<T: io::Read>(&mut self, reader: &mut T) -> Result<usize, RecvError> {
        self.compact();
        if self.end == IOBUF_SIZE {
            return Ok(0);
        }
        match reader.read(&mut self.buf[self.end..]) {
            Ok(0) => Err(RecvError::Disconnected),
            Ok(size) => {
                self.end += size;
                Ok(size)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(RecvError::NotReady),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(RecvError::NotReady),
            Err(e) => Err(RecvError::IO(e)),
        }
    }

    /// Appends `data` in full, or nothing if it does not fit.
    pub fn add_data(&mut self, data: &[u8]) -> Result<(), SendError> {
        self.compact();
        if IOBUF_SIZE - self.end < data.len() {
            return Err(SendError::Full);
        }
        self.buf[self.end..self.end + data.len()].copy_from_slice(data);
        self.end += data.len();
        Ok(())
    }

    /// Writes as much buffered data as `writer` accepts. Returns `true`
    /// once everything has gone out.
    pub fn drain<T: io::Write>(&mut self, writer: &mut T) -> Result<bool, SendError> {
        while !self.empty() {
            match writer.write(self.data()) {
                Ok(0) => return Err(SendError::Disconnected),
                Ok(size) => self.consume(size),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) => return Err(SendError::IO(e)),
            }
        }
        writer.flush().map_err(SendError::IO)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Choked {
        accepted: Vec<u8>,
        per_call: usize,
        calls_left: usize,
    }

    impl io::Write for Choked {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            if self.calls_left == 0 {
                return Err(io::Error::from(io::ErrorKind::WouldBlock));
            }
            self.calls_left -= 1;
            let n = std::cmp::min(self.per_call, data.len());
            self.accepted.extend_from_slice(&data[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn refill_then_consume() {
        let mut buf = IOBuf::new();
        let mut src = Cursor::new(b"hello\r\n".to_vec());
        assert_eq!(buf.refill(&mut src).unwrap(), 7);
        assert_eq!(buf.data(), b"hello\r\n");
        let len = buf.size();
        buf.consume(len);
        assert!(buf.empty());
    }

    #[test]
    fn refill_on_eof_is_disconnect() {
        let mut buf = IOBuf::new();
        let mut src = Cursor::new(Vec::new());
        assert!(matches!(buf.refill(&mut src), Err(RecvError::Disconnected)));
    }

    #[test]
    fn partial_drain_resumes() {
        let mut buf = IOBuf::new();
        buf.add_data(b"+++MENU:n").unwrap();
        let mut out = Choked {
            accepted: Vec::new(),
            per_call: 4,
            calls_left: 1,
        };
        assert!(!buf.drain(&mut out).unwrap());
        assert_eq!(buf.size(), 5);
        out.calls_left = 10;
        assert!(buf.drain(&mut out).unwrap());
        assert_eq!(out.accepted, b"+++MENU:n");
    }

    #[test]
    fn oversized_add_is_rejected_whole() {
        let mut buf = IOBuf::new();
        let big = vec![b'x'; IOBUF_SIZE + 1];
        assert!(matches!(buf.add_data(&big), Err(SendError::Full)));
        assert!(buf.empty());
    }
}
