//! Line-oriented byte transport shared by both serial devices.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};

use crate::error::DeviceResult;

/// A bidirectional byte link to a device.
pub trait Transport: Read + Write {
    /// Drop any bytes received but not yet read.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Open a serial port with a read timeout.
pub fn open_serial(
    port: &str,
    baud_rate: u32,
    timeout: Duration,
) -> DeviceResult<Box<dyn SerialPort>> {
    let link = serialport::new(port, baud_rate).timeout(timeout).open()?;
    tracing::debug!(port, baud_rate, "serial port opened");
    Ok(link)
}

/// Whether an I/O error means "no answer in time" rather than a dead link.
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Buffered newline-terminated request/response channel.
pub struct LineChannel<T: Transport> {
    reader: BufReader<T>,
}

impl<T: Transport> LineChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            reader: BufReader::new(transport),
        }
    }

    /// Write raw bytes and flush.
    pub fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let link = self.reader.get_mut();
        link.write_all(bytes)?;
        link.flush()
    }

    /// Write `line` followed by `\n`.
    pub fn send_line(&mut self, line: &str) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.send(&bytes)
    }

    /// Read one line, stripped of surrounding whitespace.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected.
    pub fn read_line(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "link closed by device",
            ));
        }
        Ok(String::from_utf8_lossy(&buf).trim().to_string())
    }

    pub fn into_inner(self) -> T {
        self.reader.into_inner()
    }

    /// Drop buffered and pending input.
    pub fn discard_input(&mut self) -> io::Result<()> {
        let buffered = self.reader.buffer().len();
        self.reader.consume(buffered);
        self.reader.get_mut().discard_input()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;

    type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>>>;

    /// In-memory device: every write is answered by `responder`.
    /// Reading with nothing pending times out.
    pub(crate) struct MockLine {
        pub(crate) written: Vec<Vec<u8>>,
        pending: VecDeque<u8>,
        responder: Responder,
        pub(crate) broken: bool,
    }

    impl MockLine {
        pub(crate) fn new(responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + 'static) -> Self {
            Self {
                written: Vec::new(),
                pending: VecDeque::new(),
                responder: Box::new(responder),
                broken: false,
            }
        }

        pub(crate) fn written_lines(&self) -> Vec<String> {
            self.written
                .iter()
                .map(|w| String::from_utf8_lossy(w).trim_end().to_string())
                .collect()
        }
    }

    impl Read for MockLine {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.broken {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            if self.pending.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no reply"));
            }
            let n = buf.len().min(self.pending.len());
            for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    impl Write for MockLine {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.broken {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.written.push(buf.to_vec());
            if let Some(reply) = (self.responder)(buf) {
                self.pending.extend(reply);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for MockLine {
        fn discard_input(&mut self) -> io::Result<()> {
            self.pending.clear();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockLine;
    use super::*;

    #[test]
    fn request_response_line() {
        let line = MockLine::new(|req| (req == b"PING\n").then(|| b"PONG\r\n".to_vec()));
        let mut channel = LineChannel::new(line);

        channel.send_line("PING").unwrap();
        assert_eq!(channel.read_line().unwrap(), "PONG");
    }

    #[test]
    fn silent_device_times_out() {
        let mut channel = LineChannel::new(MockLine::new(|_| None));
        channel.send(b"r").unwrap();
        let err = channel.read_line().unwrap_err();
        assert!(is_timeout(&err));
    }

    #[test]
    fn discard_drops_stale_reply() {
        let mut channel = LineChannel::new(MockLine::new(|_| Some(b"stale\n".to_vec())));
        channel.send(b"x").unwrap();
        channel.discard_input().unwrap();
        assert!(is_timeout(&channel.read_line().unwrap_err()));
    }
}
