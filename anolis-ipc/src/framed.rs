// Copyright 2026-Present Anolis Project.
// SPDX-License-Identifier: Apache-2.0

use crate::error::IpcError;
use crate::platform::PollRead;
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Hard cap on one ADPP frame payload. Anything larger is a protocol error
/// on both the write and the read path.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Length-prefixed framing over one child's stdio: u32 little-endian length,
/// then exactly that many payload bytes. The framing is byte-exact; nothing
/// here assumes self-delimiting payloads, and at most one frame is buffered
/// in flight.
#[derive(Debug)]
pub struct FramedChannel<R, W> {
    reader: R,
    writer: Option<W>,
}

/// The channel as wired to a spawned provider.
pub type ChildChannel = FramedChannel<std::process::ChildStdout, std::process::ChildStdin>;

impl<R: PollRead, W: Write> FramedChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        FramedChannel {
            reader,
            writer: Some(writer),
        }
    }

    /// Writes one frame, retrying partial writes, honoring `timeout` across
    /// retries. Rejects payloads over [`MAX_FRAME_SIZE`] without touching
    /// the wire.
    pub fn write_frame(&mut self, payload: &[u8], timeout: Duration) -> Result<(), IpcError> {
        if payload.len() > MAX_FRAME_SIZE {
            return Err(IpcError::FrameTooLarge(payload.len()));
        }
        let deadline = Instant::now() + timeout;
        let writer = self.writer.as_mut().ok_or_else(|| {
            IpcError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "stdin already closed",
            ))
        })?;
        let prefix = (payload.len() as u32).to_le_bytes();
        write_all_deadline(writer, &prefix, deadline, timeout)?;
        write_all_deadline(writer, payload, deadline, timeout)?;
        writer.flush()?;
        Ok(())
    }

    /// Reads one frame under a total deadline. EOF on the first prefix byte
    /// is a clean close ([`IpcError::ClosedByPeer`]); EOF anywhere else is a
    /// protocol violation.
    pub fn read_frame(&mut self, timeout: Duration) -> Result<Vec<u8>, IpcError> {
        let deadline = Instant::now() + timeout;

        let mut prefix = [0u8; 4];
        self.read_exact_deadline(&mut prefix, deadline, timeout, true)?;
        let len = u32::from_le_bytes(prefix) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(IpcError::FrameTooLarge(len));
        }

        let mut payload = vec![0u8; len];
        self.read_exact_deadline(&mut payload, deadline, timeout, false)?;
        Ok(payload)
    }

    /// Blocks up to `timeout` for at least one readable byte without
    /// consuming it.
    pub fn wait_for_data(&mut self, timeout: Duration) -> Result<bool, IpcError> {
        Ok(self.reader.wait_readable(timeout)?)
    }

    /// Half-closes the write side, signalling EOF to the child.
    pub fn close_stdin(&mut self) {
        self.writer = None;
    }

    fn read_exact_deadline(
        &mut self,
        buf: &mut [u8],
        deadline: Instant,
        timeout: Duration,
        eof_is_clean_close: bool,
    ) -> Result<(), IpcError> {
        let mut filled = 0;
        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.reader.wait_readable(remaining)? {
                return Err(IpcError::Timeout(timeout));
            }
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => {
                    return if eof_is_clean_close && filled == 0 {
                        Err(IpcError::ClosedByPeer)
                    } else {
                        Err(IpcError::Protocol("unexpected EOF inside frame".into()))
                    };
                }
                Ok(n) => filled += n,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                    ) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn write_all_deadline<W: Write>(
    writer: &mut W,
    mut buf: &[u8],
    deadline: Instant,
    timeout: Duration,
) -> Result<(), IpcError> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => {
                return Err(IpcError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "pipe accepted no bytes",
                )))
            }
            Ok(n) => buf = &buf[n..],
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) =>
            {
                if Instant::now() >= deadline {
                    return Err(IpcError::Timeout(timeout));
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    const TIMEOUT: Duration = Duration::from_millis(200);

    /// In-memory stand-in for the child's stdout.
    struct ScriptedReader {
        data: io::Cursor<Vec<u8>>,
    }

    impl ScriptedReader {
        fn new(data: Vec<u8>) -> Self {
            ScriptedReader {
                data: io::Cursor::new(data),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }
    }

    impl PollRead for ScriptedReader {
        fn wait_readable(&mut self, _timeout: Duration) -> io::Result<bool> {
            // Data is always "ready"; an exhausted cursor reads as EOF.
            Ok(true)
        }
    }

    /// A reader that never has data, for timeout tests.
    struct SilentReader;

    impl Read for SilentReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "no data"))
        }
    }

    impl PollRead for SilentReader {
        fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
            std::thread::sleep(timeout);
            Ok(false)
        }
    }

    fn frame_bytes(payload: &[u8]) -> Vec<u8> {
        let mut channel = FramedChannel::new(ScriptedReader::new(vec![]), Vec::new());
        channel.write_frame(payload, TIMEOUT).unwrap();
        channel.writer.unwrap()
    }

    #[test]
    fn roundtrip_exact_payload() {
        let payload = b"hello provider".to_vec();
        let wire = frame_bytes(&payload);
        assert_eq!(&wire[..4], &(payload.len() as u32).to_le_bytes());

        let mut channel = FramedChannel::new(ScriptedReader::new(wire), Vec::new());
        assert_eq!(channel.read_frame(TIMEOUT).unwrap(), payload);
    }

    #[test]
    fn roundtrip_empty_payload() {
        let wire = frame_bytes(b"");
        let mut channel = FramedChannel::new(ScriptedReader::new(wire), Vec::new());
        assert_eq!(channel.read_frame(TIMEOUT).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn max_frame_size_is_inclusive() {
        let payload = vec![0xa5u8; MAX_FRAME_SIZE];
        let wire = frame_bytes(&payload);
        let mut channel = FramedChannel::new(ScriptedReader::new(wire), Vec::new());
        assert_eq!(channel.read_frame(TIMEOUT).unwrap().len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn write_rejects_oversized_frame() {
        let payload = vec![0u8; MAX_FRAME_SIZE + 1];
        let mut channel = FramedChannel::new(ScriptedReader::new(vec![]), Vec::new());
        let err = channel.write_frame(&payload, TIMEOUT).unwrap_err();
        assert!(matches!(err, IpcError::FrameTooLarge(_)));
        assert!(err.to_string().contains("Frame too large"));
        // Nothing reached the wire.
        assert!(channel.writer.unwrap().is_empty());
    }

    #[test]
    fn read_rejects_oversized_prefix() {
        let mut wire = ((MAX_FRAME_SIZE + 1) as u32).to_le_bytes().to_vec();
        wire.extend_from_slice(&[0u8; 16]);
        let mut channel = FramedChannel::new(ScriptedReader::new(wire), Vec::new());
        assert!(matches!(
            channel.read_frame(TIMEOUT),
            Err(IpcError::FrameTooLarge(_))
        ));
    }

    #[test]
    fn eof_at_frame_boundary_is_clean_close() {
        let mut channel = FramedChannel::new(ScriptedReader::new(vec![]), Vec::new());
        assert!(matches!(
            channel.read_frame(TIMEOUT),
            Err(IpcError::ClosedByPeer)
        ));
    }

    #[test]
    fn eof_inside_frame_is_protocol_error() {
        // Prefix says 8 bytes, only 3 arrive.
        let mut wire = 8u32.to_le_bytes().to_vec();
        wire.extend_from_slice(b"abc");
        let mut channel = FramedChannel::new(ScriptedReader::new(wire), Vec::new());
        assert!(matches!(
            channel.read_frame(TIMEOUT),
            Err(IpcError::Protocol(_))
        ));
    }

    #[test]
    fn read_times_out_without_data() {
        let mut channel = FramedChannel::new(SilentReader, Vec::new());
        let start = Instant::now();
        let err = channel.read_frame(Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, IpcError::Timeout(_)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn write_after_close_stdin_fails() {
        let mut channel = FramedChannel::new(ScriptedReader::new(vec![]), Vec::new());
        channel.close_stdin();
        assert!(channel.write_frame(b"x", TIMEOUT).is_err());
    }

    #[test]
    fn wait_for_data_reports_readability() {
        let mut channel = FramedChannel::new(ScriptedReader::new(vec![1]), Vec::new());
        assert!(channel.wait_for_data(TIMEOUT).unwrap());
    }
}
