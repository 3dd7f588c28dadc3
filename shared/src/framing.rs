//! Length-prefixed framing shared by both directions of the connection.
//!
//! Every frame is a 2-byte big-endian payload length followed by exactly that
//! many payload bytes. This is the layout Java's `DataOutputStream::writeUTF`
//! produces, which is what the server reads and writes.

use std::io::{self, ErrorKind, Read, Write};
use thiserror::Error;

pub const LENGTH_PREFIX_LEN: usize = 2;
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("payload of {0} bytes exceeds the {} byte frame limit", MAX_PAYLOAD_LEN)]
    PayloadTooLarge(usize),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("stream ended after {received} of {} length-prefix bytes", LENGTH_PREFIX_LEN)]
    ShortRead { received: usize },

    #[error("stream ended after {received} of {expected} payload bytes")]
    IncompleteFrame { expected: usize, received: usize },

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// True when the error means the peer is gone and no further frame can arrive.
    pub fn is_peer_closed(&self) -> bool {
        matches!(
            self,
            FrameError::ConnectionClosed
                | FrameError::ShortRead { .. }
                | FrameError::IncompleteFrame { .. }
        )
    }
}

/// Prefixes `payload` with its length.
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Writes one frame with a single `write_all` so prefix and payload leave together.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let frame = encode(payload)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Blocks until one whole frame has been read and returns its payload.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    match fill(reader, &mut prefix)? {
        0 => return Err(FrameError::ConnectionClosed),
        LENGTH_PREFIX_LEN => {}
        received => return Err(FrameError::ShortRead { received }),
    }

    let expected = u16::from_be_bytes(prefix) as usize;
    let mut payload = vec![0u8; expected];
    let received = fill(reader, &mut payload)?;
    if received < expected {
        return Err(FrameError::IncompleteFrame { expected, received });
    }

    Ok(payload)
}

// Reads until `buf` is full or the stream ends, retrying short reads and EINTR.
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per read, and an EINTR before each chunk.
    struct TrickleReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
        interrupt_next: bool,
    }

    impl TrickleReader {
        fn new(data: Vec<u8>, chunk: usize) -> Self {
            Self {
                data,
                pos: 0,
                chunk,
                interrupt_next: true,
            }
        }
    }

    impl Read for TrickleReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupt_next {
                self.interrupt_next = false;
                return Err(io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            self.interrupt_next = true;

            let remaining = self.data.len() - self.pos;
            let n = remaining.min(self.chunk).min(buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_encode_prefix_is_big_endian() {
        let frame = encode(&[0xAA; 258]).unwrap();
        assert_eq!(&frame[..2], &[0x01, 0x02]);
        assert_eq!(frame.len(), 260);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = vec![b'a'; MAX_PAYLOAD_LEN + 1];
        match encode(&payload) {
            Err(FrameError::PayloadTooLarge(len)) => assert_eq!(len, MAX_PAYLOAD_LEN + 1),
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_roundtrip_preserves_payload() {
        for len in [0usize, 1, 2, 255, 256, 4096, MAX_PAYLOAD_LEN] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let frame = encode(&payload).unwrap();
            let decoded = read_frame(&mut Cursor::new(frame)).unwrap();
            assert_eq!(decoded, payload, "length {}", len);
        }
    }

    #[test]
    fn test_read_frame_survives_partial_reads_and_eintr() {
        let payload = br#"{"tipo":"MOVIMIENTO","x":1.0}"#.to_vec();
        let mut reader = TrickleReader::new(encode(&payload).unwrap(), 3);
        assert_eq!(read_frame(&mut reader).unwrap(), payload);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut wire = encode(b"first").unwrap();
        wire.extend(encode(b"second").unwrap());
        let mut cursor = Cursor::new(wire);

        assert_eq!(read_frame(&mut cursor).unwrap(), b"first");
        assert_eq!(read_frame(&mut cursor).unwrap(), b"second");
        assert!(matches!(
            read_frame(&mut cursor),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_empty_stream_is_connection_closed() {
        let err = read_frame(&mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert!(err.is_peer_closed());
    }

    #[test]
    fn test_single_prefix_byte_is_short_read() {
        let err = read_frame(&mut Cursor::new(vec![0x00])).unwrap_err();
        assert!(matches!(err, FrameError::ShortRead { received: 1 }));
        assert!(err.is_peer_closed());
    }

    #[test]
    fn test_truncated_payload_is_incomplete_frame() {
        let mut frame = encode(b"0123456789").unwrap();
        frame.truncate(2 + 4);
        match read_frame(&mut Cursor::new(frame)) {
            Err(FrameError::IncompleteFrame { expected, received }) => {
                assert_eq!(expected, 10);
                assert_eq!(received, 4);
            }
            other => panic!("expected IncompleteFrame, got {:?}", other),
        }
    }

    #[test]
    fn test_newlines_do_not_split_frames() {
        let payload = b"line one\nline two\n".to_vec();
        let decoded = read_frame(&mut Cursor::new(encode(&payload).unwrap())).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_write_frame_matches_encode() {
        let mut out = Vec::new();
        write_frame(&mut out, b"hola").unwrap();
        assert_eq!(out, encode(b"hola").unwrap());
    }

    #[test]
    fn test_io_error_is_not_peer_closed() {
        let err = FrameError::from(io::Error::new(ErrorKind::ConnectionReset, "reset"));
        assert!(!err.is_peer_closed());
    }
}
