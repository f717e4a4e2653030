// Consumer-side adapter handing a StreamBuffer to an external decoder

use crate::buffer::StreamBuffer;
use riff_core::AudioError;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use symphonia::core::io::MediaSource;

/// Reader half of a stream buffer sink.
///
/// Returns `WouldBlock` while the producer is behind and `Ok(0)` once the
/// stream is sealed and drained. Dropping the reader tells the producer
/// the consumer is gone.
pub struct StreamReader {
    buffer: Arc<StreamBuffer>,
}

impl StreamReader {
    pub fn new(buffer: Arc<StreamBuffer>) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &Arc<StreamBuffer> {
        &self.buffer
    }
}

impl Read for StreamReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        // Never ask for more than is buffered, or a caller buffer larger
        // than the ring would wait forever
        let ready = self.buffer.available_bytes();
        let want = if ready == 0 { buf.len() } else { buf.len().min(ready) };
        match self.buffer.read(want) {
            Ok(data) => {
                buf[..data.len()].copy_from_slice(&data);
                Ok(data.len())
            }
            Err(AudioError::BufferEmpty) => Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "Waiting for more data",
            )),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e.to_string())),
        }
    }
}

impl Seek for StreamReader {
    fn seek(&mut self, _pos: SeekFrom) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Seeking is not supported on streamed audio",
        ))
    }
}

impl MediaSource for StreamReader {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        None
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        self.buffer.close_consumer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_would_block_then_eof() {
        let buffer = Arc::new(StreamBuffer::new(4, 2, 0).unwrap());
        let mut reader = StreamReader::new(buffer.clone());
        let mut buf = [0u8; 4];

        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

        buffer.write(b"abcdef").unwrap();
        buffer.seal();
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_large_reads_do_not_wait_for_a_full_request() {
        let buffer = Arc::new(StreamBuffer::new(4, 2, 0).unwrap());
        let mut reader = StreamReader::new(buffer.clone());
        let mut buf = [0u8; 64];

        buffer.write(b"abcdefgh").unwrap();
        assert_eq!(reader.read(&mut buf).unwrap(), 8);
        assert_eq!(&buf[..8], b"abcdefgh");

        buffer.write(b"ij").unwrap();
        buffer.seal();
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_not_seekable() {
        let buffer = Arc::new(StreamBuffer::new(4, 2, 0).unwrap());
        let mut reader = StreamReader::new(buffer);
        assert!(!reader.is_seekable());
        assert_eq!(reader.byte_len(), None);
        assert!(reader.seek(SeekFrom::Start(0)).is_err());
    }

    #[test]
    fn test_drop_closes_consumer() {
        let buffer = Arc::new(StreamBuffer::new(4, 2, 0).unwrap());
        drop(StreamReader::new(buffer.clone()));
        assert!(buffer.is_consumer_closed());
    }
}
