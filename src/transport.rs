//! Byte transports
//!
//! One trait for every duplex byte stream the interfaces can sit on: serial
//! ports, USB CDC, stdin/stdout, files or an in-memory buffer.

use std::collections::VecDeque;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Duplex byte stream
pub trait Transport {
    /// Prepare the underlying stream (open port, set baud rate, ...)
    fn begin(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Number of bytes that can be read without blocking
    fn available(&mut self) -> Result<usize, TransportError>;

    /// Next input byte, `None` when nothing is available
    fn read(&mut self) -> Option<u8>;

    fn write(&mut self, byte: u8) -> Result<(), TransportError>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        for &byte in bytes {
            self.write(byte)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// In-memory transport: bytes pushed in are read back, writes are recorded
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for reading
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Everything written so far
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl Transport for MemoryTransport {
    fn available(&mut self) -> Result<usize, TransportError> {
        Ok(self.input.len())
    }

    fn read(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn write(&mut self, byte: u8) -> Result<(), TransportError> {
        self.output.push(byte);
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }
}

const READ_CHUNK: usize = 256;

/// Transport over a `std::io` reader/writer pair
///
/// `available` pulls one chunk from the reader when its queue is empty, so
/// it blocks on interactive streams. Use [`MemoryTransport`] fed from an
/// async reader when that matters.
pub struct StreamTransport<R, W> {
    reader: R,
    writer: W,
    queue: VecDeque<u8>,
    eof: bool,
}

impl<R: Read, W: Write> StreamTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            queue: VecDeque::new(),
            eof: false,
        }
    }

    /// True once the reader reported end of stream and the queue is drained
    pub fn is_finished(&self) -> bool {
        self.eof && self.queue.is_empty()
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: Read, W: Write> Transport for StreamTransport<R, W> {
    fn available(&mut self) -> Result<usize, TransportError> {
        if self.queue.is_empty() && !self.eof {
            let mut buf = [0u8; READ_CHUNK];
            let n = self.reader.read(&mut buf)?;
            if n == 0 {
                self.eof = true;
            }
            self.queue.extend(&buf[..n]);
        }
        Ok(self.queue.len())
    }

    fn read(&mut self) -> Option<u8> {
        self.queue.pop_front()
    }

    fn write(&mut self, byte: u8) -> Result<(), TransportError> {
        self.writer.write_all(&[byte])?;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        self.writer.flush()?;
        Ok(())
    }
}
