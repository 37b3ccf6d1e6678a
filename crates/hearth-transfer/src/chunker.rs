//! Fixed-size chunking and reassembly of transferred files.
//!
//! Files stream as binary frames of at most [`CHUNK_SIZE`] bytes, strictly
//! sequential (the completion of one send triggers the next read), followed
//! by a literal text frame carrying [`END_OF_STREAM`]. The receiver
//! accumulates binary frames in arrival order and assembles them into one
//! buffer when the sentinel arrives.

/// Chunk size for streamed files.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Text frame marking the end of a streamed file.
pub const END_OF_STREAM: &str = "EOF";

/// One data-channel frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A binary chunk of file content.
    Binary(Vec<u8>),
    /// A UTF-8 text frame; only [`END_OF_STREAM`] is meaningful.
    Text(String),
}

impl Frame {
    /// Whether this is the end-of-stream sentinel.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::Text(text) if text == END_OF_STREAM)
    }
}

/// Sequential reader producing the frame sequence for one file.
#[derive(Debug)]
pub struct Chunker {
    data: Vec<u8>,
    offset: usize,
    sentinel_sent: bool,
}

impl Chunker {
    /// A chunker over the whole file content.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            offset: 0,
            sentinel_sent: false,
        }
    }

    /// The next frame to send: binary chunks in order, then the sentinel,
    /// then `None`.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.offset < self.data.len() {
            let end = usize::min(self.offset + CHUNK_SIZE, self.data.len());
            let chunk = self.data[self.offset..end].to_vec();
            self.offset = end;
            return Some(Frame::Binary(chunk));
        }
        if self.sentinel_sent {
            return None;
        }
        self.sentinel_sent = true;
        Some(Frame::Text(END_OF_STREAM.to_owned()))
    }
}

/// Receiver-side accumulator.
#[derive(Debug, Default)]
pub struct Assembler {
    received: Vec<u8>,
}

impl Assembler {
    /// An empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.received.len()
    }

    /// Whether nothing has been received yet.
    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    /// Feed one frame. Returns the assembled file once the end-of-stream
    /// sentinel arrives; unknown text frames are ignored.
    pub fn push(&mut self, frame: Frame) -> Option<Vec<u8>> {
        match frame {
            Frame::Binary(chunk) => {
                self.received.extend_from_slice(&chunk);
                None
            }
            Frame::Text(text) if text == END_OF_STREAM => {
                Some(std::mem::take(&mut self.received))
            }
            Frame::Text(_) => None,
        }
    }
}
