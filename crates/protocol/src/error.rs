//! Error types for the wire codec.

/// Errors produced while encoding or decoding a message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown message kind: {0}")]
    UnknownKind(i32),

    #[error("tile declares zero samples per pixel")]
    ZeroSamplesPerPixel,

    #[error("tile too large: {samples} samples (max {max})")]
    TileTooLarge { samples: u64, max: u64 },

    #[error("image too large: {width}x{height}")]
    ImageTooLarge { width: u32, height: u32 },

    #[error("sample count mismatch: expected {expected}, got {got}")]
    SampleCountMismatch { expected: usize, got: usize },
}

impl ProtocolError {
    /// Whether the peer closed the connection before the message was complete.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }
}
