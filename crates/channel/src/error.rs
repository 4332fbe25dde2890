//! Error types for the tile channel.

use std::time::Duration;

use tilecast_protocol::ProtocolError;

use crate::ports::PortRange;

/// Errors produced by the sender and the listener.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to bind {range}: {source}")]
    Bind {
        range: PortRange,
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[from] ProtocolError),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("listener is not bound")]
    NotBound,
}

impl From<std::io::Error> for ChannelError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(ProtocolError::Io(e))
    }
}

impl ChannelError {
    /// Whether only the current exchange failed and the accept loop may
    /// carry on with the next connection.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_timeout_are_recoverable() {
        let eof = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        assert!(ChannelError::from(eof).is_recoverable());
        assert!(ChannelError::Timeout(Duration::from_secs(1)).is_recoverable());
        assert!(ChannelError::Transport(ProtocolError::UnknownKind(4)).is_recoverable());
    }

    #[test]
    fn bind_and_state_errors_are_fatal() {
        let err = ChannelError::Bind {
            range: PortRange::single(9201),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        assert!(!err.is_recoverable());
        assert!(!ChannelError::NotBound.is_recoverable());
        assert!(!ChannelError::InvalidState("no image".into()).is_recoverable());
    }

    #[test]
    fn bind_error_names_range() {
        let err = ChannelError::Bind {
            range: PortRange::search(9201),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        let text = err.to_string();
        assert!(text.contains("9201-9299"), "{text}");
    }
}
