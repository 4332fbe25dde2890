//! One-shot TCP transport for tile streaming.
//!
//! Every message travels over its own connection: the [`Sender`] connects,
//! writes one message and closes; the [`Listener`] accepts, decodes one
//! message and closes. There is no persistent session, so a failed
//! exchange never affects the next one.
//!
//! # Wire format
//!
//! See [`tilecast_protocol::wire`] for the binary layout.

pub mod error;
pub mod listener;
pub mod ports;
pub mod sender;

pub use error::ChannelError;
pub use listener::{Listener, ListenerConfig, Session};
pub use ports::PortRange;
pub use sender::{Sender, SenderConfig};

use std::time::Duration;

/// TCP read/write buffer size (256 KB).
pub const TCP_BUFFER_SIZE: usize = 256 * 1024;

/// Default timeout for the TCP connection attempt.
pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
