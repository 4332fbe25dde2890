//! Wire protocol for streaming rendered image tiles.
//!
//! A producer opens one TCP connection per message and writes a single
//! [`Message`]; the consumer decodes it and closes the connection. The
//! byte layout of every message kind is described in [`wire`].

pub mod constants;
pub mod envelope;
pub mod error;
pub mod wire;

// Re-export primary types for convenience.
pub use constants::{
    ASSIGNED_IMAGE_ID, DEFAULT_PORT, MAX_FRAME_SAMPLES, MAX_IMAGE_PIXELS, MAX_TILE_SAMPLES,
    MessageKind, PORT_SEARCH_SPAN,
};
pub use envelope::{ImageId, Message, Tile, TileHeader};
pub use error::ProtocolError;
