//! Consumer-side framebuffer assembly.
//!
//! Decoded messages are applied to a [`FrameBuffer`] shared with the
//! display path. The buffer is resized only by OpenImage; every Pixels
//! message is copied in under one lock, flipping the tile's vertical axis
//! into the top-down buffer.

pub mod assembler;
pub mod buffer;
pub mod receive_loop;

pub use assembler::{FrameAssembler, FrameEvent};
pub use buffer::{DEFAULT_CHANNELS, FrameBuffer, SharedFrameBuffer, TileStats, shared};
pub use receive_loop::{LoopStats, run_receive_loop};
