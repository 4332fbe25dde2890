use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{MutexGuard, PoisonError};

use tracing::{debug, warn};

use tilecast_protocol::{ImageId, Message};

use crate::buffer::{FrameBuffer, SharedFrameBuffer, TileStats, shared};

/// What applying one message did to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// The buffer was resized and cleared.
    Opened { width: u32, height: u32 },
    /// The announced image would exceed the buffer cap; nothing changed.
    Rejected { width: u32, height: u32 },
    /// A tile was copied in.
    TileWritten { stats: TileStats, generation: u32 },
    /// The producer finished the image. The buffer is untouched.
    Completed { image_id: ImageId, generation: u32 },
    /// The producer asked the receive loop to stop.
    Quit,
}

/// Applies decoded messages to a shared framebuffer.
///
/// Each message takes the buffer lock once, so readers see whole tiles.
/// The generation counter moves on every Pixels and CloseImage and wraps
/// on overflow; displays compare it to decide when to redraw.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: SharedFrameBuffer,
    generation: AtomicU32,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new(shared(FrameBuffer::new()))
    }
}

impl FrameAssembler {
    pub fn new(buffer: SharedFrameBuffer) -> Self {
        Self {
            buffer,
            generation: AtomicU32::new(0),
        }
    }

    /// Handle to the buffer this assembler writes into.
    pub fn buffer(&self) -> SharedFrameBuffer {
        self.buffer.clone()
    }

    /// Locks the buffer for reading.
    ///
    /// A panic while holding the lock leaves at worst a partially copied
    /// tile, so a poisoned lock is used as is.
    pub fn lock(&self) -> MutexGuard<'_, FrameBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn apply(&self, message: &Message) -> FrameEvent {
        match message {
            Message::OpenImage { width, height } => {
                let mut buffer = self.lock();
                if !buffer.fits(*width, *height) {
                    warn!(
                        width,
                        height,
                        channels = buffer.channels(),
                        "image too large; keeping current frame"
                    );
                    return FrameEvent::Rejected {
                        width: *width,
                        height: *height,
                    };
                }
                buffer.init(*width, *height);
                drop(buffer);
                debug!(width, height, "frame opened");
                FrameEvent::Opened {
                    width: *width,
                    height: *height,
                }
            }
            Message::Pixels(tile) => {
                let stats = self.lock().write_tile(tile);
                let generation = self.bump();
                if stats.skipped > 0 {
                    debug!(
                        x = tile.header.x,
                        y = tile.header.y,
                        skipped = stats.skipped,
                        "tile clipped"
                    );
                }
                FrameEvent::TileWritten { stats, generation }
            }
            Message::CloseImage { image_id } => {
                let generation = self.bump();
                debug!(%image_id, generation, "frame complete");
                FrameEvent::Completed {
                    image_id: *image_id,
                    generation,
                }
            }
            Message::Quit => FrameEvent::Quit,
        }
    }

    fn bump(&self) -> u32 {
        // fetch_add wraps on overflow.
        self.generation
            .fetch_add(1, Ordering::AcqRel)
            .wrapping_add(1)
    }

    #[cfg(test)]
    fn set_generation(&self, value: u32) {
        self.generation.store(value, Ordering::Release);
    }
}
