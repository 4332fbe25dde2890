use std::sync::{Arc, Mutex};

use tilecast_protocol::{MAX_FRAME_SAMPLES, Tile};

/// Channels per pixel when none are given: RGBA.
pub const DEFAULT_CHANNELS: usize = 4;

/// Value every pixel takes when an image is opened: opaque black.
const CLEAR_PIXEL: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Framebuffer shared between the receive loop and readers.
pub type SharedFrameBuffer = Arc<Mutex<FrameBuffer>>;

/// Wraps a buffer for sharing across tasks.
pub fn shared(buffer: FrameBuffer) -> SharedFrameBuffer {
    Arc::new(Mutex::new(buffer))
}

/// How many pixels of a tile landed inside the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileStats {
    pub written: u64,
    pub skipped: u64,
}

/// Dense `width x height` grid of float pixels, row 0 at the top.
///
/// The channel count is fixed at construction. Dimensions change only
/// through [`init`](Self::init); tiles that extend past the edges are
/// clipped.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<f32>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// An empty RGBA buffer.
    pub fn new() -> Self {
        Self::with_channels(DEFAULT_CHANNELS)
    }

    /// An empty buffer with `channels` samples per pixel.
    ///
    /// # Panics
    ///
    /// Panics if `channels` is zero.
    pub fn with_channels(channels: usize) -> Self {
        assert!(channels > 0, "FrameBuffer channels must be > 0");
        Self {
            width: 0,
            height: 0,
            channels,
            data: Vec::new(),
        }
    }

    /// Whether a `width x height` image stays within [`MAX_FRAME_SAMPLES`].
    pub fn fits(&self, width: u32, height: u32) -> bool {
        u64::from(width)
            .checked_mul(u64::from(height))
            .and_then(|pixels| pixels.checked_mul(self.channels as u64))
            .is_some_and(|samples| samples <= MAX_FRAME_SAMPLES)
    }

    /// Resizes to `width x height` and resets every pixel to opaque black.
    ///
    /// Previous contents are discarded even when the size is unchanged.
    /// Callers receiving sizes from the network check [`fits`](Self::fits)
    /// first.
    pub fn init(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;

        let clear: Vec<f32> = (0..self.channels)
            .map(|c| CLEAR_PIXEL.get(c).copied().unwrap_or(0.0))
            .collect();
        self.data = clear.repeat(width as usize * height as usize);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether no image has been opened, or it has no pixels.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples of the pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[f32]> {
        let offset = self.offset(x, y)?;
        self.data.get(offset..offset + self.channels)
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> Option<&mut [f32]> {
        let offset = self.offset(x, y)?;
        self.data.get_mut(offset..offset + self.channels)
    }

    /// RGBA at `(x, y)`; transparent black outside the buffer.
    ///
    /// Buffers with fewer than four channels fill the rest from opaque black.
    pub fn sample_rgba(&self, x: i64, y: i64) -> [f32; 4] {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return [0.0; 4];
        };
        let Some(pixel) = self.pixel(x, y) else {
            return [0.0; 4];
        };
        let mut rgba = CLEAR_PIXEL;
        for (dst, src) in rgba.iter_mut().zip(pixel) {
            *dst = *src;
        }
        rgba
    }

    /// All samples of row `y`, left to right.
    pub fn row(&self, y: u32) -> Option<&[f32]> {
        if y >= self.height {
            return None;
        }
        let stride = self.width as usize * self.channels;
        let start = y as usize * stride;
        self.data.get(start..start + stride)
    }

    /// The whole buffer, row-major from the top row.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Copies a tile into the buffer, flipping its vertical axis.
    ///
    /// Tile pixel `(tx, ty)` lands at `(tx + x, height - (ty + y + 1))`.
    /// The first `min(samples_per_pixel, channels)` samples are copied;
    /// the rest of the destination pixel is left alone. Destinations
    /// outside the buffer are counted as skipped.
    pub fn write_tile(&mut self, tile: &Tile) -> TileStats {
        let header = &tile.header;
        let spp = header.samples_per_pixel as usize;
        let copy = spp.min(self.channels);
        let width = i64::from(self.width);
        let height = i64::from(self.height);

        let mut stats = TileStats::default();
        for ty in 0..header.height {
            let dy = height - (i64::from(ty) + i64::from(header.y) + 1);
            for tx in 0..header.width {
                let dx = i64::from(tx) + i64::from(header.x);
                if dx < 0 || dx >= width || dy < 0 || dy >= height {
                    stats.skipped += 1;
                    continue;
                }
                let (Some(src), Some(dst)) =
                    (tile.pixel(tx, ty), self.pixel_mut(dx as u32, dy as u32))
                else {
                    stats.skipped += 1;
                    continue;
                };
                dst[..copy].copy_from_slice(&src[..copy]);
                stats.written += 1;
            }
        }
        stats
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * self.channels)
    }
}
