use crate::constants::{MAX_TILE_SAMPLES, MessageKind};
use crate::error::ProtocolError;

/// Handle identifying the image a Pixels or CloseImage message belongs to.
///
/// Assigned by the listener in reply to OpenImage and echoed by the
/// producer afterwards. Negative values mean "not assigned".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub i32);

impl ImageId {
    /// Sentinel held by a producer before OpenImage succeeds.
    pub const UNSET: Self = Self(-1);

    /// Whether this id could have been returned by a listener.
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::UNSET
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Placement and layout of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileHeader {
    pub image_id: ImageId,
    /// Tile origin in image coordinates.
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Interleaved float channels per pixel.
    pub samples_per_pixel: u32,
}

impl TileHeader {
    /// Number of floats the payload must carry, `None` on overflow.
    pub fn sample_count(&self) -> Option<u64> {
        (self.width as u64)
            .checked_mul(self.height as u64)?
            .checked_mul(self.samples_per_pixel as u64)
    }

    /// Checks the header invariants and returns the payload length.
    pub fn validate(&self) -> Result<usize, ProtocolError> {
        if self.samples_per_pixel == 0 {
            return Err(ProtocolError::ZeroSamplesPerPixel);
        }
        match self.sample_count() {
            Some(samples) if samples <= MAX_TILE_SAMPLES => Ok(samples as usize),
            samples => Err(ProtocolError::TileTooLarge {
                samples: samples.unwrap_or(u64::MAX),
                max: MAX_TILE_SAMPLES,
            }),
        }
    }
}

/// A tile header together with its interleaved samples.
///
/// Samples are row-major; within a pixel the `samples_per_pixel` channels
/// are stored consecutively.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub header: TileHeader,
    pub samples: Vec<f32>,
}

impl Tile {
    /// Builds a tile, rejecting payloads whose length does not match the header.
    pub fn new(header: TileHeader, samples: Vec<f32>) -> Result<Self, ProtocolError> {
        check_samples(&header, &samples)?;
        Ok(Self { header, samples })
    }

    /// Samples of the pixel at tile-local `(tx, ty)`.
    pub fn pixel(&self, tx: u32, ty: u32) -> Option<&[f32]> {
        if tx >= self.header.width || ty >= self.header.height {
            return None;
        }
        let spp = self.header.samples_per_pixel as usize;
        let offset = (ty as usize * self.header.width as usize + tx as usize) * spp;
        self.samples.get(offset..offset + spp)
    }
}

/// Verifies that `samples` is exactly as long as `header` declares.
pub fn check_samples(header: &TileHeader, samples: &[f32]) -> Result<(), ProtocolError> {
    let expected = header.validate()?;
    if samples.len() != expected {
        return Err(ProtocolError::SampleCountMismatch {
            expected,
            got: samples.len(),
        });
    }
    Ok(())
}

/// One decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Start of a new image with its full extent.
    OpenImage { width: u32, height: u32 },
    /// One tile of pixel data.
    Pixels(Tile),
    /// The named image is complete.
    CloseImage { image_id: ImageId },
    /// Stop the consumer's accept loop.
    Quit,
}

impl Message {
    /// The wire tag of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::OpenImage { .. } => MessageKind::OpenImage,
            Self::Pixels(_) => MessageKind::Pixels,
            Self::CloseImage { .. } => MessageKind::CloseImage,
            Self::Quit => MessageKind::Quit,
        }
    }
}
