use crate::envelope::ImageId;

/// Port the consumer listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 9201;

/// Number of candidate ports scanned by a port search, starting at the
/// requested port (half-open range `[port, port + PORT_SEARCH_SPAN)`).
pub const PORT_SEARCH_SPAN: u16 = 99;

/// Image id handed out for every OpenImage request.
///
/// A listener tracks a single in-flight image, so the id is fixed.
pub const ASSIGNED_IMAGE_ID: ImageId = ImageId(1);

/// Upper bound on the float samples carried by one Pixels message
/// (64 Mi samples, 256 MiB of payload).
pub const MAX_TILE_SAMPLES: u64 = 64 * 1024 * 1024;

/// Upper bound on `width * height` announced by an OpenImage message.
pub const MAX_IMAGE_PIXELS: u64 = MAX_TILE_SAMPLES;

/// Upper bound on `width * height * channels` held by a consumer's
/// framebuffer; an RGBA buffer tops out at 4096 x 4096.
pub const MAX_FRAME_SAMPLES: u64 = MAX_TILE_SAMPLES;

/// Integer tag that leads every message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    OpenImage,
    Pixels,
    CloseImage,
    Quit,
}

impl MessageKind {
    /// Wire value of the tag.
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::OpenImage => 0,
            Self::Pixels => 1,
            Self::CloseImage => 2,
            Self::Quit => 9,
        }
    }

    /// Maps a wire value back to a kind, `None` for unknown tags.
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::OpenImage),
            1 => Some(Self::Pixels),
            2 => Some(Self::CloseImage),
            9 => Some(Self::Quit),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenImage => write!(f, "open_image"),
            Self::Pixels => write!(f, "pixels"),
            Self::CloseImage => write!(f, "close_image"),
            Self::Quit => write!(f, "quit"),
        }
    }
}
