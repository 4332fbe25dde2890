//! Binary wire format.
//!
//! Every field is a 4-byte integer or float in the host's native byte
//! order; both ends are expected to run on compatible architectures.
//!
//! ```text
//! OPEN IMAGE (0):
//!   client -> server: [i32 kind=0]
//!   server -> client: [i32 image_id]
//!   client -> server: [i32 width][i32 height]
//!
//! PIXELS (1), client -> server:
//!   [i32 kind=1][i32 image_id][i32 x][i32 y][i32 width][i32 height][i32 spp]
//!   [width * height * spp x f32 samples, interleaved, row-major]
//!
//! CLOSE IMAGE (2), client -> server: [i32 kind=2][i32 image_id]
//!
//! QUIT (9), client -> server: [i32 kind=9]
//! ```

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::constants::{MAX_IMAGE_PIXELS, MessageKind};
use crate::envelope::{ImageId, Message, Tile, TileHeader, check_samples};
use crate::error::ProtocolError;

/// Samples converted per write/read call when streaming a payload.
const SAMPLE_CHUNK: usize = 16 * 1024;

async fn write_i32<W: AsyncWrite + Unpin>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_ne_bytes()).await
}

async fn read_i32<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).await?;
    Ok(i32::from_ne_bytes(buf))
}

async fn write_u32<W: AsyncWrite + Unpin>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_ne_bytes()).await
}

async fn read_u32<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).await?;
    Ok(u32::from_ne_bytes(buf))
}

/// Writes the leading message tag.
pub async fn write_kind<W: AsyncWrite + Unpin>(
    writer: &mut W,
    kind: MessageKind,
) -> Result<(), ProtocolError> {
    write_i32(writer, kind.as_i32()).await?;
    Ok(())
}

/// Reads the leading message tag.
pub async fn read_kind<R: AsyncRead + Unpin>(reader: &mut R) -> Result<MessageKind, ProtocolError> {
    let value = read_i32(reader).await?;
    MessageKind::from_i32(value).ok_or(ProtocolError::UnknownKind(value))
}

/// Producer half of the OpenImage exchange.
///
/// Writes the tag, waits for the image id assigned by the consumer, then
/// sends the image extent.
pub async fn request_image<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    width: u32,
    height: u32,
) -> Result<ImageId, ProtocolError> {
    write_kind(stream, MessageKind::OpenImage).await?;
    stream.flush().await?;

    let image_id = ImageId(read_i32(stream).await?);

    write_u32(stream, width).await?;
    write_u32(stream, height).await?;
    stream.flush().await?;
    Ok(image_id)
}

/// Writes a complete Pixels message.
///
/// Fails without writing anything if `samples` does not match `header`.
pub async fn write_pixels<W: AsyncWrite + Unpin>(
    writer: &mut W,
    header: &TileHeader,
    samples: &[f32],
) -> Result<(), ProtocolError> {
    check_samples(header, samples)?;

    write_kind(writer, MessageKind::Pixels).await?;
    write_i32(writer, header.image_id.0).await?;
    write_i32(writer, header.x).await?;
    write_i32(writer, header.y).await?;
    write_u32(writer, header.width).await?;
    write_u32(writer, header.height).await?;
    write_u32(writer, header.samples_per_pixel).await?;
    write_samples(writer, samples).await?;
    writer.flush().await?;
    Ok(())
}

/// Writes a CloseImage message.
pub async fn write_close_image<W: AsyncWrite + Unpin>(
    writer: &mut W,
    image_id: ImageId,
) -> Result<(), ProtocolError> {
    write_kind(writer, MessageKind::CloseImage).await?;
    write_i32(writer, image_id.0).await?;
    writer.flush().await?;
    Ok(())
}

/// Writes a Quit message.
pub async fn write_quit<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<(), ProtocolError> {
    write_kind(writer, MessageKind::Quit).await?;
    writer.flush().await?;
    Ok(())
}

/// Consumer half of an exchange: reads exactly one message.
///
/// OpenImage is answered with `assign` before its extent is read. A peer
/// that disconnects mid-message yields an I/O error and no message.
pub async fn read_message<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    assign: ImageId,
) -> Result<Message, ProtocolError> {
    match read_kind(stream).await? {
        MessageKind::OpenImage => {
            write_i32(stream, assign.0).await?;
            stream.flush().await?;

            let width = read_u32(stream).await?;
            let height = read_u32(stream).await?;
            if width as u64 * height as u64 > MAX_IMAGE_PIXELS {
                return Err(ProtocolError::ImageTooLarge { width, height });
            }
            Ok(Message::OpenImage { width, height })
        }
        MessageKind::Pixels => Ok(Message::Pixels(read_tile(stream).await?)),
        MessageKind::CloseImage => {
            let image_id = ImageId(read_i32(stream).await?);
            Ok(Message::CloseImage { image_id })
        }
        MessageKind::Quit => Ok(Message::Quit),
    }
}

/// Reads the body of a Pixels message (everything after the tag).
pub async fn read_tile<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Tile, ProtocolError> {
    let header = TileHeader {
        image_id: ImageId(read_i32(reader).await?),
        x: read_i32(reader).await?,
        y: read_i32(reader).await?,
        width: read_u32(reader).await?,
        height: read_u32(reader).await?,
        samples_per_pixel: read_u32(reader).await?,
    };
    let count = header.validate()?;
    let samples = read_samples(reader, count).await?;
    Ok(Tile { header, samples })
}

async fn write_samples<W: AsyncWrite + Unpin>(writer: &mut W, samples: &[f32]) -> io::Result<()> {
    let mut buf = Vec::with_capacity(SAMPLE_CHUNK.min(samples.len()) * 4);
    for chunk in samples.chunks(SAMPLE_CHUNK) {
        buf.clear();
        for sample in chunk {
            buf.extend_from_slice(&sample.to_ne_bytes());
        }
        writer.write_all(&buf).await?;
    }
    Ok(())
}

async fn read_samples<R: AsyncRead + Unpin>(reader: &mut R, count: usize) -> io::Result<Vec<f32>> {
    let mut samples = Vec::with_capacity(count);
    let mut buf = vec![0u8; SAMPLE_CHUNK.min(count) * 4];
    let mut remaining = count;

    while remaining > 0 {
        let n = remaining.min(SAMPLE_CHUNK);
        let bytes = &mut buf[..n * 4];
        reader.read_exact(bytes).await?;
        samples.extend(
            bytes
                .chunks_exact(4)
                .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
        );
        remaining -= n;
    }

    Ok(samples)
}
