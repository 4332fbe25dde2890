//! Producer side of the channel.
//!
//! Each call opens a fresh TCP connection to the listener, performs one
//! exchange and closes the connection again.

use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::debug;

use tilecast_protocol::envelope::check_samples;
use tilecast_protocol::{DEFAULT_PORT, ImageId, TileHeader, wire};

use crate::error::ChannelError;
use crate::{TCP_BUFFER_SIZE, TCP_CONNECT_TIMEOUT};

/// Where and how the sender connects.
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Host name or address of the listener.
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: DEFAULT_PORT,
            connect_timeout: TCP_CONNECT_TIMEOUT,
        }
    }
}

/// Client for a tile listener.
///
/// Holds no connection between calls; it can be shared freely and used
/// from any task.
#[derive(Debug, Clone)]
pub struct Sender {
    config: SenderConfig,
}

impl Sender {
    pub fn new(config: SenderConfig) -> Self {
        Self { config }
    }

    /// A sender for a listener on `localhost:port` with default timeouts.
    pub fn to_port(port: u16) -> Self {
        Self::new(SenderConfig {
            port,
            ..SenderConfig::default()
        })
    }

    /// Port of the target listener.
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Announces a new image and returns the id assigned by the listener.
    ///
    /// `samples_per_pixel` is checked here but not transmitted; every
    /// Pixels message carries its own channel count.
    pub async fn open_image(
        &self,
        width: u32,
        height: u32,
        samples_per_pixel: u32,
    ) -> Result<ImageId, ChannelError> {
        if samples_per_pixel == 0 {
            return Err(ChannelError::InvalidState(
                "image must have at least one sample per pixel".into(),
            ));
        }

        let mut stream = self.connect().await?;
        let image_id = wire::request_image(&mut stream, width, height).await?;
        close(stream).await;

        if !image_id.is_valid() {
            return Err(ChannelError::InvalidState(format!(
                "listener assigned invalid image id {image_id}"
            )));
        }

        debug!(%image_id, width, height, samples_per_pixel, "image opened");
        Ok(image_id)
    }

    /// Sends one tile of interleaved samples.
    ///
    /// The image id and payload length are checked before connecting, so a
    /// rejected tile never reaches the listener.
    pub async fn send_pixels(
        &self,
        header: TileHeader,
        samples: &[f32],
    ) -> Result<(), ChannelError> {
        require_image(header.image_id)?;
        check_samples(&header, samples)
            .map_err(|e| ChannelError::InvalidState(format!("rejected tile: {e}")))?;

        let stream = self.connect().await?;
        let mut writer = BufWriter::with_capacity(TCP_BUFFER_SIZE, stream);
        wire::write_pixels(&mut writer, &header, samples).await?;
        close(writer.into_inner()).await;

        debug!(
            image_id = %header.image_id,
            x = header.x,
            y = header.y,
            width = header.width,
            height = header.height,
            "tile sent"
        );
        Ok(())
    }

    /// Tells the listener the image is complete. No acknowledgement is read.
    pub async fn close_image(&self, image_id: ImageId) -> Result<(), ChannelError> {
        require_image(image_id)?;

        let mut stream = self.connect().await?;
        wire::write_close_image(&mut stream, image_id).await?;
        close(stream).await;

        debug!(%image_id, "image closed");
        Ok(())
    }

    /// Unblocks the listener's accept loop.
    pub async fn quit(&self) -> Result<(), ChannelError> {
        let mut stream = self.connect().await?;
        wire::write_quit(&mut stream).await?;
        close(stream).await;

        debug!(port = self.config.port, "quit sent");
        Ok(())
    }

    /// Resolves the host and connects to the first address that accepts.
    async fn connect(&self) -> Result<TcpStream, ChannelError> {
        let host = self.config.host.as_str();
        let port = self.config.port;
        let limit = self.config.connect_timeout;

        match tokio::time::timeout(limit, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(ChannelError::Connect {
                addr: format!("{host}:{port}"),
                source,
            }),
            Err(_) => Err(ChannelError::Timeout(limit)),
        }
    }
}

fn require_image(image_id: ImageId) -> Result<(), ChannelError> {
    if image_id.is_valid() {
        Ok(())
    } else {
        Err(ChannelError::InvalidState(format!(
            "image id {image_id} is not valid; open an image first"
        )))
    }
}

/// Half-closes the stream so the listener sees EOF after the message.
async fn close(mut stream: TcpStream) {
    // The listener may already have closed its end.
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{Listener, ListenerConfig};
    use tilecast_protocol::{ASSIGNED_IMAGE_ID, Message};

    fn local_listener_config() -> ListenerConfig {
        ListenerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            search: false,
            receive_timeout: Some(Duration::from_secs(5)),
        }
    }

    async fn local_pair() -> (Listener, Sender) {
        let listener = Listener::open(local_listener_config()).await.unwrap();
        let port = listener.bound_port().unwrap();
        let sender = Sender::new(SenderConfig {
            host: "127.0.0.1".into(),
            port,
            connect_timeout: Duration::from_secs(5),
        });
        (listener, sender)
    }

    fn header(image_id: ImageId, width: u32, height: u32, spp: u32) -> TileHeader {
        TileHeader {
            image_id,
            x: 0,
            y: 0,
            width,
            height,
            samples_per_pixel: spp,
        }
    }

    #[tokio::test]
    async fn open_image_returns_assigned_id() {
        let (listener, sender) = local_pair().await;

        let server = tokio::spawn(async move {
            let session = listener.accept().await.unwrap();
            listener.receive(session).await
        });

        let image_id = sender.open_image(320, 240, 4).await.unwrap();
        assert_eq!(image_id, ASSIGNED_IMAGE_ID);

        let msg = server.await.unwrap().unwrap();
        assert_eq!(
            msg,
            Message::OpenImage {
                width: 320,
                height: 240
            }
        );
    }

    #[tokio::test]
    async fn send_pixels_delivers_tile() {
        let (listener, sender) = local_pair().await;
        let samples: Vec<f32> = (0..2 * 3 * 4).map(|i| i as f32 / 10.0).collect();
        let tile_header = TileHeader {
            x: 8,
            y: 16,
            ..header(ImageId(1), 2, 3, 4)
        };

        let server = tokio::spawn(async move {
            let session = listener.accept().await.unwrap();
            listener.receive(session).await
        });

        sender.send_pixels(tile_header, &samples).await.unwrap();

        match server.await.unwrap().unwrap() {
            Message::Pixels(tile) => {
                assert_eq!(tile.header, tile_header);
                assert_eq!(tile.samples, samples);
            }
            other => panic!("expected Pixels, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_pixels_requires_open_image() {
        // Nothing listens here; the check must fail before connecting.
        let sender = Sender::to_port(1);
        let result = sender
            .send_pixels(header(ImageId::UNSET, 1, 1, 3), &[0.0; 3])
            .await;
        assert!(matches!(result, Err(ChannelError::InvalidState(_))));
    }

    #[tokio::test]
    async fn send_pixels_rejects_length_mismatch_before_connecting() {
        let sender = Sender::to_port(1);
        for len in [0, 11, 13, 24] {
            let samples = vec![0.0; len];
            let result = sender
                .send_pixels(header(ImageId(1), 2, 2, 3), &samples)
                .await;
            assert!(
                matches!(result, Err(ChannelError::InvalidState(_))),
                "length {len} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn close_image_requires_valid_id() {
        let sender = Sender::to_port(1);
        let result = sender.close_image(ImageId::UNSET).await;
        assert!(matches!(result, Err(ChannelError::InvalidState(_))));
    }

    #[tokio::test]
    async fn open_image_rejects_zero_spp() {
        let sender = Sender::to_port(1);
        let result = sender.open_image(4, 4, 0).await;
        assert!(matches!(result, Err(ChannelError::InvalidState(_))));
    }

    #[tokio::test]
    async fn connect_error_when_nothing_listens() {
        // Bind then drop to find a port that is very likely closed.
        let probe = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let sender = Sender::new(SenderConfig {
            host: "127.0.0.1".into(),
            port,
            connect_timeout: Duration::from_secs(5),
        });
        let result = sender.quit().await;
        assert!(matches!(result, Err(ChannelError::Connect { .. })));
    }

    #[tokio::test]
    async fn close_image_and_quit_are_delivered() {
        let (listener, sender) = local_pair().await;

        let server = tokio::spawn(async move {
            let mut received = Vec::new();
            for _ in 0..2 {
                let session = listener.accept().await.unwrap();
                received.push(listener.receive(session).await.unwrap());
            }
            received
        });

        sender.close_image(ImageId(1)).await.unwrap();
        sender.quit().await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(
            received,
            vec![
                Message::CloseImage {
                    image_id: ImageId(1)
                },
                Message::Quit
            ]
        );
    }
}
