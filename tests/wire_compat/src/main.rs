fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use tilecast_channel::{Listener, ListenerConfig, Sender, SenderConfig};
    use tilecast_frame::{FrameAssembler, FrameEvent, TileStats, run_receive_loop};
    use tilecast_protocol::{ImageId, Message, TileHeader, wire};

    /// Native-order bytes of a sequence of 4-byte fields.
    fn fields(values: &[[u8; 4]]) -> Vec<u8> {
        values.concat()
    }

    fn header(x: i32, y: i32, width: u32, height: u32, spp: u32) -> TileHeader {
        TileHeader {
            image_id: ImageId(1),
            x,
            y,
            width,
            height,
            samples_per_pixel: spp,
        }
    }

    #[tokio::test]
    async fn pixels_byte_layout() {
        let samples = [0.25f32, -1.5, 3.0];
        let mut out = Vec::new();
        wire::write_pixels(&mut out, &header(7, -2, 1, 1, 3), &samples)
            .await
            .unwrap();

        let expected = fields(&[
            1i32.to_ne_bytes(),
            1i32.to_ne_bytes(),
            7i32.to_ne_bytes(),
            (-2i32).to_ne_bytes(),
            1u32.to_ne_bytes(),
            1u32.to_ne_bytes(),
            3u32.to_ne_bytes(),
            0.25f32.to_ne_bytes(),
            (-1.5f32).to_ne_bytes(),
            3.0f32.to_ne_bytes(),
        ]);
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn close_and_quit_byte_layout() {
        let mut out = Vec::new();
        wire::write_close_image(&mut out, ImageId(1)).await.unwrap();
        wire::write_quit(&mut out).await.unwrap();
        assert_eq!(
            out,
            fields(&[2i32.to_ne_bytes(), 1i32.to_ne_bytes(), 9i32.to_ne_bytes()])
        );
    }

    #[tokio::test]
    async fn open_image_exchange_byte_layout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Raw peer playing the listener side of the exchange.
        let peer = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut kind = [0u8; 4];
            stream.read_exact(&mut kind).await.unwrap();
            stream.write_all(&1i32.to_ne_bytes()).await.unwrap();
            let mut extent = [0u8; 8];
            stream.read_exact(&mut extent).await.unwrap();
            (kind, extent)
        });

        let sender = Sender::new(SenderConfig {
            host: "127.0.0.1".into(),
            port,
            connect_timeout: Duration::from_secs(5),
        });
        let image_id = sender.open_image(640, 480, 4).await.unwrap();
        assert_eq!(image_id, ImageId(1));

        let (kind, extent) = peer.await.unwrap();
        assert_eq!(kind, 0i32.to_ne_bytes());
        assert_eq!(
            extent.to_vec(),
            fields(&[640u32.to_ne_bytes(), 480u32.to_ne_bytes()])
        );
    }

    #[tokio::test]
    async fn raw_pixels_decode_through_listener() {
        let listener = Listener::open(ListenerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            search: false,
            receive_timeout: Some(Duration::from_secs(5)),
        })
        .await
        .unwrap();
        let port = listener.bound_port().unwrap();

        let server = tokio::spawn(async move { listener.next_message().await });

        let bytes = fields(&[
            1i32.to_ne_bytes(),
            1i32.to_ne_bytes(),
            0i32.to_ne_bytes(),
            0i32.to_ne_bytes(),
            2u32.to_ne_bytes(),
            1u32.to_ne_bytes(),
            1u32.to_ne_bytes(),
            0.5f32.to_ne_bytes(),
            0.75f32.to_ne_bytes(),
        ]);
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream.write_all(&bytes).await.unwrap();
        stream.shutdown().await.unwrap();

        match server.await.unwrap().unwrap() {
            Message::Pixels(tile) => {
                assert_eq!(tile.header, header(0, 0, 2, 1, 1));
                assert_eq!(tile.samples, vec![0.5, 0.75]);
            }
            other => panic!("expected Pixels, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn end_to_end_image_on_9301() {
        let listener = Listener::open(ListenerConfig {
            host: "127.0.0.1".into(),
            port: 9301,
            search: true,
            receive_timeout: Some(Duration::from_secs(5)),
        })
        .await
        .unwrap();
        let port = listener.bound_port().unwrap();
        assert!((9301..9400).contains(&port));

        let assembler = Arc::new(FrameAssembler::default());
        let (events_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
        let loop_assembler = Arc::clone(&assembler);
        let server = tokio::spawn(async move {
            run_receive_loop(&listener, &loop_assembler, |event| {
                let _ = events_tx.send(*event);
            })
            .await
        });

        let sender = Sender::new(SenderConfig {
            host: "127.0.0.1".into(),
            port,
            connect_timeout: Duration::from_secs(5),
        });

        let image_id = sender.open_image(4, 4, 3).await.unwrap();
        assert_eq!(image_id, ImageId(1));
        assert_eq!(
            events.recv().await.unwrap(),
            FrameEvent::Opened {
                width: 4,
                height: 4
            }
        );

        let samples: Vec<f32> = (0..12).map(|i| i as f32 * 0.5).collect();
        sender
            .send_pixels(header(0, 0, 2, 2, 3), &samples)
            .await
            .unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            FrameEvent::TileWritten {
                stats: TileStats {
                    written: 4,
                    skipped: 0
                },
                ..
            }
        ));
        {
            let fb = assembler.lock();
            assert_eq!(&fb.pixel(0, 3).unwrap()[..3], &samples[0..3]);
            assert_eq!(&fb.pixel(1, 2).unwrap()[..3], &samples[9..12]);
            assert_eq!(fb.pixel(0, 3).unwrap()[3], 1.0);
        }

        let before = assembler.lock().as_slice().to_vec();
        sender.close_image(image_id).await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            FrameEvent::Completed {
                image_id: ImageId(1),
                ..
            }
        ));
        assert_eq!(assembler.lock().as_slice(), before.as_slice());

        sender.quit().await.unwrap();
        let stats = server.await.unwrap().unwrap();
        assert_eq!(stats.messages, 4);
        assert_eq!(stats.images_completed, 1);
        assert_eq!(events.recv().await.unwrap(), FrameEvent::Quit);
    }
}
