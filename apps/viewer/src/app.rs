//! Application orchestrator: binds the listener and runs the receive loop
//! until a producer or Ctrl-C asks it to quit.

use tokio::sync::mpsc::{self, UnboundedSender};

use tilecast_channel::Listener;
use tilecast_frame::{FrameAssembler, FrameBuffer, FrameEvent, LoopStats, run_receive_loop, shared};

use crate::config::Config;
use crate::export;

/// Runs the viewer until Quit is received.
pub async fn run(config: Config) -> anyhow::Result<()> {
    anyhow::ensure!(config.channels > 0, "channels must be at least 1");

    let listener = Listener::open(config.listener_config()).await?;
    let quit = listener.quit_sender()?;
    tracing::info!(port = quit.port(), "listening for tiles");

    let assembler = FrameAssembler::new(shared(FrameBuffer::with_channels(config.channels)));

    // -- Exporter --
    let (exports, exporter) = match config.output_dir.clone() {
        Some(dir) => {
            let (tx, rx) = mpsc::unbounded_channel();
            let task = tokio::spawn(export::run(dir, rx));
            (Some(tx), Some(task))
        }
        None => (None, None),
    };

    // -- Receive loop --
    // The exporter stops once `exports` is dropped with this task.
    let mut receiver = tokio::spawn(async move {
        run_receive_loop(&listener, &assembler, |event| {
            handle_event(event, &assembler, exports.as_ref());
        })
        .await
    });

    // -- Main loop: wait for shutdown --
    let stats: LoopStats = tokio::select! {
        result = &mut receiver => result??,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
            quit.quit().await?;
            receiver.await??
        }
    };

    if let Some(exporter) = exporter {
        let frames = exporter.await??;
        tracing::info!(frames, "exports finished");
    }

    tracing::info!(
        messages = stats.messages,
        failures = stats.failures,
        images = stats.images_completed,
        "viewer stopped"
    );
    Ok(())
}

/// Logs an event and, when exporting, queues a copy of each finished frame.
///
/// The copy is taken here, before the loop accepts the next message, so a
/// following OpenImage cannot clear the frame first.
fn handle_event(
    event: &FrameEvent,
    assembler: &FrameAssembler,
    exports: Option<&UnboundedSender<export::Snapshot>>,
) {
    log_event(event);
    if let (FrameEvent::Completed { generation, .. }, Some(tx)) = (event, exports) {
        let snapshot = assembler.lock().clone();
        if tx.send((*generation, snapshot)).is_err() {
            tracing::warn!(generation, "exporter stopped; frame not saved");
        }
    }
}

fn log_event(event: &FrameEvent) {
    match event {
        FrameEvent::Opened { width, height } => {
            tracing::info!(width, height, "image opened");
        }
        FrameEvent::Rejected { width, height } => {
            tracing::warn!(width, height, "image rejected");
        }
        FrameEvent::TileWritten { stats, generation } => {
            tracing::debug!(written = stats.written, skipped = stats.skipped, generation, "tile");
        }
        FrameEvent::Completed {
            image_id,
            generation,
        } => {
            tracing::info!(%image_id, generation, "image complete");
        }
        FrameEvent::Quit => tracing::info!("quit received"),
    }
}
