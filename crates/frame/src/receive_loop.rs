//! Accept loop tying a [`Listener`] to a [`FrameAssembler`].

use std::time::Duration;

use tracing::{debug, info, warn};

use tilecast_channel::{ChannelError, Listener};

use crate::assembler::{FrameAssembler, FrameEvent};

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Messages decoded and applied, Quit included.
    pub messages: u64,
    /// Connections dropped because of a transport error or timeout.
    pub failures: u64,
    pub images_completed: u64,
}

/// Receives messages until Quit, applying each to `assembler`.
///
/// `on_event` runs after every applied message, outside the buffer lock.
/// Failed connections are logged and skipped. The loop only returns an
/// error when the listener is not bound.
pub async fn run_receive_loop<F>(
    listener: &Listener,
    assembler: &FrameAssembler,
    mut on_event: F,
) -> Result<LoopStats, ChannelError>
where
    F: FnMut(&FrameEvent),
{
    let mut stats = LoopStats::default();
    let mut accept_errors = 0u32;
    info!(port = ?listener.bound_port(), "receive loop started");

    loop {
        let session = match listener.accept().await {
            Ok(session) => {
                accept_errors = 0;
                session
            }
            Err(ChannelError::NotBound) => return Err(ChannelError::NotBound),
            Err(e) => {
                accept_errors = accept_errors.saturating_add(1);
                let delay = accept_backoff(accept_errors);
                warn!(?delay, "accept error: {e}");
                stats.failures += 1;
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        let peer = session.peer_addr();
        let message = match listener.receive(session).await {
            Ok(message) => message,
            Err(e) => {
                warn!(%peer, "dropped message: {e}");
                stats.failures += 1;
                continue;
            }
        };

        let event = assembler.apply(&message);
        stats.messages += 1;
        on_event(&event);

        match event {
            FrameEvent::Completed { .. } => stats.images_completed += 1,
            FrameEvent::Quit => {
                info!(
                    messages = stats.messages,
                    failures = stats.failures,
                    "receive loop stopped"
                );
                return Ok(stats);
            }
            FrameEvent::Opened { .. }
            | FrameEvent::Rejected { .. }
            | FrameEvent::TileWritten { .. } => {
                debug!(%peer, kind = %message.kind(), "message applied");
            }
        }
    }
}

/// Pause after the `consecutive`-th accept failure in a row: 10 ms doubling
/// up to one second, so a persistent error such as EMFILE does not spin.
fn accept_backoff(consecutive: u32) -> Duration {
    let exponent = consecutive.saturating_sub(1).min(7);
    (ACCEPT_BACKOFF_MIN * (1u32 << exponent)).min(ACCEPT_BACKOFF_MAX)
}
