//! Writes finished frames to disk as PFM.
//!
//! PFM stores little-endian RGB floats bottom row first, which is also the
//! row order tiles arrive in.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::sync::mpsc::UnboundedReceiver;

use tilecast_frame::FrameBuffer;

/// Writes the RGB channels of `buffer` to `path`.
pub fn write_pfm(buffer: &FrameBuffer, path: &Path) -> io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut out = io::BufWriter::new(file);
    write_pfm_to(buffer, &mut out)?;
    out.flush()
}

fn write_pfm_to(buffer: &FrameBuffer, out: &mut impl Write) -> io::Result<()> {
    // Negative scale marks little-endian data.
    write!(out, "PF\n{} {}\n-1.0\n", buffer.width(), buffer.height())?;
    for y in (0..i64::from(buffer.height())).rev() {
        for x in 0..i64::from(buffer.width()) {
            let rgba = buffer.sample_rgba(x, y);
            for sample in &rgba[..3] {
                out.write_all(&sample.to_le_bytes())?;
            }
        }
    }
    Ok(())
}

/// A finished frame queued for export, tagged with its generation.
pub type Snapshot = (u32, FrameBuffer);

/// Writes every snapshot received to `dir`.
///
/// Snapshots are taken by the receive loop when the image completes, so a
/// following OpenImage cannot clear them first. Files are named
/// `frame-0000.pfm`, `frame-0001.pfm` and so on. Returns the number of
/// frames written once the sending side is dropped.
pub async fn run(
    dir: PathBuf,
    mut completed: UnboundedReceiver<Snapshot>,
) -> anyhow::Result<u32> {
    tokio::fs::create_dir_all(&dir).await?;

    let mut written = 0u32;
    while let Some((generation, snapshot)) = completed.recv().await {
        if snapshot.is_empty() {
            tracing::warn!(generation, "image closed before any open; nothing to export");
            continue;
        }

        let path = dir.join(format!("frame-{written:04}.pfm"));
        let target = path.clone();
        match tokio::task::spawn_blocking(move || write_pfm(&snapshot, &target)).await? {
            Ok(()) => {
                tracing::info!(path = %path.display(), generation, "frame exported");
                written += 1;
            }
            Err(e) => tracing::error!(path = %path.display(), "export failed: {e}"),
        }
    }
    Ok(written)
}
