//! Renders the test pattern and streams it to a listener.

use tilecast_channel::Sender;

use crate::config::Config;
use crate::render::{buckets, shade};

/// Sends one full image: open, every bucket, close.
pub async fn run(config: Config) -> anyhow::Result<()> {
    anyhow::ensure!(
        config.samples_per_pixel > 0,
        "samples_per_pixel must be at least 1"
    );

    let sender = Sender::new(config.sender_config());
    let image_id = sender
        .open_image(config.width, config.height, config.samples_per_pixel)
        .await?;
    tracing::info!(%image_id, width = config.width, height = config.height, "image opened");

    let all = buckets(config.width, config.height, config.bucket_size);
    for (index, bucket) in all.iter().enumerate() {
        let samples = shade(bucket, config.width, config.height, config.samples_per_pixel);
        sender
            .send_pixels(bucket.header(image_id, config.samples_per_pixel), &samples)
            .await?;
        tracing::debug!(index, x = bucket.x, y = bucket.y, "bucket sent");
    }

    sender.close_image(image_id).await?;
    tracing::info!(%image_id, buckets = all.len(), "image sent");
    Ok(())
}
