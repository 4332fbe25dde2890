//! Procedural test pattern rendered in buckets.
//!
//! Rows count from the bottom of the image, the way a renderer's display
//! driver hands them over; the listener flips them into place.

use tilecast_protocol::{ImageId, TileHeader};

/// Rectangle of pixels rendered and sent together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bucket {
    /// Builds a bucket from half-open renderer bounds.
    ///
    /// Returns `None` for empty or inverted bounds.
    pub fn from_bounds(xmin: i32, xmax_plusone: i32, ymin: i32, ymax_plusone: i32) -> Option<Self> {
        let width = u32::try_from(i64::from(xmax_plusone) - i64::from(xmin)).ok()?;
        let height = u32::try_from(i64::from(ymax_plusone) - i64::from(ymin)).ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x: xmin,
            y: ymin,
            width,
            height,
        })
    }

    pub fn header(&self, image_id: ImageId, samples_per_pixel: u32) -> TileHeader {
        TileHeader {
            image_id,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            samples_per_pixel,
        }
    }
}

/// Splits a `width x height` image into square buckets, clipped at the
/// right and top edges.
pub fn buckets(width: u32, height: u32, size: u32) -> Vec<Bucket> {
    let size = size.max(1);
    let mut out = Vec::new();
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let x1 = x.saturating_add(size).min(width);
            let y1 = y.saturating_add(size).min(height);
            out.push(Bucket {
                x: x as i32,
                y: y as i32,
                width: x1 - x,
                height: y1 - y,
            });
            x = x1;
        }
        y = y.saturating_add(size).min(height);
    }
    out
}

/// Shades one bucket of a `width x height` image.
///
/// Red ramps left to right, green ramps bottom to top, blue marks a
/// 16-pixel checkerboard. A fourth sample is opaque alpha; extra samples
/// are zero.
pub fn shade(bucket: &Bucket, width: u32, height: u32, samples_per_pixel: u32) -> Vec<f32> {
    let spp = samples_per_pixel as usize;
    let mut samples = Vec::with_capacity(bucket.width as usize * bucket.height as usize * spp);
    let w = width.max(1) as f32;
    let h = height.max(1) as f32;

    for ty in 0..bucket.height {
        let y = bucket.y + ty as i32;
        for tx in 0..bucket.width {
            let x = bucket.x + tx as i32;
            let checker = ((x / 16) + (y / 16)) % 2 == 0;
            let rgba = [
                x as f32 / w,
                y as f32 / h,
                if checker { 1.0 } else { 0.0 },
                1.0,
            ];
            samples.extend((0..spp).map(|c| rgba.get(c).copied().unwrap_or(0.0)));
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bounds_half_open() {
        let bucket = Bucket::from_bounds(16, 48, 0, 16).unwrap();
        assert_eq!(
            bucket,
            Bucket {
                x: 16,
                y: 0,
                width: 32,
                height: 16
            }
        );
        assert_eq!(Bucket::from_bounds(4, 4, 0, 1), None);
        assert_eq!(Bucket::from_bounds(5, 4, 0, 1), None);
    }

    #[test]
    fn buckets_cover_image_once() {
        let all = buckets(70, 40, 32);
        // 3 columns x 2 rows, clipped at the edges.
        assert_eq!(all.len(), 6);
        let area: u32 = all.iter().map(|b| b.width * b.height).sum();
        assert_eq!(area, 70 * 40);
        assert_eq!(all[2], Bucket { x: 64, y: 0, width: 6, height: 32 });
        assert_eq!(all[5], Bucket { x: 64, y: 32, width: 6, height: 8 });
    }

    #[test]
    fn buckets_of_empty_image() {
        assert!(buckets(0, 10, 8).is_empty());
        assert!(buckets(10, 0, 8).is_empty());
    }

    #[test]
    fn shade_matches_header() {
        let bucket = Bucket::from_bounds(0, 4, 0, 2).unwrap();
        for spp in [1, 3, 4, 5] {
            let samples = shade(&bucket, 4, 2, spp);
            let header = bucket.header(ImageId(1), spp);
            assert_eq!(samples.len() as u64, header.sample_count().unwrap());
        }
    }

    #[test]
    fn shade_pattern_values() {
        let bucket = Bucket::from_bounds(2, 3, 1, 2).unwrap();
        let samples = shade(&bucket, 4, 2, 5);
        assert_eq!(samples, vec![0.5, 0.5, 1.0, 1.0, 0.0]);
    }
}
