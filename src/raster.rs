//! Iterative JPEG re-encoding towards a target size.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use log::{debug, info};

use crate::config::{Quality, RasterOptions};
use crate::error::{CompressError, Result};
use crate::media::MIME_JPEG;

/// Colour model of an encoded JPEG, needed to describe it inside a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColor {
    Gray,
    Rgb,
}

/// A JPEG payload with the facts a PDF image dictionary needs.
#[derive(Debug, Clone)]
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color: JpegColor,
    pub quality: Quality,
}

/// One encode in the quality search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    pub quality: Quality,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct RasterOutcome {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    /// Quality of the returned encoding.
    pub quality: Quality,
    pub attempts: Vec<Attempt>,
}

impl RasterOutcome {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(CompressError::Decode)
}

/// Encodes at native resolution. Alpha is dropped; grayscale stays grayscale.
pub fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<CompressedImage> {
    let (width, height) = img.dimensions();
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.percent());

    let color = if img.color().has_color() {
        encoder
            .encode_image(&img.to_rgb8())
            .map_err(CompressError::Encode)?;
        JpegColor::Rgb
    } else {
        encoder
            .encode_image(&img.to_luma8())
            .map_err(CompressError::Encode)?;
        JpegColor::Gray
    };

    Ok(CompressedImage {
        bytes: buffer,
        width,
        height,
        color,
        quality,
    })
}

/// Re-encodes `bytes` as JPEG, stepping the quality down until the result
/// fits `options.target_size` or the quality floor is reached.
pub fn compress_raster(bytes: &[u8], options: &RasterOptions) -> Result<RasterOutcome> {
    options.validate()?;
    let img = decode_image(bytes)?;
    debug!(
        "Decoded {}x{} image ({} bytes)",
        img.width(),
        img.height(),
        bytes.len()
    );

    let mut quality = options.start_quality;
    let mut attempts = Vec::with_capacity(options.max_attempts());

    loop {
        let encoded = encode_jpeg(&img, quality)?;
        let size = encoded.bytes.len();
        attempts.push(Attempt { quality, size });
        debug!("JPEG q={} -> {} bytes", quality.percent(), size);

        if size <= options.target_size || quality <= options.min_quality {
            info!(
                "Compressed image {} -> {} bytes at q={} after {} attempts",
                bytes.len(),
                size,
                quality.percent(),
                attempts.len()
            );
            return Ok(RasterOutcome {
                bytes: encoded.bytes,
                mime: MIME_JPEG,
                quality,
                attempts,
            });
        }

        quality = step_down(quality, options);
    }
}

fn step_down(quality: Quality, options: &RasterOptions) -> Quality {
    let next = quality
        .percent()
        .saturating_sub(options.quality_step)
        .max(options.min_quality.percent());
    Quality::from_percent(next).unwrap_or(options.min_quality)
}
