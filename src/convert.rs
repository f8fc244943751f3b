//! Wraps a single image into a one-page PDF.

use image::ImageFormat;
use log::{debug, info};

use crate::assemble::PdfAssembler;
use crate::config::{ConvertOptions, Quality};
use crate::error::{CompressError, Result};
use crate::media::MediaKind;
use crate::raster::{encode_jpeg, CompressedImage, JpegColor};

/// How the image ended up inside the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Embedding {
    /// JPEG bytes copied as they were.
    Jpeg,
    /// PNG decoded and stored losslessly.
    Png,
    /// Decoded and re-encoded as JPEG.
    Transcoded(Quality),
}

#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub embedding: Embedding,
}

/// Frame header facts of a baseline/progressive JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u32,
    height: u32,
    components: u8,
}

/// Builds a one-page PDF whose page size in points equals the image size in
/// pixels.
pub fn image_to_pdf(bytes: &[u8], mime: &str, options: &ConvertOptions) -> Result<ConvertOutcome> {
    let unsupported = |message: String| CompressError::UnsupportedFormat {
        mime: mime.to_string(),
        message,
    };

    let mut assembler = PdfAssembler::new();
    let (width, height, embedding) = match MediaKind::from_mime(mime) {
        MediaKind::Pdf => return Err(unsupported("input is already a PDF".to_string())),
        MediaKind::Jpeg => {
            let header = read_jpeg_header(bytes)
                .ok_or_else(|| unsupported("not a readable JPEG".to_string()))?;
            let color = match header.components {
                1 => Some(JpegColor::Gray),
                3 => Some(JpegColor::Rgb),
                _ => None,
            };
            match color {
                Some(color) => {
                    assembler.add_jpeg_page(&CompressedImage {
                        bytes: bytes.to_vec(),
                        width: header.width,
                        height: header.height,
                        color,
                        // Copied as-is; the source quality is unknown.
                        quality: Quality::TRANSCODE,
                    })?;
                    (header.width, header.height, Embedding::Jpeg)
                }
                None => {
                    debug!("{}-component JPEG, re-encoding", header.components);
                    transcode(&mut assembler, bytes, options.transcode_quality)
                        .map_err(|e| unsupported(e.to_string()))?
                }
            }
        }
        MediaKind::Png => {
            let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)
                .map_err(|e| unsupported(e.to_string()))?;
            assembler.add_lossless_page(&img)?;
            (img.width(), img.height(), Embedding::Png)
        }
        MediaKind::OtherImage => transcode(&mut assembler, bytes, options.transcode_quality)
            .map_err(|e| match e {
                CompressError::Decode(e) => unsupported(e.to_string()),
                other => other,
            })?,
    };

    let bytes = assembler.finish()?;
    info!(
        "Converted {}x{} image to PDF ({:?}, {} bytes)",
        width,
        height,
        embedding,
        bytes.len()
    );
    Ok(ConvertOutcome {
        bytes,
        width,
        height,
        embedding,
    })
}

fn transcode(
    assembler: &mut PdfAssembler,
    bytes: &[u8],
    quality: Quality,
) -> Result<(u32, u32, Embedding)> {
    let img = image::load_from_memory(bytes).map_err(CompressError::Decode)?;
    let jpeg = encode_jpeg(&img, quality)?;
    assembler.add_jpeg_page(&jpeg)?;
    Ok((jpeg.width, jpeg.height, Embedding::Transcoded(quality)))
}

/// Walks the marker segments up to the first start-of-frame.
fn read_jpeg_header(bytes: &[u8]) -> Option<JpegHeader> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    loop {
        // Fill bytes may precede a marker.
        while *bytes.get(pos)? == 0xFF && *bytes.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        let marker = *bytes.get(pos + 1)?;
        // Standalone markers carry no length.
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        let length = u16::from_be_bytes([*bytes.get(pos + 2)?, *bytes.get(pos + 3)?]) as usize;
        if length < 2 {
            return None;
        }
        let is_frame = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            let segment = bytes.get(pos + 4..pos + 2 + length)?;
            let height = u16::from_be_bytes([*segment.get(1)?, *segment.get(2)?]) as u32;
            let width = u16::from_be_bytes([*segment.get(3)?, *segment.get(4)?]) as u32;
            let components = *segment.get(5)?;
            if width == 0 || height == 0 {
                return None;
            }
            return Some(JpegHeader {
                width,
                height,
                components,
            });
        }
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }
        pos += 2 + length;
    }
}
