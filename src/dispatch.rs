//! Request routing: picks the pipeline for a file and packages the result
//! with the size figures callers display.

use log::info;
use tokio_util::sync::CancellationToken;

use crate::config::{Quality, Settings};
use crate::convert::{image_to_pdf, Embedding};
use crate::error::{CompressError, Result};
use crate::media::{output_file_name, sniff_mime, MediaKind, MIME_PDF};
use crate::pdf::{compress_pdf, resave_pdf, PdfStrategy};
use crate::raster::compress_raster;
use crate::render::PageRasterizer;
use crate::size::{format_file_size, format_reduction, reduction_percent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Shrink an image or a PDF.
    #[default]
    Compress,
    /// Wrap an image into a PDF.
    Convert,
}

/// One file to process.
#[derive(Debug, Clone)]
pub struct Request {
    pub mode: Mode,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Request {
    pub fn new(
        mode: Mode,
        file_name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            mode,
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Like [`Request::new`], with the MIME type guessed from the payload.
    pub fn sniffed(mode: Mode, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let mime = sniff_mime(&bytes).unwrap_or("application/octet-stream");
        Self::new(mode, file_name, mime, bytes)
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime)
    }
}

/// Pipeline-specific facts about a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Image { quality: Quality, attempts: usize },
    Pdf { strategy: PdfStrategy, page_count: usize },
    Converted { width: u32, height: u32, embedding: Embedding },
}

#[derive(Debug, Clone)]
pub struct ProcessedFile {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub file_name: String,
    pub original_size: u64,
    pub output_size: u64,
    pub detail: Detail,
}

impl ProcessedFile {
    pub fn reduction_percent(&self) -> f64 {
        reduction_percent(self.original_size, self.output_size)
    }

    /// One-line result, e.g. `2 MB → 480.5 KB (76.5% reduction)`.
    pub fn summary(&self) -> String {
        match self.detail {
            Detail::Converted { .. } => format!(
                "Image converted to PDF, size: {}",
                format_file_size(self.output_size)
            ),
            _ => format!(
                "{} → {} ({}% reduction)",
                format_file_size(self.original_size),
                format_file_size(self.output_size),
                format_reduction(self.original_size, self.output_size)
            ),
        }
    }
}

/// Runs `request` through the pipeline its mode and MIME type call for.
///
/// PDFs are rasterized when a `rasterizer` is given and structurally
/// re-saved otherwise.
pub fn process(
    request: &Request,
    settings: &Settings,
    rasterizer: Option<&dyn PageRasterizer>,
    cancel: &CancellationToken,
) -> Result<ProcessedFile> {
    settings.validate()?;

    let original_size = request.bytes.len();
    if original_size > settings.max_input_size {
        return Err(CompressError::TooLarge {
            size: original_size,
            limit: settings.max_input_size,
        });
    }

    let kind = request.kind();
    let file_name = output_file_name(&request.file_name, request.mode == Mode::Convert, kind);
    info!(
        "Processing {} ({}, {} bytes) in {:?} mode",
        request.file_name, request.mime, original_size, request.mode
    );

    let (bytes, mime, detail) = match (request.mode, kind) {
        (Mode::Compress, MediaKind::Pdf) => {
            let outcome = match rasterizer {
                Some(rasterizer) => {
                    compress_pdf(&request.bytes, rasterizer, &settings.pdf, cancel)?
                }
                None => resave_pdf(&request.bytes)?,
            };
            let detail = Detail::Pdf {
                strategy: outcome.strategy,
                page_count: outcome.page_count,
            };
            (outcome.bytes, MIME_PDF, detail)
        }
        (Mode::Compress, _) => {
            let outcome = compress_raster(&request.bytes, &settings.raster)?;
            let detail = Detail::Image {
                quality: outcome.quality,
                attempts: outcome.attempts.len(),
            };
            (outcome.bytes, outcome.mime, detail)
        }
        (Mode::Convert, _) => {
            let outcome = image_to_pdf(&request.bytes, &request.mime, &settings.convert)?;
            let detail = Detail::Converted {
                width: outcome.width,
                height: outcome.height,
                embedding: outcome.embedding,
            };
            (outcome.bytes, MIME_PDF, detail)
        }
    };

    Ok(ProcessedFile {
        output_size: bytes.len() as u64,
        bytes,
        mime,
        file_name,
        original_size: original_size as u64,
        detail,
    })
}
