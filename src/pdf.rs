//! PDF compression: rasterize every page, re-embed it as a JPEG, and fall back
//! to a structural re-save of the original when that does not pay off.

use std::fmt;

use log::{debug, info, warn};
use lopdf::Document;
use tokio_util::sync::CancellationToken;

use crate::assemble::{save_with_object_streams, PdfAssembler};
use crate::config::PdfOptions;
use crate::error::{CompressError, Result};
use crate::raster::encode_jpeg;
use crate::render::PageRasterizer;

/// Where a compression run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsing,
    RenderingPage { page: usize, total: usize },
    Assembling,
    SizeCheck,
    FallbackResave,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parsing => write!(f, "parsing"),
            Stage::RenderingPage { page, total } => write!(f, "rendering page {}/{}", page, total),
            Stage::Assembling => write!(f, "assembling"),
            Stage::SizeCheck => write!(f, "size check"),
            Stage::FallbackResave => write!(f, "re-saving original"),
            Stage::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResaveReason {
    /// The rasterized document was not smaller than the input.
    NotSmaller,
    /// Parsing, rendering or embedding failed.
    PrimaryFailed,
    /// No rasterizer backend was available.
    RasterizerUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfStrategy {
    Rasterized,
    Resaved(ResaveReason),
}

#[derive(Debug, Clone)]
pub struct PdfOutcome {
    pub bytes: Vec<u8>,
    pub strategy: PdfStrategy,
    pub page_count: usize,
    /// Size of the rasterized document, when one was built.
    pub rebuilt_size: Option<usize>,
    /// Size of the re-saved original, when one was produced.
    pub resaved_size: Option<usize>,
}

impl PdfOutcome {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

struct Rebuilt {
    bytes: Vec<u8>,
    page_count: usize,
}

struct Resaved {
    bytes: Vec<u8>,
    page_count: usize,
}

/// Compresses `bytes` page by page through `rasterizer`.
///
/// Errors in the rasterize path are recovered by re-saving the original;
/// only when that fails as well is [`CompressError::FallbackFailure`]
/// returned. Cancellation is never recovered.
pub fn compress_pdf(
    bytes: &[u8],
    rasterizer: &dyn PageRasterizer,
    options: &PdfOptions,
    cancel: &CancellationToken,
) -> Result<PdfOutcome> {
    options.validate()?;

    let rebuilt = match rasterize(bytes, rasterizer, options, cancel) {
        Ok(rebuilt) => rebuilt,
        Err(CompressError::Cancelled) => return Err(CompressError::Cancelled),
        Err(primary) => {
            warn!("Rasterized compression failed, re-saving original: {}", primary);
            debug!("stage: {}", Stage::FallbackResave);
            let resaved = resave(bytes).map_err(|fallback| CompressError::FallbackFailure {
                primary: Box::new(primary),
                fallback: Box::new(fallback),
            })?;
            return Ok(finish_resaved(
                resaved,
                ResaveReason::PrimaryFailed,
                None,
                bytes.len(),
            ));
        }
    };

    debug!("stage: {}", Stage::SizeCheck);
    if rebuilt.bytes.len() < bytes.len() {
        debug!("stage: {}", Stage::Done);
        info!(
            "Rasterized {} pages: {} -> {} bytes",
            rebuilt.page_count,
            bytes.len(),
            rebuilt.bytes.len()
        );
        let rebuilt_size = Some(rebuilt.bytes.len());
        return Ok(PdfOutcome {
            bytes: rebuilt.bytes,
            strategy: PdfStrategy::Rasterized,
            page_count: rebuilt.page_count,
            rebuilt_size,
            resaved_size: None,
        });
    }

    info!(
        "Rasterized output ({} bytes) is not smaller than the input ({} bytes), re-saving original",
        rebuilt.bytes.len(),
        bytes.len()
    );
    debug!("stage: {}", Stage::FallbackResave);
    let resaved = match resave(bytes) {
        Ok(resaved) => Some(resaved),
        Err(e) => {
            warn!("Re-saving original failed, keeping rasterized output: {}", e);
            None
        }
    };

    let rebuilt_size = rebuilt.bytes.len();
    let resaved_size = resaved.as_ref().map(|r| r.bytes.len());
    match (pick_smaller(rebuilt_size, resaved_size), resaved) {
        (Pick::Resaved, Some(resaved)) => Ok(finish_resaved(
            resaved,
            ResaveReason::NotSmaller,
            Some(rebuilt_size),
            bytes.len(),
        )),
        _ => {
            debug!("Keeping rasterized output ({} bytes)", rebuilt_size);
            Ok(PdfOutcome {
                bytes: rebuilt.bytes,
                strategy: PdfStrategy::Rasterized,
                page_count: rebuilt.page_count,
                rebuilt_size: Some(rebuilt_size),
                resaved_size,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pick {
    Rebuilt,
    Resaved,
}

/// Chooses between the rasterized document and the re-saved original.
/// `resaved_size` is `None` when the re-save failed. Ties go to the re-save.
fn pick_smaller(rebuilt_size: usize, resaved_size: Option<usize>) -> Pick {
    match resaved_size {
        Some(resaved) if resaved <= rebuilt_size => Pick::Resaved,
        _ => Pick::Rebuilt,
    }
}

/// Structural re-save only, for when no rasterizer can be bound.
///
/// A failed re-save is reported as [`CompressError::FallbackFailure`] with
/// [`CompressError::RasterizerUnavailable`] as the primary error.
pub fn resave_pdf(bytes: &[u8]) -> Result<PdfOutcome> {
    let resaved = resave(bytes).map_err(|fallback| CompressError::FallbackFailure {
        primary: Box::new(CompressError::RasterizerUnavailable),
        fallback: Box::new(fallback),
    })?;
    Ok(finish_resaved(
        resaved,
        ResaveReason::RasterizerUnavailable,
        None,
        bytes.len(),
    ))
}

fn finish_resaved(
    resaved: Resaved,
    reason: ResaveReason,
    rebuilt_size: Option<usize>,
    input_size: usize,
) -> PdfOutcome {
    debug!("stage: {}", Stage::Done);
    info!(
        "Re-saved {} pages ({:?}): {} -> {} bytes",
        resaved.page_count,
        reason,
        input_size,
        resaved.bytes.len()
    );
    let resaved_size = Some(resaved.bytes.len());
    PdfOutcome {
        bytes: resaved.bytes,
        strategy: PdfStrategy::Resaved(reason),
        page_count: resaved.page_count,
        rebuilt_size,
        resaved_size,
    }
}

fn rasterize(
    bytes: &[u8],
    rasterizer: &dyn PageRasterizer,
    options: &PdfOptions,
    cancel: &CancellationToken,
) -> Result<Rebuilt> {
    debug!("stage: {}", Stage::Parsing);
    let document = rasterizer.open(bytes)?;
    let total = document.page_count();

    let mut assembler = PdfAssembler::new();
    for page_number in 1..=total {
        if cancel.is_cancelled() {
            return Err(CompressError::Cancelled);
        }
        debug!(
            "stage: {}",
            Stage::RenderingPage {
                page: page_number,
                total
            }
        );
        let page = document.render_page(page_number, options.render_scale)?;
        let jpeg = encode_jpeg(&page.image, options.page_quality)?;
        debug!(
            "Page {}: {}x{} -> {} bytes",
            page_number,
            jpeg.width,
            jpeg.height,
            jpeg.bytes.len()
        );
        assembler.add_jpeg_page(&jpeg)?;
    }

    if cancel.is_cancelled() {
        return Err(CompressError::Cancelled);
    }
    debug!("stage: {}", Stage::Assembling);
    let page_count = assembler.page_count();
    Ok(Rebuilt {
        bytes: assembler.finish()?,
        page_count,
    })
}

fn resave(bytes: &[u8]) -> Result<Resaved> {
    let mut doc = Document::load_mem(bytes).map_err(|e| CompressError::Parse(e.to_string()))?;
    let page_count = doc.get_pages().len();
    let bytes = save_with_object_streams(&mut doc)?;
    Ok(Resaved { bytes, page_count })
}
