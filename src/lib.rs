//! Shrinks images and PDFs, and wraps images into PDFs.
//!
//! - [`compress_raster`] re-encodes an image as JPEG at decreasing quality
//!   until it fits a target size.
//! - [`compress_pdf`] renders every page, re-embeds it as a JPEG and falls
//!   back to a structural re-save when that does not help.
//! - [`image_to_pdf`] builds a one-page PDF sized to the image.
//!
//! [`dispatch::process`] routes a [`Request`] to the right one of these.

pub mod assemble;
pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod media;
pub mod pdf;
pub mod raster;
pub mod render;
pub mod size;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use config::{ConvertOptions, PdfOptions, Quality, RasterOptions, Settings};
pub use convert::{image_to_pdf, ConvertOutcome, Embedding};
pub use dispatch::{process, Mode, ProcessedFile, Request};
pub use error::{CompressError, Result};
pub use pdf::{compress_pdf, PdfOutcome, PdfStrategy, ResaveReason};
pub use raster::{compress_raster, RasterOutcome};
pub use render::{PageRasterizer, PdfiumRasterizer, RasterDocument, RenderedPage};
pub use size::format_file_size;
pub use tokio_util::sync::CancellationToken;
