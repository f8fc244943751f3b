//! WebAssembly bindings. PDFium is bound to the pdfium module the page has
//! already loaded and initialized; without it PDFs are only re-saved.

use log::{Level, LevelFilter, Log, Metadata, Record};
use wasm_bindgen::prelude::*;

use crate::config::{RasterOptions, Settings};
use crate::dispatch::{process, Mode, ProcessedFile, Request};
use crate::media::{output_file_name, MediaKind};
use crate::render::{PageRasterizer, PdfiumRasterizer};
use crate::size;
use crate::CancellationToken;

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            Level::Error => web_sys::console::error_1(&line),
            Level::Warn => web_sys::console::warn_1(&line),
            _ => web_sys::console::log_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Forwards `log` records and panics to the browser console.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(verbose: bool) {
    console_error_panic_hook::set_once();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        });
    }
}

/// Result handed back to JS.
#[wasm_bindgen]
pub struct ProcessedFileJs {
    bytes: Vec<u8>,
    mime: String,
    file_name: String,
    original_size: f64,
    output_size: f64,
    summary: String,
}

#[wasm_bindgen]
impl ProcessedFileJs {
    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime(&self) -> String {
        self.mime.clone()
    }

    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> String {
        self.file_name.clone()
    }

    #[wasm_bindgen(getter, js_name = originalSize)]
    pub fn original_size(&self) -> f64 {
        self.original_size
    }

    #[wasm_bindgen(getter, js_name = outputSize)]
    pub fn output_size(&self) -> f64 {
        self.output_size
    }

    #[wasm_bindgen(getter)]
    pub fn summary(&self) -> String {
        self.summary.clone()
    }
}

impl From<ProcessedFile> for ProcessedFileJs {
    fn from(file: ProcessedFile) -> Self {
        let summary = file.summary();
        Self {
            mime: file.mime.to_string(),
            file_name: file.file_name,
            original_size: file.original_size as f64,
            output_size: file.output_size as f64,
            summary,
            bytes: file.bytes,
        }
    }
}

fn run(request: Request, settings: &Settings) -> Result<ProcessedFileJs, JsError> {
    let rasterizer = match (request.mode, request.kind()) {
        (Mode::Compress, MediaKind::Pdf) => match PdfiumRasterizer::bind() {
            Ok(rasterizer) => Some(rasterizer),
            Err(e) => {
                log::warn!("{}; PDFs will only be re-saved", e);
                None
            }
        },
        _ => None,
    };
    let rasterizer = rasterizer.as_ref().map(|r| r as &dyn PageRasterizer);

    process(&request, settings, rasterizer, &CancellationToken::new())
        .map(ProcessedFileJs::from)
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Re-encodes an image as JPEG, stepping quality down towards `target_kb`.
#[wasm_bindgen(js_name = compressRaster)]
pub fn compress_raster(
    file_name: &str,
    mime: &str,
    input: &[u8],
    target_kb: Option<u32>,
    start_quality: Option<f32>,
    min_quality: Option<f32>,
) -> Result<ProcessedFileJs, JsError> {
    let defaults = RasterOptions::default();
    let raster = RasterOptions::from_fractions(
        target_kb
            .map(|kb| kb as usize * 1024)
            .unwrap_or(defaults.target_size),
        start_quality.unwrap_or(defaults.start_quality.as_fraction()),
        min_quality.unwrap_or(defaults.min_quality.as_fraction()),
        defaults.quality_step as f32 / 100.0,
    )
    .map_err(|e| JsError::new(&e.to_string()))?;
    let settings = Settings {
        raster,
        ..Settings::default()
    };
    run(
        Request::new(Mode::Compress, file_name, mime, input.to_vec()),
        &settings,
    )
}

/// Compresses a PDF by rasterizing its pages.
#[wasm_bindgen(js_name = compressPdf)]
pub fn compress_pdf(file_name: &str, input: &[u8]) -> Result<ProcessedFileJs, JsError> {
    run(
        Request::new(Mode::Compress, file_name, crate::media::MIME_PDF, input.to_vec()),
        &Settings::default(),
    )
}

/// Wraps an image into a one-page PDF.
#[wasm_bindgen(js_name = imageToPdf)]
pub fn image_to_pdf(file_name: &str, mime: &str, input: &[u8]) -> Result<ProcessedFileJs, JsError> {
    run(
        Request::new(Mode::Convert, file_name, mime, input.to_vec()),
        &Settings::default(),
    )
}

#[wasm_bindgen(js_name = formatFileSize)]
pub fn format_file_size(bytes: f64) -> String {
    size::format_file_size(bytes.max(0.0) as u64)
}

#[wasm_bindgen(js_name = outputFileName)]
pub fn file_name_for(original_name: &str, convert: bool, mime: &str) -> String {
    output_file_name(original_name, convert, MediaKind::from_mime(mime))
}
