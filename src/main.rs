use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pdf_image_compressor::dispatch::Detail;
use pdf_image_compressor::media::{sniff_mime, MediaKind, MIME_PDF};
use pdf_image_compressor::{
    process, CancellationToken, ConvertOptions, Mode, PageRasterizer, PdfOptions,
    PdfiumRasterizer, Quality, RasterOptions, Request, Settings,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMode {
    /// Shrink an image or PDF
    Compress,
    /// Wrap an image into a one-page PDF
    Convert,
}

/// Shrink JPEG/PNG/WebP images and PDFs, or convert an image to PDF
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input file (JPEG, PNG, WebP or PDF)
    input: PathBuf,

    /// Output file (defaults to <name>_compressed.<ext> or <name>.pdf next to the input)
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value = "compress")]
    mode: CliMode,

    /// Target size for compressed images, in KB
    #[arg(long, default_value_t = 500)]
    target_kb: usize,

    /// First JPEG quality tried for images (0-1]
    #[arg(long, default_value_t = 0.95)]
    start_quality: f32,

    /// Lowest JPEG quality tried for images (0-1]
    #[arg(long, default_value_t = 0.1)]
    min_quality: f32,

    /// Quality decrement between attempts
    #[arg(long, default_value_t = 0.05)]
    quality_step: f32,

    /// JPEG quality of rasterized PDF pages (0-1]
    #[arg(long, default_value_t = 0.75)]
    page_quality: f32,

    /// Pixels per point when rasterizing PDF pages
    #[arg(long, default_value_t = 1.5)]
    render_scale: f32,

    /// Give up on PDF rasterization after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn settings(&self) -> Result<Settings> {
        Ok(Settings {
            raster: RasterOptions::from_fractions(
                self.target_kb * 1024,
                self.start_quality,
                self.min_quality,
                self.quality_step,
            )?,
            pdf: PdfOptions {
                render_scale: self.render_scale,
                page_quality: Quality::from_fraction(self.page_quality)?,
            },
            convert: ConvertOptions::default(),
            ..Settings::default()
        })
    }
}

fn detect_mime(path: &Path, bytes: &[u8]) -> String {
    if let Some(mime) = sniff_mime(bytes) {
        return mime.to_string();
    }
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match by_extension.as_deref() {
        Some("pdf") => MIME_PDF.to_string(),
        _ => image::ImageFormat::from_path(path)
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string()),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .parse_default_env()
        .init();

    let settings = args.settings().context("Invalid options")?;
    let mode = match args.mode {
        CliMode::Compress => Mode::Compress,
        CliMode::Convert => Mode::Convert,
    };

    let bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;
    let mime = detect_mime(&args.input, &bytes);
    let file_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let request = Request::new(mode, file_name, mime, bytes);

    let rasterizer = if mode == Mode::Compress && request.kind() == MediaKind::Pdf {
        match PdfiumRasterizer::bind() {
            Ok(rasterizer) => Some(rasterizer),
            Err(e) => {
                log::warn!("{}; the PDF will only be re-saved", e);
                None
            }
        }
    } else {
        None
    };

    let cancel = CancellationToken::new();
    if let Some(secs) = args.timeout_secs {
        let token = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_secs(secs));
            token.cancel();
        });
    }

    let start = Instant::now();
    let processed = process(
        &request,
        &settings,
        rasterizer.as_ref().map(|r| r as &dyn PageRasterizer),
        &cancel,
    )
    .with_context(|| format!("Failed to process {}", args.input.display()))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_file_name(&processed.file_name));
    std::fs::write(&output, &processed.bytes)
        .with_context(|| format!("Failed to write output file: {}", output.display()))?;

    match &processed.detail {
        Detail::Image { quality, attempts } => println!(
            "Compressed at quality {:.2} after {} attempts",
            quality.as_fraction(),
            attempts
        ),
        Detail::Pdf {
            strategy,
            page_count,
        } => println!("Processed {} pages ({:?})", page_count, strategy),
        Detail::Converted {
            width,
            height,
            embedding,
        } => println!("Embedded {}x{} image ({:?})", width, height, embedding),
    }
    println!("{}", processed.summary());
    println!("Wrote {} in {:.2?}", output.display(), start.elapsed());

    Ok(())
}
