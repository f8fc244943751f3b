//! Page rasterization.
//!
//! The PDF pipeline only talks to [`PageRasterizer`] and [`RasterDocument`];
//! [`PdfiumRasterizer`] is the production backend.

use image::DynamicImage;
use log::debug;
use pdfium_render::prelude::*;

use crate::error::{CompressError, Result};

/// A page flattened to pixels.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 1-based page number in the source document.
    pub page_number: usize,
    pub width: u32,
    pub height: u32,
    pub image: DynamicImage,
}

/// Opens PDF payloads into page-addressable documents.
pub trait PageRasterizer {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn RasterDocument + 'a>>;
}

/// A loaded document that can render its pages one at a time.
pub trait RasterDocument {
    fn page_count(&self) -> usize;

    /// Renders page `page_number` (1-based) at `scale` pixels per point.
    fn render_page(&self, page_number: usize, scale: f32) -> Result<RenderedPage>;
}

/// Pixel size of a page of `width_pts` x `height_pts` rendered at `scale`.
pub fn scaled_dimensions(width_pts: f32, height_pts: f32, scale: f32) -> (u32, u32) {
    let width = (width_pts * scale).round().max(1.0) as u32;
    let height = (height_pts * scale).round().max(1.0) as u32;
    (width, height)
}

/// Checks a 1-based page number against the page count.
pub fn check_page_number(page_number: usize, page_count: usize) -> Result<()> {
    if page_number == 0 || page_number > page_count {
        return Err(CompressError::Render {
            page: page_number,
            message: format!("page out of range (document has {} pages)", page_count),
        });
    }
    Ok(())
}

/// PDFium-backed rasterizer (dynamically linked).
pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Binds libpdfium, searching:
    /// 1. Current directory
    /// 2. vendor/pdfium/lib/
    /// 3. System library paths
    #[cfg(not(target_arch = "wasm32"))]
    pub fn bind() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                    "./vendor/pdfium/lib/",
                ))
            })
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(bind_error)?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Binds the PDFium module the page has loaded and initialized.
    #[cfg(target_arch = "wasm32")]
    pub fn bind() -> Result<Self> {
        let bindings = Pdfium::bind_to_system_library().map_err(bind_error)?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }
}

fn bind_error(e: PdfiumError) -> CompressError {
    CompressError::Render {
        page: 0,
        message: format!("Failed to load PDFium library: {:?}", e),
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn RasterDocument + 'a>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| CompressError::Parse(format!("{:?}", e)))?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl RasterDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, page_number: usize, scale: f32) -> Result<RenderedPage> {
        check_page_number(page_number, self.page_count())?;

        let render_error = |message: String| CompressError::Render {
            page: page_number,
            message,
        };

        let pages = self.document.pages();
        let page = pages
            .get((page_number - 1) as u16)
            .map_err(|e| render_error(format!("{:?}", e)))?;

        let (width, height) = scaled_dimensions(page.width().value, page.height().value, scale);
        debug!("Rendering page {} at {}x{}", page_number, width, height);

        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_error(format!("{:?}", e)))?;

        let image: DynamicImage = bitmap.as_image();

        Ok(RenderedPage {
            page_number,
            width: image.width(),
            height: image.height(),
            image,
        })
    }
}
