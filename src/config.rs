//! Tunables for every pipeline.
//!
//! Qualities are kept as whole percentages so that stepping down by 0.05 is
//! exact and the loop bound is easy to reason about.

use crate::error::{CompressError, Result};

/// JPEG quality in (0.0, 1.0], stored as a percentage in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const PDF_PAGE: Quality = Quality(75);
    pub const TRANSCODE: Quality = Quality(95);

    pub const fn from_percent(percent: u8) -> Option<Quality> {
        if percent >= 1 && percent <= 100 {
            Some(Quality(percent))
        } else {
            None
        }
    }

    /// Accepts a fraction in (0.0, 1.0], rounded to the nearest percent.
    pub fn from_fraction(value: f32) -> Result<Quality> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(CompressError::InvalidOptions(format!(
                "quality {} is outside (0, 1]",
                value
            )));
        }
        let percent = (value * 100.0).round() as u8;
        Quality::from_percent(percent).ok_or_else(|| {
            CompressError::InvalidOptions(format!("quality {} rounds to zero", value))
        })
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    pub fn as_fraction(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

/// Options for the iterative raster compressor.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Stop as soon as an encoding is at most this many bytes.
    pub target_size: usize,
    pub start_quality: Quality,
    /// Quality floor; reaching it stops the search regardless of size.
    pub min_quality: Quality,
    /// Decrement per attempt, in percentage points.
    pub quality_step: u8,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            target_size: 500 * 1024,
            start_quality: Quality(95),
            min_quality: Quality(10),
            quality_step: 5,
        }
    }
}

impl RasterOptions {
    /// Builds options from the fractional form used by callers (0.95, 0.1, 0.05).
    pub fn from_fractions(
        target_size: usize,
        start_quality: f32,
        min_quality: f32,
        quality_step: f32,
    ) -> Result<Self> {
        let step = (quality_step * 100.0).round();
        if !(1.0..=100.0).contains(&step) {
            return Err(CompressError::InvalidOptions(format!(
                "quality step {} must be between 0.01 and 1",
                quality_step
            )));
        }
        let options = Self {
            target_size,
            start_quality: Quality::from_fraction(start_quality)?,
            min_quality: Quality::from_fraction(min_quality)?,
            quality_step: step as u8,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quality_step == 0 {
            return Err(CompressError::InvalidOptions(
                "quality step must be positive".to_string(),
            ));
        }
        if self.min_quality > self.start_quality {
            return Err(CompressError::InvalidOptions(format!(
                "quality floor {} is above the starting quality {}",
                self.min_quality.as_fraction(),
                self.start_quality.as_fraction()
            )));
        }
        Ok(())
    }

    /// Upper bound on encode attempts: `ceil((start - floor) / step) + 1`.
    pub fn max_attempts(&self) -> usize {
        let span = self.start_quality.0.saturating_sub(self.min_quality.0) as usize;
        span.div_ceil(self.quality_step.max(1) as usize) + 1
    }
}

/// Options for the rasterize-and-re-embed PDF pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    /// Pixels per PDF point when rendering a page.
    pub render_scale: f32,
    pub page_quality: Quality,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            render_scale: 1.5,
            page_quality: Quality::PDF_PAGE,
        }
    }
}

impl PdfOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            return Err(CompressError::InvalidOptions(format!(
                "render scale {} must be positive",
                self.render_scale
            )));
        }
        Ok(())
    }
}

/// Options for wrapping an image into a PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    /// Quality used when the input must be transcoded to JPEG first.
    pub transcode_quality: Quality,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            transcode_quality: Quality::TRANSCODE,
        }
    }
}

/// Everything the dispatcher needs for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub raster: RasterOptions,
    pub pdf: PdfOptions,
    pub convert: ConvertOptions,
    /// Inputs larger than this are rejected before any work starts.
    pub max_input_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            raster: RasterOptions::default(),
            pdf: PdfOptions::default(),
            convert: ConvertOptions::default(),
            max_input_size: 10 * 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.raster.validate()?;
        self.pdf.validate()
    }
}
