//! MIME handling and output file naming.

use lazy_static::lazy_static;
use regex::Regex;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_WEBP: &str = "image/webp";

lazy_static! {
    static ref EXTENSION: Regex = Regex::new(r"\.[^/.]+$").unwrap();
}

/// What the pipelines care about in a declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Pdf,
    Jpeg,
    Png,
    /// Any other image type; decoded and transcoded when needed.
    OtherImage,
}

impl MediaKind {
    pub fn from_mime(mime: &str) -> MediaKind {
        match mime.trim().to_ascii_lowercase().as_str() {
            MIME_PDF => MediaKind::Pdf,
            "image/jpeg" | "image/jpg" => MediaKind::Jpeg,
            MIME_PNG => MediaKind::Png,
            _ => MediaKind::OtherImage,
        }
    }
}

/// Guesses a MIME type from the payload itself, for callers that have none.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF-") {
        return Some(MIME_PDF);
    }
    let format = image::guess_format(bytes).ok()?;
    Some(format.to_mime_type())
}

/// Strips the last extension, keeping dots that belong to directories.
pub fn file_stem(name: &str) -> &str {
    match EXTENSION.find(name) {
        Some(m) => &name[..m.start()],
        None => name,
    }
}

/// Name for the processed file: `<base>.pdf` for conversions,
/// `<base>_compressed.pdf` for PDFs and `<base>_compressed.jpg` for images.
pub fn output_file_name(original_name: &str, convert: bool, input_kind: MediaKind) -> String {
    let stem = file_stem(original_name);
    if convert {
        format!("{}.pdf", stem)
    } else if input_kind == MediaKind::Pdf {
        format!("{}_compressed.pdf", stem)
    } else {
        format!("{}_compressed.jpg", stem)
    }
}
