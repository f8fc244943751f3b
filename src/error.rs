use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompressError>;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("Failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("Failed to render page {page}: {message}")]
    Render { page: usize, message: String },

    #[error("Unsupported image format ({mime}): {message}")]
    UnsupportedFormat { mime: String, message: String },

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("PDF compression failed ({primary}) and re-saving the original failed too ({fallback})")]
    FallbackFailure {
        primary: Box<CompressError>,
        fallback: Box<CompressError>,
    },

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("File is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("No page rasterizer is available")]
    RasterizerUnavailable,

    #[error("Processing was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for CompressError {
    fn from(e: lopdf::Error) -> Self {
        CompressError::Save(e.to_string())
    }
}
