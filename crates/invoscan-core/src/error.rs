//! Error types for the invoscan-core library.

use thiserror::Error;

/// Main error type for the invoscan library.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Page rasterization error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// OCR engine error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Structured extraction error.
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning document bytes into pixel buffers.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The byte stream is not a readable PDF.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Requested page index is out of range.
    #[error("invalid page index {index} (document has {count} pages)")]
    InvalidPage { index: usize, count: usize },

    /// The page could not be rasterized.
    #[error("failed to rasterize page {index}: {reason}")]
    Rasterize { index: usize, reason: String },

    /// The rendering backend could not be initialized.
    #[error("renderer unavailable: {0}")]
    Backend(String),
}

/// Errors related to OCR processing.
///
/// Finding no text is not an error: engines return an empty fragment list.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The engine failed while processing the buffer.
    #[error("engine failure: {0}")]
    Engine(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Errors raised while asking the model for a structured record.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// The model service was unreachable or timed out.
    #[error("model service unreachable: {0}")]
    Network(String),

    /// The model service answered with a non-success status.
    #[error("model service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response envelope carried no message content.
    #[error("model returned no content")]
    EmptyResponse,

    /// The response envelope itself could not be decoded.
    #[error("malformed completion envelope: {0}")]
    Envelope(String),

    /// The message content is not a JSON invoice object.
    #[error("model response is not valid JSON: {0}")]
    ResponseParse(#[from] serde_json::Error),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CompletionError::Envelope(err.to_string())
        } else {
            CompletionError::Network(err.to_string())
        }
    }
}

/// Result type for the invoscan library.
pub type Result<T> = std::result::Result<T, ScanError>;
