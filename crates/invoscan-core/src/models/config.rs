//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ScanError;

/// Magnification the line tolerance is calibrated against.
pub const REFERENCE_MAGNIFICATION: f32 = 4.0;

/// Main configuration for the invoscan pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Page rasterization configuration.
    pub render: RenderConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Line reconstruction configuration.
    pub layout: LayoutConfig,

    /// Model completion configuration.
    pub completion: CompletionConfig,

    /// HTTP service configuration.
    pub server: ServerConfig,
}

/// Which rasterizer turns pages into pixel buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderBackend {
    /// Full page rendering through PDFium.
    Pdfium,
    /// Scanned pages only: reuse the image embedded in each page.
    Embedded,
}

/// Page rasterization configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Rasterizer implementation.
    pub backend: RenderBackend,

    /// Zoom factor applied to both axes.
    pub magnification: f32,

    /// Render annotations along with page content.
    pub annotations: bool,

    /// Explicit PDFium shared library path.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: RenderBackend::Pdfium,
            magnification: REFERENCE_MAGNIFICATION,
            annotations: true,
            pdfium_library: None,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Drop fragments recognized below this confidence (0.0 - 1.0).
    pub min_confidence: f32,

    /// Keep the recognizer's `[UNK]` token instead of blanking it.
    pub keep_unk: bool,

    /// Use GPU if available.
    pub use_gpu: bool,

    /// Log per-page engine statistics at info level.
    pub show_log: bool,

    /// Build the engine once and share it instead of once per document.
    pub reuse_engine: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            min_confidence: 0.0,
            keep_unk: false,
            use_gpu: false,
            show_log: false,
            reuse_engine: false,
        }
    }
}

impl OcrConfig {
    /// Full paths of the detection model, recognition model and dictionary.
    pub fn model_paths(&self) -> (PathBuf, PathBuf, PathBuf) {
        (
            self.model_dir.join(&self.detection_model),
            self.model_dir.join(&self.recognition_model),
            self.model_dir.join(&self.dictionary),
        )
    }
}

/// Which fragment a candidate is compared against when grouping lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineBaseline {
    /// The first fragment of the current line.
    #[default]
    Anchor,
    /// The most recently added fragment (lines may drift).
    Previous,
}

/// Line reconstruction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Maximum vertical distance between fragments of one line, in pixels
    /// at [`REFERENCE_MAGNIFICATION`].
    pub line_tolerance: f32,

    /// Grouping baseline.
    pub baseline: LineBaseline,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 20.0,
            baseline: LineBaseline::Anchor,
        }
    }
}

impl LayoutConfig {
    /// Tolerance in pixels of a page rendered at `magnification`.
    pub fn tolerance_at(&self, magnification: f32) -> f32 {
        self.line_tolerance * magnification / REFERENCE_MAGNIFICATION
    }
}

/// Model completion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API.
    pub base_url: String,

    /// Model name.
    pub model: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Maximum document characters placed in the prompt (0 = unlimited).
    pub max_prompt_chars: usize,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.0,
            api_key_env: "OPENAI_KEY".to_string(),
            timeout_secs: 120,
            max_prompt_chars: 0,
        }
    }
}

impl CompletionConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, ScanError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ScanError::Config(format!("environment variable {} is not set", self.api_key_env))
            })
    }
}

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub addr: SocketAddr,

    /// File with one accepted API key per line. Unset disables key checks.
    pub api_keys_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            api_keys_file: None,
        }
    }
}

impl ScanConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Line tolerance for pages rendered with the configured magnification.
    pub fn line_tolerance(&self) -> f32 {
        self.layout.tolerance_at(self.render.magnification)
    }
}
