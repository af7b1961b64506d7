//! Full page rendering through PDFium.
//!
//! Requires the PDFium shared library at runtime, either at the configured
//! path, next to the executable's working directory, or installed system-wide.

use std::path::PathBuf;

use pdfium_render::prelude::*;
use tracing::debug;

use super::{Rasterizer, Result};
use crate::error::RenderError;
use crate::models::pixels::PixelBuffer;

/// Rasterizer backed by `pdfium-render`.
///
/// The library is bound per call so the rasterizer itself stays `Send + Sync`
/// and can be shared between concurrent documents.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
    annotations: bool,
}

impl PdfiumRasterizer {
    pub fn new() -> Self {
        Self {
            library: None,
            annotations: true,
        }
    }

    /// Use an explicit PDFium shared library.
    pub fn with_library(mut self, library: Option<PathBuf>) -> Self {
        self.library = library;
        self
    }

    /// Render annotations along with page content.
    pub fn with_annotations(mut self, annotations: bool) -> Self {
        self.annotations = annotations;
        self
    }

    fn bind(&self) -> Result<Pdfium> {
        let bindings = match &self.library {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| RenderError::Backend(e.to_string()))?;

        Ok(Pdfium::new(bindings))
    }
}

impl Default for PdfiumRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn page_count(&self, data: &[u8]) -> Result<usize> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| RenderError::Parse(e.to_string()))?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(&self, data: &[u8], index: usize, scale: f32) -> Result<PixelBuffer> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(data, None)
            .map_err(|e| RenderError::Parse(e.to_string()))?;

        let count = document.pages().len() as usize;
        let page_index = u16::try_from(index)
            .ok()
            .filter(|_| index < count)
            .ok_or(RenderError::InvalidPage { index, count })?;

        let page = document
            .pages()
            .get(page_index)
            .map_err(|e| RenderError::Rasterize {
                index,
                reason: e.to_string(),
            })?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(scale)
            .render_annotations(self.annotations);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RenderError::Rasterize {
                index,
                reason: e.to_string(),
            })?;

        let width = bitmap.width() as u32;
        let height = bitmap.height() as u32;
        let raw = bitmap.as_raw_bytes();
        let stride = if height > 0 { raw.len() / height as usize } else { 0 };

        debug!("Rendered page {} at {}x: {}x{}", index, scale, width, height);

        PixelBuffer::from_bgra(width, height, stride, &raw).ok_or_else(|| RenderError::Rasterize {
            index,
            reason: format!("unexpected bitmap size {} for {}x{}", raw.len(), width, height),
        })
    }
}
