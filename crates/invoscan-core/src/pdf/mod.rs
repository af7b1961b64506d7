//! PDF loading and page rasterization.

mod embedded;
#[cfg(feature = "pdfium")]
mod pdfium;

pub use embedded::EmbeddedImageRasterizer;
#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;

use tracing::debug;

use crate::error::RenderError;
use crate::models::config::{RenderBackend, RenderConfig};
use crate::models::pixels::PixelBuffer;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Turns pages of a PDF byte stream into pixel buffers.
///
/// Implementations hold no per-document state, so one rasterizer can serve
/// any number of documents.
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, data: &[u8]) -> Result<usize>;

    /// Render the zero-based page `index`, scaling both axes by `scale`.
    fn render_page(&self, data: &[u8], index: usize, scale: f32) -> Result<PixelBuffer>;
}

impl<T: Rasterizer + ?Sized> Rasterizer for Box<T> {
    fn page_count(&self, data: &[u8]) -> Result<usize> {
        (**self).page_count(data)
    }

    fn render_page(&self, data: &[u8], index: usize, scale: f32) -> Result<PixelBuffer> {
        (**self).render_page(data, index, scale)
    }
}

/// A page of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Zero-based position in the document.
    pub index: usize,
}

/// Uploaded PDF bytes with their page count.
#[derive(Debug)]
pub struct Document {
    data: Vec<u8>,
    page_count: usize,
}

impl Document {
    /// Validate `data` with `rasterizer` and record its page count.
    pub fn open<R: Rasterizer + ?Sized>(data: Vec<u8>, rasterizer: &R) -> Result<Self> {
        let page_count = rasterizer.page_count(&data)?;
        if page_count == 0 {
            return Err(RenderError::NoPages);
        }
        debug!("Opened PDF with {} pages ({} bytes)", page_count, data.len());
        Ok(Self { data, page_count })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pages in document order.
    pub fn pages(&self) -> impl Iterator<Item = Page> + use<> {
        (0..self.page_count).map(|index| Page { index })
    }

    /// Rasterize one page.
    pub fn render<R: Rasterizer + ?Sized>(&self, page: Page, rasterizer: &R, scale: f32) -> Result<PixelBuffer> {
        if page.index >= self.page_count {
            return Err(RenderError::InvalidPage {
                index: page.index,
                count: self.page_count,
            });
        }
        rasterizer.render_page(&self.data, page.index, scale)
    }
}

/// Build the rasterizer selected in `config`.
pub fn create_rasterizer(config: &RenderConfig) -> Result<Box<dyn Rasterizer>> {
    match config.backend {
        #[cfg(feature = "pdfium")]
        RenderBackend::Pdfium => Ok(Box::new(
            PdfiumRasterizer::new()
                .with_library(config.pdfium_library.clone())
                .with_annotations(config.annotations),
        )),
        #[cfg(not(feature = "pdfium"))]
        RenderBackend::Pdfium => Err(RenderError::Backend(
            "built without the `pdfium` feature".to_string(),
        )),
        RenderBackend::Embedded => Ok(Box::new(EmbeddedImageRasterizer::new())),
    }
}

/// Fixed-size documents for tests in this crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::pixels::ChannelOrder;

    /// Treats the byte length as the page count and renders 1x1 buffers.
    pub struct CountingRasterizer;

    impl Rasterizer for CountingRasterizer {
        fn page_count(&self, data: &[u8]) -> Result<usize> {
            Ok(data.len())
        }

        fn render_page(&self, _data: &[u8], index: usize, _scale: f32) -> Result<PixelBuffer> {
            Ok(PixelBuffer::from_raw(1, 1, ChannelOrder::Bgr, vec![index as u8; 3])
                .expect("1x1 buffer"))
        }
    }
}
