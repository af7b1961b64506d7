//! Document-to-record orchestration.
//!
//! One pipeline run processes one document strictly in page order:
//! rasterize, recognize, reconstruct and accumulate each page, then issue a
//! single completion for the whole document. Any error aborts the run.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::extraction::{CompletionClient, InvoiceExtractor};
use crate::models::config::ScanConfig;
use crate::models::invoice::InvoiceRecord;
use crate::ocr::{LineReconstructor, OcrEngine};
use crate::pdf::{Document, Page, Rasterizer};
use crate::text;

/// An uploaded document.
#[derive(Debug, Clone)]
pub struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

impl Upload {
    /// Keep only the final component of `name`, whichever separator it uses.
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name).to_string();
        Self { file_name, bytes }
    }

    /// Read an upload from disk.
    pub fn from_path(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(&path.to_string_lossy(), bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Rasterizing { page: usize },
    Extracting { page: usize },
    Reconstructing { page: usize },
    Accumulating { page: usize },
    Prompting,
    Completing,
    Completed,
    Failed,
}

/// Receives stage transitions, e.g. to drive a progress display.
pub trait PipelineObserver: Send + Sync {
    /// Called once the document is opened.
    fn on_open(&self, _page_count: usize) {}

    /// Called on every stage transition.
    fn on_stage(&self, stage: PipelineStage);
}

/// Rasterizer and OCR engine producing the sanitized text of a document.
pub struct DocumentReader<R: Rasterizer, O: OcrEngine> {
    rasterizer: R,
    ocr: O,
    lines: LineReconstructor,
    magnification: f32,
    observer: Option<Arc<dyn PipelineObserver>>,
}

impl<R: Rasterizer, O: OcrEngine> DocumentReader<R, O> {
    /// Create a reader using the render and layout settings of `config`.
    pub fn new(config: &ScanConfig, rasterizer: R, ocr: O) -> Self {
        Self {
            rasterizer,
            ocr,
            lines: LineReconstructor::from_config(config),
            magnification: config.render.magnification,
            observer: None,
        }
    }

    /// Report stage transitions to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Reconstruct the sanitized text of every page, one newline after each.
    pub fn document_text(&self, bytes: Vec<u8>) -> Result<String> {
        let document = Document::open(bytes, &self.rasterizer)?;
        if let Some(observer) = &self.observer {
            observer.on_open(document.page_count());
        }

        let mut document_text = String::new();
        for page in document.pages() {
            let page_text = self.page_text(&document, page)?;
            self.report(PipelineStage::Accumulating { page: page.index });
            text::accumulate_page(&mut document_text, &page_text);
        }

        debug!(
            "Document text: {} pages, {} characters",
            document.page_count(),
            document_text.len()
        );
        Ok(document_text)
    }

    fn page_text(&self, document: &Document, page: Page) -> Result<String> {
        let start = Instant::now();

        self.report(PipelineStage::Rasterizing { page: page.index });
        let buffer = document
            .render(page, &self.rasterizer, self.magnification)?
            .into_order(self.ocr.channel_order());

        self.report(PipelineStage::Extracting { page: page.index });
        let fragments = self.ocr.recognize(&buffer)?;
        drop(buffer);

        self.report(PipelineStage::Reconstructing { page: page.index });
        let fragment_count = fragments.len();
        let page_text = self.lines.page_text(fragments);

        debug!(
            "Page {}: {} fragments, {} characters in {}ms",
            page.index,
            fragment_count,
            page_text.len(),
            start.elapsed().as_millis()
        );
        Ok(page_text)
    }

    fn report(&self, stage: PipelineStage) {
        if let Some(observer) = &self.observer {
            observer.on_stage(stage);
        }
    }
}

/// Rasterizer, OCR engine and model client wired into one pipeline.
pub struct InvoicePipeline<R: Rasterizer, O: OcrEngine, C: CompletionClient> {
    reader: DocumentReader<R, O>,
    extractor: InvoiceExtractor<C>,
}

impl<R: Rasterizer, O: OcrEngine, C: CompletionClient> InvoicePipeline<R, O, C> {
    /// Create a pipeline using the render, layout and completion settings
    /// of `config`.
    pub fn new(config: &ScanConfig, rasterizer: R, ocr: O, client: C) -> Self {
        Self {
            reader: DocumentReader::new(config, rasterizer, ocr),
            extractor: InvoiceExtractor::new(client).with_config(&config.completion),
        }
    }

    /// Report stage transitions to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.reader = self.reader.with_observer(observer);
        self
    }

    /// Turn an upload into an invoice record.
    ///
    /// The upload is consumed and released whichever way the run ends.
    pub fn parse(&self, upload: Upload) -> Result<InvoiceRecord> {
        let start = Instant::now();
        let Upload { file_name, bytes } = upload;
        info!("Parsing {} ({} bytes)", file_name, bytes.len());

        let result = self.run(&file_name, bytes);
        match &result {
            Ok(_) => {
                self.reader.report(PipelineStage::Completed);
                info!("Parsed {} in {}ms", file_name, start.elapsed().as_millis());
            }
            Err(e) => {
                self.reader.report(PipelineStage::Failed);
                warn!("Parsing {} failed: {}", file_name, e);
            }
        }
        result
    }

    /// Reconstruct the sanitized text of every page without calling the model.
    pub fn document_text(&self, bytes: Vec<u8>) -> Result<String> {
        self.reader.document_text(bytes)
    }

    fn run(&self, file_name: &str, bytes: Vec<u8>) -> Result<InvoiceRecord> {
        let document_text = self.reader.document_text(bytes)?;

        self.reader.report(PipelineStage::Prompting);
        let prompt = self.extractor.prompt(&document_text);

        self.reader.report(PipelineStage::Completing);
        Ok(self.extractor.complete(file_name, &document_text, &prompt)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upload_keeps_only_file_name() {
        assert_eq!(Upload::new("/tmp/uploads/inv.pdf", vec![]).file_name(), "inv.pdf");
        assert_eq!(Upload::new("C:\\scans\\inv 2.pdf", vec![]).file_name(), "inv 2.pdf");
        assert_eq!(Upload::new("plain.pdf", vec![1]).file_name(), "plain.pdf");
    }
}
