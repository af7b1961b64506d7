//! Builds the rasterizer, OCR engine and model client from configuration.
//!
//! Everything here blocks (model loading, the blocking HTTP client), so
//! callers in async code go through `spawn_blocking`.

use std::sync::Arc;

use tracing::debug;

use invoscan_core::{
    DocumentReader, InvoicePipeline, OcrEngine, OpenAiClient, PureOcrEngine, Rasterizer, Result, ScanConfig,
    create_rasterizer,
};

pub type Reader = DocumentReader<Box<dyn Rasterizer>, Arc<dyn OcrEngine>>;
pub type Pipeline = InvoicePipeline<Box<dyn Rasterizer>, Arc<dyn OcrEngine>, OpenAiClient>;

/// Configuration plus the OCR engine when it is shared between documents.
pub struct Engines {
    config: ScanConfig,
    shared_ocr: Option<Arc<dyn OcrEngine>>,
}

impl Engines {
    pub fn new(config: ScanConfig) -> Result<Self> {
        let shared_ocr = if config.ocr.reuse_engine {
            debug!("Loading shared OCR engine");
            Some(Arc::new(PureOcrEngine::new(config.ocr.clone())?) as Arc<dyn OcrEngine>)
        } else {
            None
        };

        Ok(Self { config, shared_ocr })
    }

    /// The shared engine, or a freshly loaded one.
    pub fn ocr(&self) -> Result<Arc<dyn OcrEngine>> {
        match &self.shared_ocr {
            Some(engine) => Ok(Arc::clone(engine)),
            None => Ok(Arc::new(PureOcrEngine::new(self.config.ocr.clone())?)),
        }
    }

    /// Text-only reader; needs no model credentials.
    pub fn reader(&self) -> Result<Reader> {
        let rasterizer = create_rasterizer(&self.config.render)?;
        Ok(DocumentReader::new(&self.config, rasterizer, self.ocr()?))
    }

    /// Full pipeline for one document.
    pub fn pipeline(&self) -> Result<Pipeline> {
        let rasterizer = create_rasterizer(&self.config.render)?;
        let client = OpenAiClient::from_config(&self.config.completion)?;
        Ok(InvoicePipeline::new(&self.config, rasterizer, self.ocr()?, client))
    }
}
