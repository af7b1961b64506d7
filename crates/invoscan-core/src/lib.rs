//! Core library for scanned invoice extraction.
//!
//! This crate provides:
//! - PDF page rasterization (PDFium, or embedded scan images via lopdf)
//! - OCR through a pluggable engine, with reading-order line reconstruction
//! - Structured invoice extraction through a chat-completion model
//! - The pipeline that sequences them for one document

pub mod auth;
pub mod error;
pub mod extraction;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod text;

pub use auth::{ApiKeyStore, StaticKeyStore};
pub use error::{CompletionError, OcrError, RenderError, Result, ScanError};
pub use extraction::{CompletionClient, InvoiceExtractor, OpenAiClient};
pub use models::config::ScanConfig;
pub use models::invoice::{ExtractedInvoice, Field, InvoiceItem, InvoiceItems, InvoiceRecord, NO_VALUE};
pub use models::pixels::{ChannelOrder, PixelBuffer};
pub use ocr::{Line, LineReconstructor, OcrEngine, OcrFragment, Point};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{Document, EmbeddedImageRasterizer, Page, Rasterizer, create_rasterizer};
#[cfg(feature = "pdfium")]
pub use pdf::PdfiumRasterizer;
pub use pipeline::{DocumentReader, InvoicePipeline, PipelineObserver, PipelineStage, Upload};
