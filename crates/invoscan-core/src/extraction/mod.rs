//! Structured invoice extraction through a generative text model.

mod client;
pub mod prompt;

pub use client::{CompletionClient, OpenAiClient};
pub use prompt::{PromptAssembler, SYSTEM_MESSAGE};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::CompletionError;
use crate::models::config::CompletionConfig;
use crate::models::invoice::{ExtractedInvoice, InvoiceRecord};

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Sends document text to a model and parses its answer into a record.
pub struct InvoiceExtractor<C: CompletionClient> {
    client: C,
    prompt: PromptAssembler,
}

impl<C: CompletionClient> InvoiceExtractor<C> {
    /// Create an extractor with an unlimited prompt budget.
    pub fn new(client: C) -> Self {
        Self {
            client,
            prompt: PromptAssembler::new(),
        }
    }

    /// Apply the prompt budget from configuration.
    pub fn with_config(mut self, config: &CompletionConfig) -> Self {
        self.prompt = PromptAssembler::new().with_max_chars(config.max_prompt_chars);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Issue one completion for `document_text` and build the record.
    pub fn extract(&self, file_name: &str, document_text: &str) -> Result<InvoiceRecord> {
        let user = self.prompt(document_text);
        self.complete(file_name, document_text, &user)
    }

    /// The user message sent for `document_text`.
    pub fn prompt(&self, document_text: &str) -> String {
        self.prompt.assemble(document_text)
    }

    /// Send an already assembled `prompt` and build the record around the
    /// full `document_text`.
    pub fn complete(&self, file_name: &str, document_text: &str, prompt: &str) -> Result<InvoiceRecord> {
        let content = self.client.complete(SYSTEM_MESSAGE, prompt)?;
        debug!("Model returned {} characters", content.len());

        let invoice = parse_response(&content)?;
        let record = InvoiceRecord::new(invoice, file_name, document_text);

        info!(
            "Extracted invoice from {} ({} items, {} fields without value)",
            file_name,
            record.invoice.invoice_items.as_slice().len(),
            record.missing_fields().len()
        );
        Ok(record)
    }
}

/// Parse model output strictly as a JSON invoice object.
///
/// Only surrounding whitespace is removed; markdown fences are not stripped
/// and make parsing fail. Any JSON value other than an object is rejected.
pub fn parse_response(content: &str) -> Result<ExtractedInvoice> {
    let value: Value = serde_json::from_str(content.trim())?;
    if !value.is_object() {
        return Err(CompletionError::ResponseParse(serde::de::Error::custom(format!(
            "expected an invoice object, found {}",
            json_kind(&value)
        ))));
    }
    Ok(serde_json::from_value(value)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
