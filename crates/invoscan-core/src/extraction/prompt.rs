//! Prompt assembly for the structured extraction request.

use tracing::warn;

/// System message sent with every extraction request.
pub const SYSTEM_MESSAGE: &str =
    "You are a helpful assistant who understands and parses invoices from text to JSON format.";

/// Instructions and field schema. The document text is appended verbatim.
pub const INSTRUCTIONS: &str = r#"
    Create a table from the given Invoice Text of the invoice as a JSON object.
    The given image is the invoice.
    Return the created table as a JSON object.
    No descriptions and explanations. Return only raw JSON object without markdown. No markdown format.
    The required properties in JSON object are as follows.

    [Properties in JSON object]
    "invoiceTitle": "title of invoice"
    "invoiceDate": "date of invoice"
    "invoiceNumber": "number of the invoice"
    "invoiceDestinationName": "Name of destination on invoice"
    "invoiceDestinationAddress": "address of the destination of invoice"
    "paymentMethod": "a partial of the credit card used to make the payment. This could include the credit card processor"
    "totalCost": "total amount of all costs"
    "grandTotal": "total amount of all costs + taxes"
    "taxes": "total amount of taxes"
    "invoiceItems": "Array of invoice items. This is an array of objects of the invoice items."

    [Properties of the "invoiceItems" object]
    "description": "title or description of the invoice item"
    "quantity": "the quantity of the invoice item"
    "unitCost": "the unit cost of the invoice item"
    "totalCost": "the total cost of the invoice item"

    If the required information is not found set "no value".
    Return only raw JSON object without markdown. No markdown format. No markdown tags.

    [Invoice Text]

    "#;

/// Builds user prompts from document text.
#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    max_chars: usize,
}

impl PromptAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the document text placed in the prompt (0 = unlimited).
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Instructions followed by the (possibly truncated) document text.
    pub fn assemble(&self, document_text: &str) -> String {
        let body = match document_text.char_indices().nth(self.max_chars) {
            Some((cut, _)) if self.max_chars > 0 => {
                warn!(
                    "Document text truncated to {} characters for the prompt ({} bytes dropped)",
                    self.max_chars,
                    document_text.len() - cut
                );
                &document_text[..cut]
            }
            _ => document_text,
        };

        let mut prompt = String::with_capacity(INSTRUCTIONS.len() + body.len());
        prompt.push_str(INSTRUCTIONS);
        prompt.push_str(body);
        prompt
    }
}
