//! Invoice record returned by the structured extraction step.
//!
//! Field names follow the schema the model is prompted with. Values are kept
//! exactly as the model produced them; only absent fields are filled in.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder for a field the model could not determine.
pub const NO_VALUE: &str = "no value";

/// A free-form scalar from the model output.
///
/// Strings and numbers are preserved untouched. Missing and `null` fields
/// become the [`NO_VALUE`] sentinel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Field(Value);

impl Field {
    /// Wrap any JSON value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// The underlying JSON value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The value as a string slice, if it is a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// True when the field holds the sentinel.
    pub fn is_missing(&self) -> bool {
        self.as_str() == Some(NO_VALUE)
    }
}

impl Default for Field {
    fn default() -> Self {
        Self(Value::String(NO_VALUE.to_string()))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?
            .map(Field)
            .unwrap_or_default())
    }
}

/// A single line item on the invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvoiceItem {
    /// Title or description of the item.
    pub description: Field,
    /// Quantity.
    pub quantity: Field,
    /// Unit cost.
    pub unit_cost: Field,
    /// Line total.
    pub total_cost: Field,
}

/// The `invoiceItems` field: a list, or a scalar such as the sentinel when
/// the model found no items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvoiceItems {
    /// Items found on the invoice.
    Listed(Vec<InvoiceItem>),
    /// Anything else the model put there.
    Unlisted(Field),
}

impl Default for InvoiceItems {
    fn default() -> Self {
        Self::Unlisted(Field::default())
    }
}

impl InvoiceItems {
    /// Items as a slice; empty unless the model returned a list.
    pub fn as_slice(&self) -> &[InvoiceItem] {
        match self {
            Self::Listed(items) => items,
            Self::Unlisted(_) => &[],
        }
    }
}

/// Invoice fields as returned by the model.
///
/// Unknown keys in the model output are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedInvoice {
    /// Title of the invoice.
    pub invoice_title: Field,
    /// Invoice date.
    pub invoice_date: Field,
    /// Invoice number.
    pub invoice_number: Field,
    /// Name of the destination.
    pub invoice_destination_name: Field,
    /// Address of the destination.
    pub invoice_destination_address: Field,
    /// Partial card number and/or processor.
    pub payment_method: Field,
    /// Total of all costs.
    pub total_cost: Field,
    /// Total including taxes.
    pub grand_total: Field,
    /// Total taxes.
    pub taxes: Field,
    /// Line items.
    pub invoice_items: InvoiceItems,
}

/// The record returned to callers: model fields plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Fields extracted by the model.
    #[serde(flatten)]
    pub invoice: ExtractedInvoice,

    /// Original upload file name (name component only).
    pub file_name: String,

    /// Full reconstructed, sanitized document text.
    pub invoice_text: String,
}

impl InvoiceRecord {
    /// Attach provenance to extracted fields.
    pub fn new(invoice: ExtractedInvoice, file_name: impl Into<String>, invoice_text: impl Into<String>) -> Self {
        Self {
            invoice,
            file_name: file_name.into(),
            invoice_text: invoice_text.into(),
        }
    }

    /// Names of schema fields the model left at the sentinel.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let inv = &self.invoice;
        let fields: [(&'static str, &Field); 9] = [
            ("invoiceTitle", &inv.invoice_title),
            ("invoiceDate", &inv.invoice_date),
            ("invoiceNumber", &inv.invoice_number),
            ("invoiceDestinationName", &inv.invoice_destination_name),
            ("invoiceDestinationAddress", &inv.invoice_destination_address),
            ("paymentMethod", &inv.payment_method),
            ("totalCost", &inv.total_cost),
            ("grandTotal", &inv.grand_total),
            ("taxes", &inv.taxes),
        ];
        fields
            .into_iter()
            .filter(|(_, field)| field.is_missing())
            .map(|(name, _)| name)
            .collect()
    }
}
