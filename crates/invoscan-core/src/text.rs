//! Document text sanitizing.

/// Drop every character outside 7-bit ASCII.
pub fn to_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

/// Append a page's sanitized text and one newline to the document text.
pub fn accumulate_page(document: &mut String, page_text: &str) {
    document.push_str(&to_ascii(page_text));
    document.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_non_ascii_is_dropped_not_replaced() {
        assert_eq!(to_ascii("Total: 50 €"), "Total: 50 ");
        assert_eq!(to_ascii("Zürich Straße"), "Zrich Strae");
    }

    #[test]
    fn test_sanitizing_is_idempotent() {
        let once = to_ascii("Faktura № 12 – łódź\tok\n");
        assert_eq!(to_ascii(&once), once);
    }

    #[test]
    fn test_pages_each_end_with_one_newline() {
        let mut document = String::new();
        for page in ["INVOICE #123", "", "Total: $50 ✓"] {
            accumulate_page(&mut document, page);
        }
        assert_eq!(document, "INVOICE #123\n\nTotal: $50 \n");
    }
}
