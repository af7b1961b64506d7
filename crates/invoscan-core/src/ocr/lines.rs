//! Reading-order reconstruction of OCR fragments.
//!
//! Engines report fragments in detection order. Fragments are sorted by the
//! y-coordinate of their bottom-left corner and greedily grouped into lines:
//! a fragment joins the open line when its baseline lies within `tolerance`
//! of the line's reference fragment, otherwise it starts a new line. Each
//! line is then ordered left to right by bottom-left x.
//!
//! The reference fragment is chosen by [`LineBaseline`]. Comparing against
//! the previous fragment lets a long chain of slightly offset fragments drift
//! across several physical lines and merge them; comparing against the line's
//! first fragment bounds every line to `tolerance`.

use std::cmp::Ordering;

use tracing::trace;

use super::OcrFragment;
use crate::models::config::{LineBaseline, ScanConfig};

/// Fragments sharing one text line, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    fragments: Vec<OcrFragment>,
}

impl Line {
    fn new(mut fragments: Vec<OcrFragment>) -> Self {
        fragments.sort_by(|a, b| by_coordinate(a.bottom_left().x, b.bottom_left().x));
        Self { fragments }
    }

    pub fn fragments(&self) -> &[OcrFragment] {
        &self.fragments
    }

    /// Fragment texts joined by single spaces.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

/// Groups a page's fragments into lines.
#[derive(Debug, Clone)]
pub struct LineReconstructor {
    tolerance: f32,
    baseline: LineBaseline,
}

impl LineReconstructor {
    /// Create a reconstructor with the given vertical tolerance in pixels.
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            baseline: LineBaseline::default(),
        }
    }

    /// Set the grouping baseline.
    pub fn with_baseline(mut self, baseline: LineBaseline) -> Self {
        self.baseline = baseline;
        self
    }

    /// Tolerance scaled to the configured magnification.
    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.line_tolerance()).with_baseline(config.layout.baseline)
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Group fragments into lines, top to bottom. Empty input yields no lines.
    pub fn group(&self, mut fragments: Vec<OcrFragment>) -> Vec<Line> {
        fragments.sort_by(|a, b| by_coordinate(a.bottom_left().y, b.bottom_left().y));

        let mut lines = Vec::new();
        let mut current: Vec<OcrFragment> = Vec::new();

        for fragment in fragments {
            let reference = match self.baseline {
                LineBaseline::Anchor => current.first(),
                LineBaseline::Previous => current.last(),
            };

            if let Some(reference) = reference {
                let distance = (fragment.bottom_left().y - reference.bottom_left().y).abs();
                if distance > self.tolerance {
                    lines.push(Line::new(std::mem::take(&mut current)));
                }
            }
            current.push(fragment);
        }

        if !current.is_empty() {
            lines.push(Line::new(current));
        }

        trace!("Grouped fragments into {} lines", lines.len());
        lines
    }

    /// Reconstruct the page text: one line of text per [`Line`].
    pub fn page_text(&self, fragments: Vec<OcrFragment>) -> String {
        serialize_lines(&self.group(fragments))
    }
}

/// Join line texts with newlines and trim the result.
pub fn serialize_lines(lines: &[Line]) -> String {
    lines
        .iter()
        .map(Line::text)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn by_coordinate(a: f32, b: f32) -> Ordering {
    a.total_cmp(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::Point;
    use pretty_assertions::assert_eq;

    /// A 40x10 box whose bottom-left corner is at (x, y).
    fn fragment(text: &str, x: f32, y: f32) -> OcrFragment {
        OcrFragment::new(
            [
                Point::new(x, y - 10.0),
                Point::new(x + 40.0, y - 10.0),
                Point::new(x + 40.0, y),
                Point::new(x, y),
            ],
            text,
            0.95,
        )
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::text).collect()
    }

    #[test]
    fn test_same_baseline_forms_one_line_left_to_right() {
        let reconstructor = LineReconstructor::new(20.0);
        let lines = reconstructor.group(vec![
            fragment("c", 300.0, 50.0),
            fragment("a", 10.0, 50.0),
            fragment("b", 150.0, 50.0),
        ]);
        assert_eq!(texts(&lines), vec!["a b c"]);
    }

    #[test]
    fn test_separated_baselines_form_one_line_each() {
        let reconstructor = LineReconstructor::new(20.0);
        let lines = reconstructor.group(vec![
            fragment("third", 0.0, 100.0),
            fragment("first", 0.0, 10.0),
            fragment("second", 0.0, 55.0),
        ]);
        assert_eq!(texts(&lines), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_previous_baseline_drifts_across_lines() {
        let reconstructor = LineReconstructor::new(20.0).with_baseline(LineBaseline::Previous);
        let lines = reconstructor.group(vec![
            fragment("a", 0.0, 0.0),
            fragment("b", 50.0, 15.0),
            fragment("c", 100.0, 30.0),
            fragment("d", 150.0, 45.0),
        ]);
        assert_eq!(texts(&lines), vec!["a b c d"]);
    }

    #[test]
    fn test_anchor_baseline_bounds_drift() {
        let reconstructor = LineReconstructor::new(20.0).with_baseline(LineBaseline::Anchor);
        let lines = reconstructor.group(vec![
            fragment("a", 0.0, 0.0),
            fragment("b", 50.0, 15.0),
            fragment("c", 100.0, 30.0),
            fragment("d", 150.0, 45.0),
        ]);
        assert_eq!(texts(&lines), vec!["a b", "c d"]);
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let reconstructor = LineReconstructor::new(20.0);
        let lines = reconstructor.group(vec![fragment("a", 0.0, 0.0), fragment("b", 50.0, 20.0)]);
        assert_eq!(texts(&lines), vec!["a b"]);
    }

    #[test]
    fn test_empty_page_has_no_text() {
        let reconstructor = LineReconstructor::new(20.0);
        assert!(reconstructor.group(Vec::new()).is_empty());
        assert_eq!(reconstructor.page_text(Vec::new()), "");
    }

    #[test]
    fn test_invoice_header_and_total() {
        let reconstructor = LineReconstructor::new(20.0);
        let text = reconstructor.page_text(vec![
            fragment("$50", 200.0, 102.0),
            fragment("#123", 200.0, 12.0),
            fragment("Total:", 10.0, 100.0),
            fragment("INVOICE", 10.0, 10.0),
        ]);
        assert_eq!(text, "INVOICE #123\nTotal: $50");
    }

    #[test]
    fn test_line_text_is_trimmed() {
        let reconstructor = LineReconstructor::new(20.0);
        let text = reconstructor.page_text(vec![fragment(" Amount ", 0.0, 0.0), fragment("due ", 80.0, 0.0)]);
        assert_eq!(text, "Amount  due");
    }

    #[test]
    fn test_from_config_scales_tolerance() {
        let mut config = ScanConfig::default();
        config.render.magnification = 2.0;
        assert_eq!(LineReconstructor::from_config(&config).tolerance(), 10.0);
    }
}
