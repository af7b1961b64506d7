//! OCR engines and reading-order reconstruction.

pub mod lines;
#[cfg(feature = "native")]
mod pure_engine;

pub use lines::{Line, LineReconstructor};
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::pixels::{ChannelOrder, PixelBuffer};

/// A corner of a fragment's bounding quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One detected span of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrFragment {
    /// Corners as produced by the engine: top-left, top-right,
    /// bottom-right, bottom-left.
    pub quad: [Point; 4],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl OcrFragment {
    pub fn new(quad: [Point; 4], text: impl Into<String>, confidence: f32) -> Self {
        Self {
            quad,
            text: text.into(),
            confidence,
        }
    }

    /// Build from a flat `[x1, y1, x2, y2, x3, y3, x4, y4]` box.
    pub fn from_bbox(bbox: [f32; 8], text: impl Into<String>, confidence: f32) -> Self {
        let quad = [
            Point::new(bbox[0], bbox[1]),
            Point::new(bbox[2], bbox[3]),
            Point::new(bbox[4], bbox[5]),
            Point::new(bbox[6], bbox[7]),
        ];
        Self::new(quad, text, confidence)
    }

    /// The bottom-left corner, which anchors line grouping and ordering.
    pub fn bottom_left(&self) -> Point {
        self.quad[3]
    }
}

/// An engine that finds text fragments in a page raster.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in `image`.
    ///
    /// Returns fragments in detection order. An empty list means no text was
    /// found; errors are reserved for buffers the engine cannot process.
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<OcrFragment>, OcrError>;

    /// Channel order the engine expects its input in.
    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Bgr
    }
}

impl<T: OcrEngine + ?Sized> OcrEngine for Arc<T> {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<OcrFragment>, OcrError> {
        (**self).recognize(image)
    }

    fn channel_order(&self) -> ChannelOrder {
        (**self).channel_order()
    }
}

impl<T: OcrEngine + ?Sized> OcrEngine for Box<T> {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<OcrFragment>, OcrError> {
        (**self).recognize(image)
    }

    fn channel_order(&self) -> ChannelOrder {
        (**self).channel_order()
    }
}
