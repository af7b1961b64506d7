//! Pure Rust OCR engine wrapper using `pure-onnx-ocr`.

use std::sync::Mutex;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::models::pixels::{ChannelOrder, PixelBuffer};

use super::{OcrEngine, OcrFragment, Point};

/// OCR engine backed by `pure-onnx-ocr` (PaddleOCR models, no external ONNX Runtime).
pub struct PureOcrEngine {
    engine: Mutex<pure_onnx_ocr::engine::OcrEngine>,
    config: OcrConfig,
}

impl PureOcrEngine {
    /// Load detection and recognition models from `config.model_dir`.
    pub fn new(config: OcrConfig) -> Result<Self, OcrError> {
        let (det_path, rec_path, dict_path) = config.model_paths();

        for path in [&det_path, &rec_path, &dict_path] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!("missing model file {}", path.display())));
            }
        }

        if config.use_gpu {
            warn!("GPU requested but pure-onnx-ocr runs on CPU only");
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        debug!("Loaded pure-onnx-ocr engine from {}", config.model_dir.display());

        Ok(Self {
            engine: Mutex::new(engine),
            config,
        })
    }

    pub fn config(&self) -> &OcrConfig {
        &self.config
    }
}

impl OcrEngine for PureOcrEngine {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<OcrFragment>, OcrError> {
        if image.is_empty() {
            return Err(OcrError::InvalidImage(format!(
                "zero-size buffer {}x{}",
                image.width(),
                image.height()
            )));
        }

        let start = Instant::now();
        let input = image
            .to_dynamic_image()
            .ok_or_else(|| OcrError::InvalidImage("buffer does not match its dimensions".to_string()))?;

        let results = {
            let engine = self
                .engine
                .lock()
                .map_err(|_| OcrError::Engine("engine lock poisoned".to_string()))?;
            engine
                .run_from_image(&input)
                .map_err(|e| OcrError::Engine(format!("pure-onnx-ocr: {}", e)))?
        };

        let fragments: Vec<OcrFragment> = results
            .iter()
            .filter(|r| r.confidence >= self.config.min_confidence)
            .map(|r| {
                let text = if self.config.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                };
                OcrFragment::new(polygon_to_quad(&r.bounding_box), text, r.confidence)
            })
            .collect();

        let elapsed = start.elapsed().as_millis();
        if self.config.show_log {
            info!(
                "OCR {}x{}: {} of {} fragments kept in {}ms",
                image.width(),
                image.height(),
                fragments.len(),
                results.len(),
                elapsed
            );
        } else {
            debug!("OCR returned {} fragments in {}ms", fragments.len(), elapsed);
        }

        Ok(fragments)
    }

    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }
}

/// First four exterior points of the detection polygon.
fn polygon_to_quad(polygon: &pure_onnx_ocr::Polygon<f64>) -> [Point; 4] {
    let mut quad = [Point::new(0.0, 0.0); 4];
    for (corner, coord) in quad.iter_mut().zip(polygon.exterior().coords()) {
        *corner = Point::new(coord.x as f32, coord.y as f32);
    }
    quad
}
