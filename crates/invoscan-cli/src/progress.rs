//! Progress bar driven by pipeline stage transitions.

use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

use invoscan_core::{PipelineObserver, PipelineStage};

pub fn document_bar() -> ProgressBar {
    let pb = ProgressBar::new(1);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}") {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

/// One tick per page, one for the model call.
pub struct ProgressObserver {
    pb: ProgressBar,
    pages: AtomicUsize,
}

impl ProgressObserver {
    pub fn new(pb: ProgressBar) -> Self {
        Self {
            pb,
            pages: AtomicUsize::new(0),
        }
    }
}

impl PipelineObserver for ProgressObserver {
    fn on_open(&self, page_count: usize) {
        self.pages.store(page_count, Ordering::Relaxed);
        self.pb.set_length(page_count as u64 + 1);
    }

    fn on_stage(&self, stage: PipelineStage) {
        let pages = self.pages.load(Ordering::Relaxed);
        match stage {
            PipelineStage::Rasterizing { page } => {
                self.pb.set_message(format!("Rendering page {}/{}...", page + 1, pages));
            }
            PipelineStage::Extracting { page } => {
                self.pb.set_message(format!("Running OCR on page {}/{}...", page + 1, pages));
            }
            PipelineStage::Reconstructing { .. } => {}
            PipelineStage::Accumulating { .. } => self.pb.inc(1),
            PipelineStage::Prompting => self.pb.set_message("Building prompt..."),
            PipelineStage::Completing => self.pb.set_message("Waiting for model..."),
            PipelineStage::Completed => self.pb.inc(1),
            PipelineStage::Failed => self.pb.abandon_with_message("Failed"),
        }
    }
}
