//! End-to-end pipeline tests with in-memory engines.

use std::sync::{Arc, Mutex};

use invoscan_core::models::config::LineBaseline;
use invoscan_core::{
    ChannelOrder, CompletionClient, CompletionError, DocumentReader, InvoicePipeline, OcrEngine, OcrError, OcrFragment,
    PipelineObserver, PipelineStage, PixelBuffer, Point, Rasterizer, RenderError, ScanConfig, ScanError,
    Upload,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Every byte of the upload is one page; page `i` renders as a 1x1 BGR
/// pixel `[i, 0, 255]`.
struct ByteRasterizer;

impl Rasterizer for ByteRasterizer {
    fn page_count(&self, data: &[u8]) -> Result<usize, RenderError> {
        if data.first() == Some(&b'!') {
            return Err(RenderError::Parse("corrupt".to_string()));
        }
        Ok(data.len())
    }

    fn render_page(&self, _data: &[u8], index: usize, _scale: f32) -> Result<PixelBuffer, RenderError> {
        Ok(PixelBuffer::from_raw(1, 1, ChannelOrder::Bgr, vec![index as u8, 0, 255]).unwrap())
    }
}

/// Returns prepared fragments for each page; `None` simulates an engine failure.
struct ScriptedOcr {
    pages: Vec<Option<Vec<OcrFragment>>>,
    order: ChannelOrder,
}

impl ScriptedOcr {
    fn new(pages: Vec<Option<Vec<OcrFragment>>>) -> Self {
        Self {
            pages,
            order: ChannelOrder::Bgr,
        }
    }
}

impl OcrEngine for ScriptedOcr {
    fn recognize(&self, image: &PixelBuffer) -> Result<Vec<OcrFragment>, OcrError> {
        assert_eq!(image.channel_order(), self.order);
        let page = match self.order {
            ChannelOrder::Bgr => image.as_bytes()[0],
            ChannelOrder::Rgb => image.as_bytes()[2],
        } as usize;
        self.pages[page]
            .clone()
            .ok_or_else(|| OcrError::Engine(format!("page {} unreadable", page)))
    }

    fn channel_order(&self) -> ChannelOrder {
        self.order
    }
}

type Calls = Arc<Mutex<Vec<String>>>;

/// Replays one answer; prompts land in a log shared with the test.
struct CannedClient {
    answer: String,
    calls: Calls,
}

impl CannedClient {
    fn new(answer: &str) -> (Self, Calls) {
        let calls = Calls::default();
        let client = Self {
            answer: answer.to_string(),
            calls: Arc::clone(&calls),
        };
        (client, calls)
    }
}

impl CompletionClient for CannedClient {
    fn complete(&self, _system: &str, user: &str) -> Result<String, CompletionError> {
        self.calls.lock().unwrap().push(user.to_string());
        Ok(self.answer.clone())
    }
}

#[derive(Default)]
struct RecordingObserver {
    stages: Mutex<Vec<PipelineStage>>,
    pages: Mutex<Option<usize>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_open(&self, page_count: usize) {
        *self.pages.lock().unwrap() = Some(page_count);
    }

    fn on_stage(&self, stage: PipelineStage) {
        self.stages.lock().unwrap().push(stage);
    }
}

fn fragment(text: &str, x: f32, y: f32) -> OcrFragment {
    OcrFragment::new(
        [
            Point::new(x, y - 8.0),
            Point::new(x + 60.0, y - 8.0),
            Point::new(x + 60.0, y),
            Point::new(x, y),
        ],
        text,
        0.9,
    )
}

fn invoice_page() -> Vec<OcrFragment> {
    vec![
        fragment("$50", 300.0, 102.0),
        fragment("INVOICE", 10.0, 10.0),
        fragment("Total:", 10.0, 100.0),
        fragment("#123", 120.0, 12.0),
    ]
}

fn pipeline(
    pages: Vec<Option<Vec<OcrFragment>>>,
    answer: &str,
) -> (InvoicePipeline<ByteRasterizer, ScriptedOcr, CannedClient>, Calls) {
    let (client, calls) = CannedClient::new(answer);
    let pipeline = InvoicePipeline::new(&ScanConfig::default(), ByteRasterizer, ScriptedOcr::new(pages), client);
    (pipeline, calls)
}

#[test]
fn test_one_page_invoice_end_to_end() {
    let answer = json!({"invoiceNumber": "#123", "grandTotal": "$50", "invoiceItems": []});
    let (pipeline, calls) = pipeline(vec![Some(invoice_page())], &answer.to_string());

    let record = pipeline.parse(Upload::new("scans/invoice.pdf", vec![0])).unwrap();

    assert_eq!(record.invoice_text, "INVOICE #123\nTotal: $50\n");
    assert_eq!(record.file_name, "invoice.pdf");
    assert_eq!(record.invoice.invoice_number.as_str(), Some("#123"));
    assert!(record.invoice.taxes.is_missing());

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].ends_with("INVOICE #123\nTotal: $50\n"));
}

#[test]
fn test_document_text_concatenates_pages_in_order() {
    let (pipeline, _) = pipeline(
        vec![
            Some(vec![fragment("first", 0.0, 10.0)]),
            Some(Vec::new()),
            Some(vec![fragment("Straße", 0.0, 10.0), fragment("3", 100.0, 11.0)]),
        ],
        "{}",
    );

    let text = pipeline.document_text(vec![0, 1, 2]).unwrap();
    assert_eq!(text, "first\n\nStrae 3\n");
}

#[test]
fn test_later_page_failure_aborts_without_model_call() {
    let (pipeline, calls) = pipeline(vec![Some(invoice_page()), None], "{}");
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = pipeline.with_observer(observer.clone());

    let err = pipeline.parse(Upload::new("two.pdf", vec![0, 1])).unwrap_err();

    assert!(matches!(err, ScanError::Ocr(OcrError::Engine(_))));
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(observer.stages.lock().unwrap().last(), Some(&PipelineStage::Failed));
}

#[test]
fn test_invalid_document_is_render_error() {
    let (pipeline, _) = pipeline(Vec::new(), "{}");
    let err = pipeline.parse(Upload::new("bad.pdf", b"!pdf".to_vec())).unwrap_err();
    assert!(matches!(err, ScanError::Render(RenderError::Parse(_))));

    let err = pipeline.parse(Upload::new("empty.pdf", Vec::new())).unwrap_err();
    assert!(matches!(err, ScanError::Render(RenderError::NoPages)));
}

#[test]
fn test_fenced_model_answer_propagates() {
    let (pipeline, _) = pipeline(vec![Some(invoice_page())], "```json\n{}\n```");
    let err = pipeline.parse(Upload::new("a.pdf", vec![0])).unwrap_err();
    assert!(matches!(err, ScanError::Completion(CompletionError::ResponseParse(_))));
}

#[test]
fn test_json_array_answer_is_rejected() {
    let (pipeline, _) = pipeline(vec![Some(invoice_page())], "[]");
    let err = pipeline.parse(Upload::new("a.pdf", vec![0])).unwrap_err();
    assert!(matches!(err, ScanError::Completion(CompletionError::ResponseParse(_))));
}

/// Records the stages already reported when the model is called.
struct StageCheckingClient {
    observer: Arc<RecordingObserver>,
    seen: Arc<Mutex<Vec<PipelineStage>>>,
}

impl CompletionClient for StageCheckingClient {
    fn complete(&self, _system: &str, user: &str) -> Result<String, CompletionError> {
        assert!(user.ends_with("INVOICE #123\nTotal: $50\n"));
        *self.seen.lock().unwrap() = self.observer.stages.lock().unwrap().clone();
        Ok("{}".to_string())
    }
}

#[test]
fn test_model_is_called_during_completing_stage() {
    let observer = Arc::new(RecordingObserver::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let client = StageCheckingClient {
        observer: observer.clone(),
        seen: Arc::clone(&seen),
    };
    let pipeline = InvoicePipeline::new(
        &ScanConfig::default(),
        ByteRasterizer,
        ScriptedOcr::new(vec![Some(invoice_page())]),
        client,
    )
    .with_observer(observer.clone());

    pipeline.parse(Upload::new("a.pdf", vec![0])).unwrap();

    let at_call = seen.lock().unwrap();
    assert_eq!(
        &at_call[at_call.len() - 2..],
        &[PipelineStage::Prompting, PipelineStage::Completing]
    );
    assert_eq!(observer.stages.lock().unwrap().last(), Some(&PipelineStage::Completed));
}

#[test]
fn test_stage_sequence() {
    let (pipeline, _) = pipeline(vec![Some(invoice_page()), Some(Vec::new())], "{}");
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = pipeline.with_observer(observer.clone());

    pipeline.parse(Upload::new("a.pdf", vec![0, 1])).unwrap();

    assert_eq!(*observer.pages.lock().unwrap(), Some(2));
    let expected = vec![
        PipelineStage::Rasterizing { page: 0 },
        PipelineStage::Extracting { page: 0 },
        PipelineStage::Reconstructing { page: 0 },
        PipelineStage::Accumulating { page: 0 },
        PipelineStage::Rasterizing { page: 1 },
        PipelineStage::Extracting { page: 1 },
        PipelineStage::Reconstructing { page: 1 },
        PipelineStage::Accumulating { page: 1 },
        PipelineStage::Prompting,
        PipelineStage::Completing,
        PipelineStage::Completed,
    ];
    assert_eq!(*observer.stages.lock().unwrap(), expected);
}

#[test]
fn test_buffer_reaches_engine_in_its_channel_order() {
    let (client, _) = CannedClient::new("{}");
    let mut ocr = ScriptedOcr::new(vec![Some(invoice_page())]);
    ocr.order = ChannelOrder::Rgb;
    let pipeline = InvoicePipeline::new(&ScanConfig::default(), ByteRasterizer, ocr, client);

    assert_eq!(pipeline.document_text(vec![0]).unwrap(), "INVOICE #123\nTotal: $50\n");
}

#[test]
fn test_legacy_baseline_from_config() {
    let drifting = vec![
        fragment("a", 0.0, 0.0),
        fragment("b", 70.0, 15.0),
        fragment("c", 140.0, 30.0),
    ];

    let mut config = ScanConfig::default();
    config.layout.baseline = LineBaseline::Previous;
    let (client, _) = CannedClient::new("{}");
    let legacy = InvoicePipeline::new(&config, ByteRasterizer, ScriptedOcr::new(vec![Some(drifting.clone())]), client);
    assert_eq!(legacy.document_text(vec![0]).unwrap(), "a b c\n");

    let (fixed, _) = pipeline(vec![Some(drifting)], "{}");
    assert_eq!(fixed.document_text(vec![0]).unwrap(), "a b\nc\n");
}

#[test]
fn test_reader_needs_no_model_client() {
    let observer = Arc::new(RecordingObserver::default());
    let reader = DocumentReader::new(&ScanConfig::default(), ByteRasterizer, ScriptedOcr::new(vec![Some(Vec::new())]))
        .with_observer(observer.clone());

    assert_eq!(reader.document_text(vec![0]).unwrap(), "\n");
    assert_eq!(
        observer.stages.lock().unwrap().last(),
        Some(&PipelineStage::Accumulating { page: 0 })
    );
}
