//! End-to-end pipeline scenarios against fake host and collaborator
//! implementations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use image::{GenericImageView, Rgba, RgbaImage};
use tokio::sync::mpsc;

use overlay_translator_rust::capture::rpc::RpcEnvelope;
use overlay_translator_rust::capture::{decode_image_data, encode_image_data};
use overlay_translator_rust::geom::RectF;
use overlay_translator_rust::providers::{BatchFuture, EnhancedFuture};
use overlay_translator_rust::{
    BatchTranslator, ChannelRpc, Collaborators, Engine, EnhancedTranslator, Host, ImageView,
    Language, NoticeKind, Notifier, NullSink, RecognizedLine, Rgb, RpcRequest, RpcResponse,
    Settings, ViewportInfo,
};

struct FakeHost {
    scroll_y: Mutex<f32>,
    images: Vec<ImageView>,
}

impl FakeHost {
    fn new(images: Vec<ImageView>) -> Arc<Self> {
        Arc::new(Self {
            scroll_y: Mutex::new(0.0),
            images,
        })
    }

    fn set_scroll(&self, position: f32) {
        *self.scroll_y.lock().unwrap() = position;
    }
}

impl Host for FakeHost {
    fn viewport(&self) -> ViewportInfo {
        ViewportInfo {
            width: 1000.0,
            height: 1000.0,
            scroll_y: *self.scroll_y.lock().unwrap(),
        }
    }

    fn visible_images(&self) -> Vec<ImageView> {
        self.images.clone()
    }

    fn device_pixel_ratio(&self) -> f32 {
        1.0
    }
}

struct RecordingBatch {
    calls: Mutex<Vec<Vec<String>>>,
    reply: String,
}

impl RecordingBatch {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            reply: reply.to_string(),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl BatchTranslator for RecordingBatch {
    fn translate_batch(&self, texts: Vec<String>, _target: Language) -> BatchFuture {
        self.calls.lock().unwrap().push(texts.clone());
        let reply = self.reply.clone();
        Box::pin(async move { Ok(texts.iter().map(|_| reply.clone()).collect()) })
    }
}

struct NoEnhanced;

impl EnhancedTranslator for NoEnhanced {
    fn translate_enhanced(&self, _text: String, _instruction: String) -> EnhancedFuture {
        Box::pin(async { Ok(None) })
    }
}

struct RecordingNotifier {
    errors: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            errors: Mutex::new(Vec::new()),
        })
    }

    fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        if kind == NoticeKind::Error {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }
}

fn image_view(id: &str, layout: RectF) -> ImageView {
    ImageView {
        id: id.to_string(),
        layout,
        natural_width: layout.w as u32,
        natural_height: layout.h as u32,
        visible: true,
        complete: true,
    }
}

fn line(text: &str, x: f32, y: f32, w: f32, h: f32) -> RecognizedLine {
    RecognizedLine {
        text: text.to_string(),
        bounding_box: [[x, y], [x + w, y], [x + w, y + h], [x, y + h]],
    }
}

/// Relay server: answers captures with a near-black viewport screenshot and
/// recognitions with two same-row fragments at center fractions 0.2 and 0.8
/// of the 600px-wide crop.
fn spawn_relay(mut server: mpsc::UnboundedReceiver<RpcEnvelope>) {
    tokio::spawn(async move {
        let screenshot = RgbaImage::from_pixel(1000, 1000, Rgba([10, 10, 10, 255]));
        let screenshot_data = encode_image_data(&screenshot).unwrap();
        while let Some((request, responder)) = server.recv().await {
            let response = match request {
                RpcRequest::CaptureVisibleRegion => Ok(RpcResponse::Captured {
                    image_data: screenshot_data.clone(),
                }),
                RpcRequest::Recognize { image_data } => {
                    let crop = decode_image_data(&image_data).unwrap();
                    if crop.width() == 600 {
                        Ok(RpcResponse::Recognized {
                            lines: vec![
                                line("안녕", 90.0, 100.0, 60.0, 30.0),
                                line("하세요", 450.0, 100.0, 60.0, 30.0),
                            ],
                        })
                    } else {
                        Err(anyhow!("recognizer rejected the crop"))
                    }
                }
            };
            let _ = responder.send(response);
        }
    });
}

fn engine_with(
    host: Arc<FakeHost>,
    batch: Arc<RecordingBatch>,
    notifier: Arc<RecordingNotifier>,
) -> Engine {
    let (relay, server) = ChannelRpc::new();
    spawn_relay(server);
    let mut settings = Settings::default();
    settings.retry_backoff = Duration::from_millis(1);
    Engine::new(
        host,
        Collaborators {
            relay: Arc::new(relay),
            batch,
            enhanced: Arc::new(NoEnhanced),
            sink: Arc::new(NullSink),
            notifier,
        },
        settings,
    )
}

#[tokio::test]
async fn one_image_in_viewport_renders_one_translated_box() {
    // 600x800 image fully inside the 1000x1000 viewport.
    let host = FakeHost::new(vec![image_view(
        "https://example.com/page-1.png",
        RectF::new(100.0, 50.0, 600.0, 800.0),
    )]);
    let batch = RecordingBatch::new("สวัสดีครับ");
    let notifier = RecordingNotifier::new();
    let engine = engine_with(host, Arc::clone(&batch), Arc::clone(&notifier));

    let (_scroll_tx, scroll_rx) = mpsc::unbounded_channel();
    let handle = engine.start(scroll_rx).await;

    let overlays = engine.overlays();
    assert_eq!(overlays.len(), 1);
    assert_eq!(overlays[0].image_id, "https://example.com/page-1.png");

    // Fractions 0.2 and 0.8 give spread 0.6 < 0.61: one group, one box.
    assert_eq!(overlays[0].boxes.len(), 1);
    let placed = &overlays[0].boxes[0];
    assert_eq!(placed.text, "สวัสดีครับ");
    // Near-black pixels force the dark panel.
    assert_eq!(placed.colors.background.color, Rgb::BLACK);
    // Group bounds 90..510 x 100..130, host-anchored at (100, 50).
    assert_eq!(placed.rect, RectF::new(190.0, 150.0, 420.0, 30.0));

    assert_eq!(batch.call_count(), 1);
    assert_eq!(notifier.error_count(), 0);
    handle.stop();
}

#[tokio::test]
async fn failing_image_degrades_alone_and_notifies() {
    let host = FakeHost::new(vec![
        image_view("good", RectF::new(100.0, 50.0, 600.0, 800.0)),
        // 300px-wide crop: the fake recognizer rejects it.
        image_view("bad", RectF::new(650.0, 100.0, 300.0, 200.0)),
    ]);
    let batch = RecordingBatch::new("แปลแล้ว");
    let notifier = RecordingNotifier::new();
    let engine = engine_with(host, Arc::clone(&batch), Arc::clone(&notifier));

    let (_scroll_tx, scroll_rx) = mpsc::unbounded_channel();
    let handle = engine.start(scroll_rx).await;

    let overlays = engine.overlays();
    assert_eq!(overlays.len(), 1);
    assert_eq!(overlays[0].image_id, "good");
    assert_eq!(overlays[0].boxes.len(), 1);
    assert_eq!(notifier.error_count(), 1);
    handle.stop();
}

#[tokio::test]
async fn stop_clears_overlays_and_resets_session() {
    let host = FakeHost::new(vec![image_view(
        "img",
        RectF::new(100.0, 50.0, 600.0, 800.0),
    )]);
    let batch = RecordingBatch::new("ok");
    let notifier = RecordingNotifier::new();
    let engine = engine_with(host, Arc::clone(&batch), Arc::clone(&notifier));

    let (_scroll_tx, scroll_rx) = mpsc::unbounded_channel();
    let handle = engine.start(scroll_rx).await;
    assert!(!engine.overlays().is_empty());
    assert!(engine.session().translating);

    engine.set_font_size_multiplier(2.0).await;
    handle.stop();

    assert!(engine.overlays().is_empty());
    let session = engine.session();
    assert!(!session.translating);
    assert_eq!(session.font_size_multiplier, 1.0);
}

#[tokio::test]
async fn language_switch_invalidates_the_cache_and_rerenders() {
    let host = FakeHost::new(vec![image_view(
        "img",
        RectF::new(100.0, 50.0, 600.0, 800.0),
    )]);
    let batch = RecordingBatch::new("translated");
    let notifier = RecordingNotifier::new();
    let engine = engine_with(host, Arc::clone(&batch), Arc::clone(&notifier));

    let (_scroll_tx, scroll_rx) = mpsc::unbounded_channel();
    let handle = engine.start(scroll_rx).await;
    assert_eq!(batch.call_count(), 1);

    engine.set_target_language(Language::Ko).await;

    // The old language's entry is no longer served: a fresh request went out.
    assert_eq!(batch.call_count(), 2);
    assert_eq!(engine.overlays().len(), 1);
    handle.stop();
}

#[tokio::test(start_paused = true)]
async fn fast_scroll_tears_down_overlays_and_rescans_on_settle() {
    let host = FakeHost::new(vec![image_view(
        "img",
        RectF::new(100.0, 50.0, 600.0, 800.0),
    )]);
    let batch = RecordingBatch::new("translated");
    let notifier = RecordingNotifier::new();
    let engine = engine_with(Arc::clone(&host), Arc::clone(&batch), Arc::clone(&notifier));

    let (scroll_tx, scroll_rx) = mpsc::unbounded_channel();
    let handle = engine.start(scroll_rx).await;
    assert_eq!(batch.call_count(), 1);

    // A 400px jump crosses the displacement threshold: overlays drop, the
    // translation cache clears, and the settle pass re-requests the text.
    host.set_scroll(400.0);
    scroll_tx.send(400.0).unwrap();

    let mut waited = 0;
    while batch.call_count() < 2 && waited < 1000 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += 1;
    }
    assert_eq!(batch.call_count(), 2);

    let mut waited = 0;
    while engine.overlays().iter().all(|o| o.boxes.is_empty()) && waited < 1000 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        waited += 1;
    }
    assert_eq!(engine.overlays().len(), 1);
    assert_eq!(engine.overlays()[0].boxes.len(), 1);
    handle.stop();
}
