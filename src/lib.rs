use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub mod capture;
pub mod cluster;
pub mod color;
pub mod error;
pub mod geom;
pub mod languages;
pub mod logging;
pub mod notify;
pub mod overlay;
pub mod providers;
pub mod scheduler;
pub mod settings;
pub mod translate;

mod test_util;

pub use capture::rpc::{ChannelRpc, RecognizedLine, RpcClient, RpcRequest, RpcResponse};
pub use capture::{RegionCapture, TextFragment};
pub use cluster::{group_nearby_text, TextGroup};
pub use color::{ColorAnalyzer, ColorPolicy, ColorResult, ColorSpec, Rgb};
pub use error::Failure;
pub use languages::Language;
pub use notify::{LogNotifier, NoticeKind, Notifier};
pub use overlay::{ImageOverlay, NullSink, OverlayBox, OverlayRenderer, OverlaySink};
pub use providers::{BatchTranslator, EnhancedTranslator, GeminiTranslate, GoogleTranslate};
pub use scheduler::state::SessionState;
pub use scheduler::{Host, ImageView, SchedulerHandle, ViewportInfo};
pub use settings::{load_settings, Settings};
pub use translate::{
    should_skip_translation, RetryPolicy, TranslationMode, TranslationService,
};

use crate::notify::NoticeKind as Kind;
use crate::scheduler::{Pipeline, Scheduler};

/// External collaborators the engine is wired against.
pub struct Collaborators {
    /// Capture/OCR relay.
    pub relay: Arc<dyn RpcClient>,
    /// Batched translation endpoint.
    pub batch: Arc<dyn BatchTranslator>,
    /// Context-aware translation endpoint.
    pub enhanced: Arc<dyn EnhancedTranslator>,
    /// Overlay materialization.
    pub sink: Arc<dyn OverlaySink>,
    /// Transient user notifications.
    pub notifier: Arc<dyn Notifier>,
}

/// The in-place translation engine for one hosted document.
///
/// `start` wires the scroll loop; the returned handle's `stop` is the only
/// reset that clears failure-induced partial overlays.
pub struct Engine {
    pipeline: Arc<Pipeline>,
}

impl Engine {
    pub fn new(host: Arc<dyn Host>, collaborators: Collaborators, settings: Settings) -> Self {
        let retry = RetryPolicy::new(settings.retry_attempts, settings.retry_backoff);
        let pipeline = Pipeline {
            host,
            capture: RegionCapture::new(collaborators.relay),
            colors: ColorAnalyzer::new(settings.color_policy),
            translations: TranslationService::new(
                collaborators.batch,
                collaborators.enhanced,
                retry,
                Arc::clone(&collaborators.notifier),
            ),
            renderer: OverlayRenderer::new(collaborators.sink),
            notifier: collaborators.notifier,
            session: Mutex::new(SessionState::from_settings(&settings)),
            settings,
            active: AtomicBool::new(false),
        };
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Starts real-time translation: one immediate eligibility pass, then
    /// passes driven by host scroll positions sent on the channel.
    pub async fn start(&self, scroll_events: mpsc::UnboundedReceiver<f32>) -> SchedulerHandle {
        Scheduler::start(Arc::clone(&self.pipeline), scroll_events).await
    }

    /// Tears down current overlays and runs a fresh eligibility pass.
    pub async fn refresh(&self) {
        {
            let mut session = self.lock_session();
            session.last_translation = None;
        }
        self.pipeline.renderer.clear();
        Arc::clone(&self.pipeline).run_pass().await;
    }

    pub async fn set_target_language(&self, language: Language) {
        {
            let mut session = self.lock_session();
            if session.target_language == language {
                return;
            }
            session.target_language = language;
        }
        self.pipeline.translations.clear_cache();
        self.refresh().await;
        self.pipeline.notifier.notify(
            Kind::Success,
            &format!("Language changed to {}", language.english_name()),
        );
    }

    pub async fn set_translation_mode(&self, mode: TranslationMode) {
        {
            let mut session = self.lock_session();
            if session.mode == mode {
                return;
            }
            session.mode = mode;
        }
        self.pipeline.translations.clear_cache();
        self.refresh().await;
        self.pipeline
            .notifier
            .notify(Kind::Success, &format!("Translation mode: {}", mode.as_str()));
    }

    pub async fn set_font_size_multiplier(&self, value: f32) {
        self.lock_session().set_font_size_multiplier(value);
        self.refresh().await;
    }

    pub async fn set_spread_threshold(&self, value: f32) {
        self.lock_session().set_spread_threshold(value);
        self.refresh().await;
    }

    /// Current overlay containers, one per translated image.
    pub fn overlays(&self) -> Vec<ImageOverlay> {
        self.pipeline.renderer.snapshot()
    }

    pub fn session(&self) -> SessionState {
        self.lock_session().clone()
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.pipeline
            .session
            .lock()
            .unwrap_or_else(|err| err.into_inner())
    }
}
