//! Viewport-driven scheduling: decides which images are processed now and
//! drives each one through capture, clustering, color analysis, translation
//! and rendering.

pub(crate) mod scroll;
pub mod state;

use futures_util::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::capture::RegionCapture;
use crate::cluster;
use crate::color::ColorAnalyzer;
use crate::error::Failure;
use crate::geom::RectF;
use crate::notify::{NoticeKind, Notifier};
use crate::overlay::OverlayRenderer;
use crate::settings::Settings;
use crate::translate::{should_skip_translation, TranslationService};
use state::SessionState;

/// Viewport geometry snapshot, in layout coordinates.
#[derive(Debug, Clone, Copy)]
pub struct ViewportInfo {
    pub width: f32,
    pub height: f32,
    pub scroll_y: f32,
}

/// One embedded image as the host currently lays it out.
#[derive(Debug, Clone)]
pub struct ImageView {
    /// Source identity; overlay containers are keyed by it.
    pub id: String,
    /// Rendered box in viewport-relative layout coordinates.
    pub layout: RectF,
    pub natural_width: u32,
    pub natural_height: u32,
    /// Display, visibility, opacity and layout participation all affirmative.
    pub visible: bool,
    /// Fully loaded.
    pub complete: bool,
}

/// Read-only view of the hosting document.
pub trait Host: Send + Sync {
    fn viewport(&self) -> ViewportInfo;
    fn visible_images(&self) -> Vec<ImageView>;
    fn device_pixel_ratio(&self) -> f32;
}

/// Shared state and collaborators for one translation session.
pub(crate) struct Pipeline {
    pub(crate) host: Arc<dyn Host>,
    pub(crate) capture: RegionCapture,
    pub(crate) colors: ColorAnalyzer,
    pub(crate) translations: TranslationService,
    pub(crate) renderer: OverlayRenderer,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) settings: Settings,
    pub(crate) session: Mutex<SessionState>,
    pub(crate) active: AtomicBool,
}

impl Pipeline {
    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub(crate) fn set_scrolling(&self, scrolling: bool) {
        self.session
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .scrolling = scrolling;
    }

    /// One eligibility pass: select stable, visible, sufficiently large
    /// images inside the extended viewport and run their pipelines
    /// concurrently. Per-image failures degrade that image only.
    pub(crate) async fn run_pass(self: Arc<Self>) {
        if !self.is_active() {
            return;
        }
        let viewport = self.host.viewport();
        let now = Instant::now();
        {
            let mut session = self.session.lock().unwrap_or_else(|err| err.into_inner());
            if !session.translating || session.scrolling {
                return;
            }
            if let Some(last) = session.last_translation
                && now.duration_since(last) < self.settings.min_translation_interval
            {
                debug!("pass suppressed by min-interval guard");
                return;
            }
            session.last_translation = Some(now);
        }

        let eligible: Vec<ImageView> = self
            .host
            .visible_images()
            .into_iter()
            .filter(|image| image_is_eligible(image, &viewport, &self.settings))
            .collect();
        debug!("eligibility pass selected {} image(s)", eligible.len());

        let mut tasks = Vec::new();
        for image in eligible {
            let pipeline = Arc::clone(&self);
            tasks.push(tokio::spawn(async move {
                let image_id = image.id.clone();
                if let Err(failure) = Arc::clone(&pipeline).process_image(image, viewport).await {
                    warn!("pipeline for {} degraded: {}", image_id, failure);
                    pipeline
                        .notifier
                        .notify(NoticeKind::Error, "Translation failed. Please try again.");
                }
            }));
        }
        join_all(tasks).await;
    }

    async fn process_image(
        self: Arc<Self>,
        image: ImageView,
        viewport: ViewportInfo,
    ) -> Result<(), Failure> {
        let scale = self.host.device_pixel_ratio();
        let outcome = self.capture.capture_region(image.layout, scale).await?;
        if !self.is_active() {
            return Ok(());
        }
        if outcome.fragments.is_empty() {
            debug!("no text recognized in {}", image.id);
            return Ok(());
        }

        let (threshold, language, mode, font_multiplier, policy) = {
            let session = self.session.lock().unwrap_or_else(|err| err.into_inner());
            if !session.translating || session.scrolling {
                return Ok(());
            }
            (
                session.spread_threshold,
                session.target_language,
                session.mode,
                session.font_size_multiplier,
                session.color_policy,
            )
        };

        let groups =
            cluster::group_nearby_text(&outcome.fragments, outcome.pixels.width() as f32, threshold);

        // Prior overlay state for this image goes away before the new boxes
        // attach, so boxes never double up.
        self.renderer.begin_image(&image.id, image.layout);

        let mut tasks = Vec::new();
        for (index, group) in groups.into_iter().enumerate() {
            let text = group.text();
            if should_skip_translation(&text) {
                debug!("skipping non-content text: {}", text);
                continue;
            }
            let colors = self
                .colors
                .analyze_with_policy(&outcome.pixels, group.bounds, policy);

            let pipeline = Arc::clone(&self);
            let image_id = image.id.clone();
            let bounds = group.bounds;
            tasks.push(tokio::spawn(async move {
                let translated = pipeline.translations.translate(&text, language, mode).await;
                if !pipeline.is_active() {
                    return;
                }
                pipeline.renderer.place_box(
                    &image_id,
                    index,
                    bounds,
                    scale,
                    colors,
                    &translated,
                    font_multiplier,
                    viewport.width,
                );
            }));
        }
        join_all(tasks).await;
        Ok(())
    }
}

/// Eligibility filters from the scheduler contract: visibility, load state,
/// size floor and the extended-viewport window (widened for long vertical
/// strips).
pub(crate) fn image_is_eligible(
    image: &ImageView,
    viewport: &ViewportInfo,
    settings: &Settings,
) -> bool {
    if !image.visible || !image.complete {
        return false;
    }
    if image.natural_width == 0 || image.natural_height == 0 {
        return false;
    }
    let layout = image.layout;
    if layout.w < settings.min_image_size || layout.h < settings.min_image_size {
        return false;
    }

    let buffer = settings.viewport_buffer;
    let mut top = -buffer * 2.0;
    let mut bottom = viewport.height + buffer * 2.0;
    let tall_strip =
        layout.h > viewport.height * 2.0 && layout.w < viewport.width * 0.8;
    if tall_strip {
        top = -buffer * settings.tall_image_buffer_scale;
        bottom = viewport.height + buffer * settings.tall_image_buffer_scale;
    }

    layout.bottom() > top
        && layout.y < bottom
        && layout.right() > -buffer
        && layout.x < viewport.width + buffer
}

/// Driver for a running session: owns the scroll loop task.
pub struct SchedulerHandle {
    pub(crate) pipeline: Arc<Pipeline>,
    pub(crate) task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops translating: tears down every overlay, clears both caches and
    /// resets the session knobs to their configured defaults.
    pub fn stop(&self) {
        self.pipeline.active.store(false, Ordering::Release);
        self.task.abort();
        self.pipeline
            .session
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .reset(&self.pipeline.settings);
        self.pipeline.renderer.clear();
        self.pipeline.translations.reset();
        self.pipeline.colors.clear();
    }
}

pub(crate) struct Scheduler;

impl Scheduler {
    /// Marks the session active, runs the initial eligibility pass and then
    /// hands scheduling over to the scroll loop.
    pub(crate) async fn start(
        pipeline: Arc<Pipeline>,
        scroll_events: mpsc::UnboundedReceiver<f32>,
    ) -> SchedulerHandle {
        {
            let mut session = pipeline.session.lock().unwrap_or_else(|err| err.into_inner());
            session.translating = true;
        }
        pipeline.active.store(true, Ordering::Release);
        Arc::clone(&pipeline).run_pass().await;
        let task = tokio::spawn(scroll::run(Arc::clone(&pipeline), scroll_events));
        SchedulerHandle { pipeline, task }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(layout: RectF) -> ImageView {
        ImageView {
            id: "img".to_string(),
            layout,
            natural_width: 800,
            natural_height: 600,
            visible: true,
            complete: true,
        }
    }

    fn viewport() -> ViewportInfo {
        ViewportInfo {
            width: 1000.0,
            height: 800.0,
            scroll_y: 0.0,
        }
    }

    #[test]
    fn visible_in_viewport_image_is_eligible() {
        let settings = Settings::default();
        assert!(image_is_eligible(
            &image(RectF::new(100.0, 100.0, 600.0, 400.0)),
            &viewport(),
            &settings
        ));
    }

    #[test]
    fn hidden_or_unloaded_images_are_rejected() {
        let settings = Settings::default();
        let mut hidden = image(RectF::new(100.0, 100.0, 600.0, 400.0));
        hidden.visible = false;
        assert!(!image_is_eligible(&hidden, &viewport(), &settings));

        let mut loading = image(RectF::new(100.0, 100.0, 600.0, 400.0));
        loading.complete = false;
        assert!(!image_is_eligible(&loading, &viewport(), &settings));

        let mut broken = image(RectF::new(100.0, 100.0, 600.0, 400.0));
        broken.natural_width = 0;
        assert!(!image_is_eligible(&broken, &viewport(), &settings));
    }

    #[test]
    fn small_images_are_rejected() {
        let settings = Settings::default();
        assert!(!image_is_eligible(
            &image(RectF::new(100.0, 100.0, 80.0, 400.0)),
            &viewport(),
            &settings
        ));
    }

    #[test]
    fn far_offscreen_image_is_rejected_within_buffer_accepted() {
        let settings = Settings::default();
        // 150px below the extended bottom edge (800 + 200 buffer).
        assert!(!image_is_eligible(
            &image(RectF::new(100.0, 1150.0, 600.0, 400.0)),
            &viewport(),
            &settings
        ));
        // Just inside the doubled buffer.
        assert!(image_is_eligible(
            &image(RectF::new(100.0, 950.0, 600.0, 400.0)),
            &viewport(),
            &settings
        ));
    }

    #[test]
    fn tall_strip_gets_the_widened_window() {
        let settings = Settings::default();
        // Tall vertical strip: height > 2x viewport, width < 0.8x viewport.
        let strip = image(RectF::new(100.0, 1200.0, 600.0, 4000.0));
        assert!(image_is_eligible(&strip, &viewport(), &settings));
        // Same position but a regular aspect stays outside the base window.
        let wide = image(RectF::new(100.0, 1200.0, 900.0, 400.0));
        assert!(!image_is_eligible(&wide, &viewport(), &settings));
    }
}
