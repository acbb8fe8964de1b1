//! Scroll debounce and settle detection.
//!
//! Raw scroll events are coalesced within a debounce window. When the window
//! closes, the displacement since the previous window is measured once: past
//! the threshold, every overlay is torn down and the translation cache
//! cleared immediately so stale text never rides a fast scroll. The position
//! is then polled at frame cadence until two consecutive near-zero deltas
//! mark the scroll settled, and a fresh eligibility pass runs.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::debug;

use super::Pipeline;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const SETTLE_EPSILON: f32 = 2.0;
const SETTLE_SAMPLES: u8 = 2;

pub(crate) async fn run(pipeline: Arc<Pipeline>, mut events: mpsc::UnboundedReceiver<f32>) {
    let mut last_fired = pipeline.host.viewport().scroll_y;
    while pipeline.is_active() {
        let Some(mut latest) = events.recv().await else {
            break;
        };
        loop {
            match timeout(pipeline.settings.scroll_debounce, events.recv()).await {
                Ok(Some(position)) => latest = position,
                Ok(None) => return,
                Err(_) => break,
            }
        }
        if !pipeline.is_active() {
            break;
        }

        let displacement = (latest - last_fired).abs();
        last_fired = latest;
        if displacement > pipeline.settings.scroll_displacement {
            debug!("fast scroll ({}px); dropping overlays", displacement);
            pipeline.set_scrolling(true);
            pipeline.renderer.clear();
            pipeline.translations.clear_cache();
        }

        sleep(pipeline.settings.scroll_clear_delay).await;
        wait_for_settle(&pipeline, &mut events, &mut last_fired).await;
        if !pipeline.is_active() {
            break;
        }
        pipeline.set_scrolling(false);
        Arc::clone(&pipeline).run_pass().await;
    }
}

/// Polls the host scroll position until it holds still for two consecutive
/// frame samples. Events arriving meanwhile are absorbed so the debounce
/// loop does not replay a scroll that already settled.
async fn wait_for_settle(
    pipeline: &Arc<Pipeline>,
    events: &mut mpsc::UnboundedReceiver<f32>,
    last_fired: &mut f32,
) {
    let mut previous = pipeline.host.viewport().scroll_y;
    let mut calm = 0u8;
    while pipeline.is_active() {
        sleep(FRAME_INTERVAL).await;
        while let Ok(position) = events.try_recv() {
            *last_fired = position;
        }
        let current = pipeline.host.viewport().scroll_y;
        if (current - previous).abs() < SETTLE_EPSILON {
            calm += 1;
            if calm >= SETTLE_SAMPLES {
                return;
            }
        } else {
            calm = 0;
        }
        previous = current;
    }
}
