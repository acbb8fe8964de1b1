//! Maps cluster geometry back to host coordinates and materializes overlay
//! boxes, one container per source image.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::color::ColorResult;
use crate::geom::RectF;

const BASE_FONT_SIZE: f32 = 17.0;
const NARROW_FONT_SIZE: f32 = 14.0;
const NARROW_VIEWPORT_WIDTH: f32 = 480.0;

/// One rendered translation box in host document coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct OverlayBox {
    pub group_index: usize,
    pub rect: RectF,
    pub text: String,
    pub colors: ColorResult,
    pub font_size: f32,
    /// Uniform scale applied when the text's natural width overflows the box.
    pub shrink: f32,
}

/// All boxes for one source image, replaced atomically per pass.
#[derive(Debug, Clone, Serialize)]
pub struct ImageOverlay {
    pub image_id: String,
    pub anchor: RectF,
    pub boxes: Vec<OverlayBox>,
}

/// Host-side materialization of overlay containers.
pub trait OverlaySink: Send + Sync {
    fn upsert(&self, overlay: &ImageOverlay);
    fn remove(&self, image_id: &str);
    fn clear(&self);
}

/// Sink for hosts that only read the renderer state back (tests, CLI).
pub struct NullSink;

impl OverlaySink for NullSink {
    fn upsert(&self, _overlay: &ImageOverlay) {}
    fn remove(&self, _image_id: &str) {}
    fn clear(&self) {}
}

pub struct OverlayRenderer {
    sink: Arc<dyn OverlaySink>,
    containers: Mutex<HashMap<String, ImageOverlay>>,
}

impl OverlayRenderer {
    pub fn new(sink: Arc<dyn OverlaySink>) -> Self {
        Self {
            sink,
            containers: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces any prior container for the image with an empty one anchored
    /// at its current layout rect.
    pub fn begin_image(&self, image_id: &str, anchor: RectF) {
        let overlay = ImageOverlay {
            image_id: image_id.to_string(),
            anchor,
            boxes: Vec::new(),
        };
        self.sink.upsert(&overlay);
        self.containers
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .insert(image_id.to_string(), overlay);
    }

    /// Adds one group's box to the image container. Geometry arrives in
    /// captured-pixel space and is mapped back through the inverse capture
    /// scale; placements for images that were torn down meanwhile are
    /// silently dropped.
    #[allow(clippy::too_many_arguments)]
    pub fn place_box(
        &self,
        image_id: &str,
        group_index: usize,
        bounds: RectF,
        capture_scale: f32,
        colors: ColorResult,
        translated: &str,
        font_multiplier: f32,
        viewport_width: f32,
    ) {
        let mut containers = self.containers.lock().unwrap_or_else(|err| err.into_inner());
        let Some(container) = containers.get_mut(image_id) else {
            return;
        };

        let scale = if capture_scale > 0.0 { capture_scale } else { 1.0 };
        let local = bounds.scaled(1.0 / scale);
        let rect = RectF::new(
            container.anchor.x + local.x,
            container.anchor.y + local.y,
            local.w,
            local.h,
        );

        let base = if viewport_width <= NARROW_VIEWPORT_WIDTH {
            NARROW_FONT_SIZE
        } else {
            BASE_FONT_SIZE
        };
        let font_size = (rect.h * 0.99).min(base) * font_multiplier;

        let text = unescape_entities(translated);
        let natural_width = estimate_text_width(&text, font_size);
        let shrink = if natural_width > rect.w && natural_width > 0.0 {
            rect.w / natural_width
        } else {
            1.0
        };

        let overlay_box = OverlayBox {
            group_index,
            rect,
            text,
            colors,
            font_size,
            shrink,
        };
        let position = container
            .boxes
            .binary_search_by_key(&group_index, |existing| existing.group_index)
            .unwrap_or_else(|insert_at| insert_at);
        container.boxes.insert(position, overlay_box);
        self.sink.upsert(container);
    }

    pub fn remove_image(&self, image_id: &str) {
        let removed = self
            .containers
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .remove(image_id);
        if removed.is_some() {
            self.sink.remove(image_id);
        }
    }

    pub fn clear(&self) {
        self.containers
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clear();
        self.sink.clear();
    }

    pub fn contains_image(&self, image_id: &str) -> bool {
        self.containers
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .contains_key(image_id)
    }

    /// Current containers, ordered by image id for deterministic output.
    pub fn snapshot(&self) -> Vec<ImageOverlay> {
        let mut overlays: Vec<ImageOverlay> = self
            .containers
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .values()
            .cloned()
            .collect();
        overlays.sort_by(|a, b| a.image_id.cmp(&b.image_id));
        overlays
    }
}

/// Undoes the HTML entity escaping some translation endpoints apply.
pub fn unescape_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Rough natural width of a rendered line: CJK glyphs count as a full em,
/// ASCII as 0.6, everything else 0.9.
fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    let units: f32 = text
        .chars()
        .map(|ch| {
            let code = ch as u32;
            if ch.is_ascii() {
                0.6
            } else if matches!(code, 0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF) {
                1.0
            } else {
                0.9
            }
        })
        .sum();
    units * font_size
}
