//! Perimeter-probe color inference: only trusts sampled colors when a solid
//! drawn frame (speech bubble, caption box) surrounds the region.

use image::RgbaImage;

use super::{pixel_at, ColorResult, ColorSpec, Rgb};
use crate::geom::RectF;

const SHAPE_DETECTION_PADDING: i64 = 3;
const SHAPE_DETECTION_POINTS: usize = 24;
const EDGE_SAMPLING_POINTS: usize = 16;
const SHAPE_MATCH_RATIO: f32 = 0.75;
const SHAPE_COLOR_DELTA: u32 = 25;
const MIN_TEXT_CONTRAST: u32 = 150;
const TEXT_LUMINANCE_THRESHOLD: f32 = 0.65;
const PANEL_OPACITY: f32 = 0.95;

pub(super) fn analyze(pixels: &RgbaImage, rect: RectF) -> Option<ColorResult> {
    if !has_solid_surrounding(pixels, rect) {
        return Some(ColorResult::neutral());
    }

    let samples = perimeter_samples(
        rect.x as i64,
        rect.y as i64,
        rect.w as i64,
        rect.h as i64,
        EDGE_SAMPLING_POINTS,
    );
    let colors: Vec<Rgb> = samples
        .iter()
        .map(|&(x, y)| color_at(pixels, x, y))
        .collect();
    let dominant = dominant_color(&colors)?;

    if dominant == Rgb::BLACK {
        return Some(ColorResult {
            background: ColorSpec::with_opacity(Rgb::BLACK, PANEL_OPACITY),
            text: ColorSpec::opaque(Rgb::WHITE),
        });
    }
    if dominant == Rgb::WHITE {
        return Some(ColorResult::neutral());
    }

    let text = if dominant.luminance() < TEXT_LUMINANCE_THRESHOLD {
        Rgb::WHITE
    } else {
        Rgb::BLACK
    };
    if dominant.channel_delta(&text) < MIN_TEXT_CONTRAST {
        return Some(ColorResult::neutral());
    }

    Some(ColorResult {
        background: ColorSpec::with_opacity(dominant, PANEL_OPACITY),
        text: ColorSpec::opaque(text),
    })
}

/// A region counts as "shaped" when at least 75% of the perimeter samples
/// around the padded rectangle differ from the center color.
fn has_solid_surrounding(pixels: &RgbaImage, rect: RectF) -> bool {
    let padding = SHAPE_DETECTION_PADDING;
    let samples = perimeter_samples(
        rect.x as i64 - padding,
        rect.y as i64 - padding,
        rect.w as i64 + padding * 2,
        rect.h as i64 + padding * 2,
        SHAPE_DETECTION_POINTS,
    );
    if samples.is_empty() {
        return false;
    }

    let center = color_at(
        pixels,
        (rect.x + rect.w / 2.0) as i64,
        (rect.y + rect.h / 2.0) as i64,
    );
    let differing = samples
        .iter()
        .filter(|&&(x, y)| color_at(pixels, x, y).channel_delta(&center) > SHAPE_COLOR_DELTA)
        .count();

    differing as f32 >= samples.len() as f32 * SHAPE_MATCH_RATIO
}

/// Three concentric rings of probe points: two just inside the rectangle
/// border (1 px and 2 px offsets) and one just outside (3 px).
fn perimeter_samples(x: i64, y: i64, w: i64, h: i64, points: usize) -> Vec<(i64, i64)> {
    let steps = (points / 4).max(1) as i64;
    let mut samples = Vec::with_capacity(steps as usize * 12);

    for i in 0..steps {
        let dx = w * i / steps;
        let dy = h * i / steps;

        samples.push((x + 1 + dx, y + 1));
        samples.push((x + w - 1, y + 1 + dy));
        samples.push((x + w - 1 - dx, y + h - 1));
        samples.push((x + 1, y + h - 1 - dy));

        samples.push((x + 2 + dx, y + 2));
        samples.push((x + w - 2, y + 2 + dy));
        samples.push((x + w - 2 - dx, y + h - 2));
        samples.push((x + 2, y + h - 2 - dy));

        samples.push((x - 3 + dx, y - 3));
        samples.push((x + w + 3, y - 3 + dy));
        samples.push((x + w + 3 - dx, y + h + 3));
        samples.push((x - 3, y + h + 3 - dy));
    }

    samples
}

fn color_at(pixels: &RgbaImage, x: i64, y: i64) -> Rgb {
    match pixel_at(pixels, x, y) {
        Some((color, _alpha)) => color,
        None => Rgb::WHITE,
    }
}

/// Mode of the exact RGB values, first-seen winning ties.
fn dominant_color(colors: &[Rgb]) -> Option<Rgb> {
    let mut counted: Vec<(Rgb, usize)> = Vec::new();
    for color in colors {
        match counted.iter_mut().find(|(seen, _)| seen == color) {
            Some((_, count)) => *count += 1,
            None => counted.push((*color, 1)),
        }
    }
    counted
        .into_iter()
        .max_by_key(|&(_, count)| count)
        .map(|(color, _)| color)
}
