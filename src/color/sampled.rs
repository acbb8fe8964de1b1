//! Region-sampling color inference: classifies a bounded grid of samples by
//! luminance and channel deviation, then decides the overlay pair from
//! dark/white/grey ratios and the edge-versus-center darkness split.

use image::RgbaImage;

use super::{pixel_at, ColorResult, ColorSpec, Rgb};
use crate::geom::RectF;

const MAX_SAMPLES_PER_AXIS: i64 = 50;
const OPAQUE_ALPHA: u8 = 128;

#[derive(Default)]
struct SampleStats {
    dark: u32,
    white: u32,
    grey: u32,
    total: u32,
}

#[derive(Default)]
struct RegionStats {
    dark: u32,
    total: u32,
}

pub(super) fn analyze(pixels: &RgbaImage, rect: RectF) -> Option<ColorResult> {
    let padding = ((rect.w.min(rect.h) * 0.05).floor() as i64).clamp(2, 5);
    let safe_x = rect.x.floor() as i64 - padding;
    let safe_y = rect.y.floor() as i64 - padding;
    let safe_w = rect.w.floor() as i64 + padding * 2;
    let safe_h = rect.h.floor() as i64 + padding * 2;
    if safe_w <= 0 || safe_h <= 0 {
        return None;
    }

    let step = (safe_w.min(safe_h) / MAX_SAMPLES_PER_AXIS).max(1);

    let mut stats = SampleStats::default();
    let mut edge = RegionStats::default();
    let mut center = RegionStats::default();

    let mut y = 0;
    while y < safe_h {
        let mut x = 0;
        while x < safe_w {
            if let Some((color, alpha)) = pixel_at(pixels, safe_x + x, safe_y + y)
                && alpha >= OPAQUE_ALPHA
            {
                let luminance = (color.r as f32 * 299.0
                    + color.g as f32 * 587.0
                    + color.b as f32 * 114.0)
                    / 1000.0;
                let deviation = color
                    .r
                    .abs_diff(color.g)
                    .max(color.g.abs_diff(color.b))
                    .max(color.r.abs_diff(color.b));

                let is_edge = x < padding * 2
                    || x > safe_w - padding * 2
                    || y < padding * 2
                    || y > safe_h - padding * 2;
                let region = if is_edge { &mut edge } else { &mut center };
                if luminance < 128.0 {
                    region.dark += 1;
                }
                region.total += 1;

                if luminance < 40.0 {
                    stats.dark += 1;
                } else if luminance > 200.0 {
                    stats.white += 1;
                } else if deviation < 20 {
                    stats.grey += 1;
                }
                stats.total += 1;
            }
            x += step;
        }
        y += step;
    }

    if stats.total == 0 {
        return None;
    }

    let dark_ratio = stats.dark as f32 / stats.total as f32;
    let white_ratio = stats.white as f32 / stats.total as f32;
    let grey_ratio = stats.grey as f32 / stats.total as f32;
    let edge_dark_ratio = ratio(&edge);
    let center_dark_ratio = ratio(&center);

    // Monochrome comic art reads better with a slightly translucent panel
    // and pure text colors.
    let stylized = grey_ratio > 0.6 || white_ratio + dark_ratio > 0.75;
    // A large edge/center darkness gap means the image already draws its own
    // text box under this region.
    let has_text_box = (center_dark_ratio - edge_dark_ratio).abs() > 0.3;

    let mut opacity = if stylized { 0.92 } else { 0.95 };
    if has_text_box {
        opacity = (opacity + 0.03).min(0.98);
    }

    let result = if dark_ratio > 0.6 || edge_dark_ratio > 0.7 {
        ColorResult {
            background: ColorSpec::with_opacity(Rgb::BLACK, opacity),
            text: ColorSpec::opaque(if stylized {
                Rgb::WHITE
            } else {
                Rgb::new(240, 240, 240)
            }),
        }
    } else if white_ratio > 0.7 {
        ColorResult {
            background: ColorSpec::with_opacity(Rgb::WHITE, opacity),
            text: ColorSpec::opaque(if stylized {
                Rgb::BLACK
            } else {
                Rgb::new(20, 20, 20)
            }),
        }
    } else {
        let is_dark = dark_ratio + grey_ratio * 0.5 > 0.5;
        let (background, text) = if is_dark {
            (Rgb::BLACK, Rgb::WHITE)
        } else {
            (Rgb::WHITE, Rgb::BLACK)
        };
        ColorResult {
            background: ColorSpec::with_opacity(background, opacity),
            text: ColorSpec::opaque(text),
        }
    };

    Some(result)
}

fn ratio(region: &RegionStats) -> f32 {
    if region.total == 0 {
        0.0
    } else {
        region.dark as f32 / region.total as f32
    }
}
