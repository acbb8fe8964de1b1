//! Background/text color inference for overlay blending.

mod perimeter;
mod sampled;

use image::RgbaImage;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::geom::RectF;

pub const COLOR_CACHE_TTL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Perceptual luminance in 0.0..=1.0 (ITU-R BT.709 weights).
    pub fn luminance(&self) -> f32 {
        (0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32) / 255.0
    }

    /// Sum of absolute per-channel differences (0..=765).
    pub fn channel_delta(&self, other: &Rgb) -> u32 {
        self.r.abs_diff(other.r) as u32
            + self.g.abs_diff(other.g) as u32
            + self.b.abs_diff(other.b) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorSpec {
    pub color: Rgb,
    pub opacity: f32,
}

impl ColorSpec {
    pub fn opaque(color: Rgb) -> Self {
        Self {
            color,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(color: Rgb, opacity: f32) -> Self {
        Self { color, opacity }
    }

    /// CSS-style `rgba(...)` rendering for host sinks.
    pub fn css(&self) -> String {
        if (self.opacity - 1.0).abs() < f32::EPSILON {
            format!("rgb({},{},{})", self.color.r, self.color.g, self.color.b)
        } else {
            format!(
                "rgba({},{},{},{})",
                self.color.r, self.color.g, self.color.b, self.opacity
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorResult {
    pub background: ColorSpec,
    pub text: ColorSpec,
}

impl ColorResult {
    /// Fixed fallback pair used whenever analysis cannot decide.
    pub fn neutral() -> Self {
        Self {
            background: ColorSpec::with_opacity(Rgb::WHITE, 0.95),
            text: ColorSpec::opaque(Rgb::BLACK),
        }
    }
}

/// Which inference algorithm decides overlay colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorPolicy {
    /// Region sampling with luminance/edge-ratio heuristics (canonical).
    Sampled,
    /// Three-ring perimeter probe that requires a drawn bubble/box frame.
    Perimeter,
}

impl ColorPolicy {
    pub fn parse(value: &str) -> Option<ColorPolicy> {
        match value.trim().to_lowercase().as_str() {
            "sampled" => Some(ColorPolicy::Sampled),
            "perimeter" => Some(ColorPolicy::Perimeter),
            _ => None,
        }
    }
}

struct CacheEntry {
    result: ColorResult,
    timestamp: Instant,
}

/// Geometry-keyed analyzer with a freshness-window cache.
///
/// `analyze` never fails: every failure path degrades to
/// [`ColorResult::neutral`].
pub struct ColorAnalyzer {
    policy: ColorPolicy,
    ttl: Duration,
    cache: Mutex<HashMap<(i32, i32, i32, i32), CacheEntry>>,
}

impl ColorAnalyzer {
    pub fn new(policy: ColorPolicy) -> Self {
        Self::with_ttl(policy, COLOR_CACHE_TTL)
    }

    pub fn with_ttl(policy: ColorPolicy, ttl: Duration) -> Self {
        Self {
            policy,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn analyze(&self, pixels: &RgbaImage, rect: RectF) -> ColorResult {
        self.analyze_with_policy(pixels, rect, self.policy)
    }

    pub fn analyze_with_policy(
        &self,
        pixels: &RgbaImage,
        rect: RectF,
        policy: ColorPolicy,
    ) -> ColorResult {
        let key = rect.rounded();
        let now = Instant::now();
        if let Some(entry) = self.cache.lock().unwrap_or_else(|err| err.into_inner()).get(&key)
            && now.duration_since(entry.timestamp) < self.ttl
        {
            return entry.result;
        }

        let result = match policy {
            ColorPolicy::Sampled => sampled::analyze(pixels, rect),
            ColorPolicy::Perimeter => perimeter::analyze(pixels, rect),
        }
        .unwrap_or_else(ColorResult::neutral);

        self.cache
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .insert(
                key,
                CacheEntry {
                    result,
                    timestamp: now,
                },
            );
        result
    }

    pub fn clear(&self) {
        self.cache
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clear();
    }
}

pub(crate) fn pixel_at(pixels: &RgbaImage, x: i64, y: i64) -> Option<(Rgb, u8)> {
    if x < 0 || y < 0 || x >= pixels.width() as i64 || y >= pixels.height() as i64 {
        return None;
    }
    let pixel = pixels.get_pixel(x as u32, y as u32);
    Some((Rgb::new(pixel[0], pixel[1], pixel[2]), pixel[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn pure_black_region_yields_black_background_white_text() {
        let analyzer = ColorAnalyzer::new(ColorPolicy::Sampled);
        let pixels = solid(200, 200, [0, 0, 0, 255]);
        let result = analyzer.analyze(&pixels, RectF::new(20.0, 20.0, 120.0, 80.0));
        assert_eq!(result.background.color, Rgb::BLACK);
        assert_eq!(result.text.color, Rgb::WHITE);
    }

    #[test]
    fn pure_white_region_yields_white_background_black_text() {
        let analyzer = ColorAnalyzer::new(ColorPolicy::Sampled);
        let pixels = solid(200, 200, [255, 255, 255, 255]);
        let result = analyzer.analyze(&pixels, RectF::new(20.0, 20.0, 120.0, 80.0));
        assert_eq!(result.background.color, Rgb::WHITE);
        assert_eq!(result.text.color, Rgb::BLACK);
    }

    #[test]
    fn fresh_cache_hit_ignores_changed_buffer() {
        let analyzer = ColorAnalyzer::new(ColorPolicy::Sampled);
        let rect = RectF::new(10.0, 10.0, 100.0, 60.0);
        let dark = solid(200, 200, [0, 0, 0, 255]);
        let first = analyzer.analyze(&dark, rect);
        let light = solid(200, 200, [255, 255, 255, 255]);
        let second = analyzer.analyze(&light, rect);
        assert_eq!(first, second);
    }

    #[test]
    fn stale_entry_is_recomputed() {
        let analyzer = ColorAnalyzer::with_ttl(ColorPolicy::Sampled, Duration::from_millis(30));
        let rect = RectF::new(10.0, 10.0, 100.0, 60.0);
        let dark = solid(200, 200, [0, 0, 0, 255]);
        let first = analyzer.analyze(&dark, rect);
        std::thread::sleep(Duration::from_millis(50));
        let light = solid(200, 200, [255, 255, 255, 255]);
        let second = analyzer.analyze(&light, rect);
        assert_ne!(first.background.color, second.background.color);
    }

    #[test]
    fn out_of_range_rect_degrades_to_neutral() {
        let analyzer = ColorAnalyzer::new(ColorPolicy::Sampled);
        let pixels = solid(50, 50, [0, 0, 0, 255]);
        let result = analyzer.analyze(&pixels, RectF::new(500.0, 500.0, 100.0, 100.0));
        assert_eq!(result, ColorResult::neutral());
    }

    #[test]
    fn css_rendering_matches_overlay_format() {
        let spec = ColorSpec::with_opacity(Rgb::BLACK, 0.95);
        assert_eq!(spec.css(), "rgba(0,0,0,0.95)");
        assert_eq!(ColorSpec::opaque(Rgb::WHITE).css(), "rgb(255,255,255)");
    }
}
