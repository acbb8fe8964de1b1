//! Region Capture: screenshot round-trip, crop to the image's rendered box
//! and delegation to the OCR collaborator, yielding the fragment list the
//! clusterer consumes.

pub mod rpc;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, GenericImageView, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

use crate::error::Failure;
use crate::geom::{quad_is_finite, Point, Quad, RectF};
use rpc::{request_with_timeout, RecognizedLine, RpcClient, RpcRequest, RpcResponse};

/// One recognized text unit in captured-image pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub description: String,
    pub quad: Quad,
}

/// Cropped pixels plus the fragments recognized inside them, both in the
/// same captured-pixel space (device-pixel scale baked in).
pub struct CaptureOutcome {
    pub pixels: RgbaImage,
    pub fragments: Vec<TextFragment>,
}

pub struct RegionCapture {
    relay: Arc<dyn RpcClient>,
}

impl RegionCapture {
    pub fn new(relay: Arc<dyn RpcClient>) -> Self {
        Self { relay }
    }

    /// Captures the visible region, crops it to `region` (layout coordinates,
    /// scaled by `scale` into device pixels) and runs recognition over the
    /// crop.
    pub async fn capture_region(
        &self,
        region: RectF,
        scale: f32,
    ) -> Result<CaptureOutcome, Failure> {
        let response = request_with_timeout(self.relay.as_ref(), RpcRequest::CaptureVisibleRegion)
            .await
            .map_err(Failure::Capture)?;
        let image_data = match response {
            RpcResponse::Captured { image_data } => image_data,
            other => {
                return Err(Failure::Capture(anyhow!(
                    "unexpected capture response: {:?}",
                    other
                )))
            }
        };

        let screenshot = decode_image_data(&image_data).map_err(Failure::Capture)?;
        let cropped = crop_to_region(&screenshot, region, scale).map_err(Failure::Capture)?;
        let crop_data = encode_image_data(&cropped).map_err(Failure::Capture)?;

        let response = request_with_timeout(
            self.relay.as_ref(),
            RpcRequest::Recognize {
                image_data: crop_data,
            },
        )
        .await
        .map_err(Failure::Recognition)?;
        let lines = match response {
            RpcResponse::Recognized { lines } => lines,
            other => {
                return Err(Failure::Recognition(anyhow!(
                    "unexpected recognition response: {:?}",
                    other
                )))
            }
        };

        Ok(CaptureOutcome {
            pixels: cropped,
            fragments: fragments_from_lines(lines),
        })
    }
}

/// Converts OCR lines into fragments. Whitespace is stripped from the
/// recognized text; lines with blank text or malformed boxes are skipped
/// (a bad box degrades one fragment, never the image).
pub fn fragments_from_lines(lines: Vec<RecognizedLine>) -> Vec<TextFragment> {
    let mut fragments = Vec::with_capacity(lines.len());
    for line in lines {
        let description: String = line
            .text
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect();
        if description.is_empty() {
            continue;
        }

        let quad: Quad = [
            Point::new(line.bounding_box[0][0], line.bounding_box[0][1]),
            Point::new(line.bounding_box[1][0], line.bounding_box[1][1]),
            Point::new(line.bounding_box[2][0], line.bounding_box[2][1]),
            Point::new(line.bounding_box[3][0], line.bounding_box[3][1]),
        ];
        if !quad_is_finite(&quad) {
            debug!("skipping fragment with malformed bounding box: {:?}", quad);
            continue;
        }

        fragments.push(TextFragment { description, quad });
    }
    fragments
}

/// Decodes a data URI (or bare base64) into pixels.
pub fn decode_image_data(image_data: &str) -> Result<DynamicImage> {
    let encoded = match image_data.split_once("base64,") {
        Some((_, payload)) => payload,
        None => image_data,
    };
    let bytes = BASE64
        .decode(encoded.trim())
        .with_context(|| "failed to decode captured image data")?;
    image::load_from_memory(&bytes).with_context(|| "failed to decode captured image")
}

/// Encodes pixels as a PNG data URI for the recognition relay.
pub fn encode_image_data(pixels: &RgbaImage) -> Result<String> {
    let mut bytes = Cursor::new(Vec::new());
    pixels
        .write_to(&mut bytes, image::ImageFormat::Png)
        .with_context(|| "failed to encode cropped region")?;
    let encoded = BASE64.encode(bytes.into_inner());
    Ok(format!("data:image/png;base64,{}", encoded))
}

fn crop_to_region(screenshot: &DynamicImage, region: RectF, scale: f32) -> Result<RgbaImage> {
    let (width, height) = screenshot.dimensions();
    let sx = ((region.x * scale).round().max(0.0) as u32).min(width);
    let sy = ((region.y * scale).round().max(0.0) as u32).min(height);
    let sw = ((region.w * scale).round().max(0.0) as u32).min(width - sx);
    let sh = ((region.h * scale).round().max(0.0) as u32).min(height - sy);
    if sw == 0 || sh == 0 {
        return Err(anyhow!("capture region is outside the screenshot"));
    }
    Ok(screenshot.crop_imm(sx, sy, sw, sh).to_rgba8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn line(text: &str, x: f32, y: f32, w: f32, h: f32) -> RecognizedLine {
        RecognizedLine {
            text: text.to_string(),
            bounding_box: [[x, y], [x + w, y], [x + w, y + h], [x, y + h]],
        }
    }

    #[test]
    fn whitespace_is_stripped_from_recognized_text() {
        let fragments = fragments_from_lines(vec![line("안 녕\t하", 0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].description, "안녕하");
    }

    #[test]
    fn blank_and_malformed_lines_are_skipped() {
        let mut bad_box = line("ok", 0.0, 0.0, 10.0, 10.0);
        bad_box.bounding_box[2] = [f32::NAN, 10.0];
        let fragments = fragments_from_lines(vec![line("  ", 0.0, 0.0, 5.0, 5.0), bad_box]);
        assert!(fragments.is_empty());
    }

    #[test]
    fn image_data_round_trips_through_the_data_uri() {
        let pixels = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let data = encode_image_data(&pixels).unwrap();
        assert!(data.starts_with("data:image/png;base64,"));
        let decoded = decode_image_data(&data).unwrap();
        assert_eq!(decoded.dimensions(), (4, 3));
    }

    #[test]
    fn crop_clamps_to_screenshot_bounds() {
        let screenshot =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 80, Rgba([0, 0, 0, 255])));
        let cropped = crop_to_region(&screenshot, RectF::new(60.0, 40.0, 100.0, 100.0), 1.0)
            .unwrap();
        assert_eq!(cropped.dimensions(), (40, 40));
    }

    #[test]
    fn empty_crop_is_an_error() {
        let screenshot =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 80, Rgba([0, 0, 0, 255])));
        assert!(crop_to_region(&screenshot, RectF::new(500.0, 0.0, 10.0, 10.0), 1.0).is_err());
    }
}
