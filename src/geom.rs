use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Quadrilateral bounding box in captured-image pixel space, vertex order
/// top-left, top-right, bottom-right, bottom-left.
pub type Quad = [Point; 4];

pub fn quad_is_finite(quad: &Quad) -> bool {
    quad.iter()
        .all(|point| point.x.is_finite() && point.y.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RectF {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_quad(quad: &Quad) -> Self {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for point in quad {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Self {
            x: min_x,
            y: min_y,
            w: max_x - min_x,
            h: max_y - min_y,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn union(&self, other: &RectF) -> RectF {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        RectF {
            x,
            y,
            w: right - x,
            h: bottom - y,
        }
    }

    pub fn scaled(&self, factor: f32) -> RectF {
        RectF {
            x: self.x * factor,
            y: self.y * factor,
            w: self.w * factor,
            h: self.h * factor,
        }
    }

    /// Integer key for geometry-based caching.
    pub fn rounded(&self) -> (i32, i32, i32, i32) {
        (
            self.x.round() as i32,
            self.y.round() as i32,
            self.w.round() as i32,
            self.h.round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_from_quad_spans_extremes() {
        let quad = [
            Point::new(10.0, 5.0),
            Point::new(40.0, 5.0),
            Point::new(40.0, 25.0),
            Point::new(10.0, 25.0),
        ];
        let rect = RectF::from_quad(&quad);
        assert_eq!(rect, RectF::new(10.0, 5.0, 30.0, 20.0));
    }

    #[test]
    fn union_covers_both_rects() {
        let a = RectF::new(0.0, 0.0, 10.0, 10.0);
        let b = RectF::new(20.0, 5.0, 10.0, 30.0);
        let merged = a.union(&b);
        assert_eq!(merged, RectF::new(0.0, 0.0, 30.0, 35.0));
    }

    #[test]
    fn rounded_key_is_stable_for_subpixel_noise() {
        let a = RectF::new(10.2, 20.4, 100.1, 50.0);
        let b = RectF::new(9.8, 19.6, 99.9, 50.4);
        assert_eq!(a.rounded(), b.rounded());
    }

    #[test]
    fn non_finite_quad_is_rejected() {
        let quad = [
            Point::new(f32::NAN, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!(!quad_is_finite(&quad));
    }
}
