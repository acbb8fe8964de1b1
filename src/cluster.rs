//! Groups raw recognition fragments into translatable lines and bubbles.

use crate::capture::TextFragment;
use crate::geom::RectF;

/// One translatable unit: an ordered run of fragments plus its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGroup {
    pub fragments: Vec<TextFragment>,
    pub bounds: RectF,
}

impl TextGroup {
    fn from_fragments(fragments: Vec<TextFragment>) -> Self {
        let mut bounds = RectF::from_quad(&fragments[0].quad);
        for fragment in &fragments[1..] {
            bounds = bounds.union(&RectF::from_quad(&fragment.quad));
        }
        Self { fragments, bounds }
    }

    /// Source text of the whole group, fragments joined left to right.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|fragment| fragment.description.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Clusters fragments into line/bubble groups.
///
/// `image_width` is the captured image's total width, used to normalize
/// horizontal centers; pass 0.0 to derive it from the fragments themselves.
///
/// Deterministic and total: every fragment lands in exactly one group, and
/// groups come out in sweep order (top to bottom, left/center/right within a
/// row split by the spread policy).
pub fn group_nearby_text(
    fragments: &[TextFragment],
    image_width: f32,
    spread_threshold: f32,
) -> Vec<TextGroup> {
    if fragments.is_empty() {
        return Vec::new();
    }

    let rects: Vec<RectF> = fragments
        .iter()
        .map(|fragment| RectF::from_quad(&fragment.quad))
        .collect();

    let mut order: Vec<usize> = (0..fragments.len()).collect();
    order.sort_by(|&a, &b| rects[a].y.total_cmp(&rects[b].y));

    let line_height = rects.iter().map(|rect| rect.h).sum::<f32>() / rects.len() as f32;
    let image_width = if image_width > 0.0 {
        image_width
    } else {
        rects
            .iter()
            .map(|rect| rect.right())
            .fold(0.0_f32, f32::max)
            .max(1.0)
    };

    let mut used = vec![false; fragments.len()];
    let mut groups = Vec::new();

    for (pos, &seed) in order.iter().enumerate() {
        if used[seed] {
            continue;
        }
        let seed_top = rects[seed].y;

        let mut line = Vec::new();
        for &candidate in &order[pos..] {
            if used[candidate] {
                continue;
            }
            if (rects[candidate].y - seed_top).abs() < line_height * 0.5 {
                used[candidate] = true;
                line.push(candidate);
            }
        }

        line.sort_by(|&a, &b| rects[a].x.total_cmp(&rects[b].x));

        let fractions: Vec<f32> = line
            .iter()
            .map(|&idx| rects[idx].center_x() / image_width)
            .collect();
        let spread = fractions.iter().copied().fold(f32::NEG_INFINITY, f32::max)
            - fractions.iter().copied().fold(f32::INFINITY, f32::min);

        if spread > spread_threshold {
            // The row straddles independent regions (separate bubbles at the
            // same height): split by horizontal position.
            let mut left = Vec::new();
            let mut center = Vec::new();
            let mut right = Vec::new();
            for &idx in &line {
                let center_x = rects[idx].center_x();
                if center_x < image_width * 0.4 {
                    left.push(idx);
                } else if center_x > image_width * 0.6 {
                    right.push(idx);
                } else {
                    center.push(idx);
                }
            }
            for bucket in [left, center, right] {
                if !bucket.is_empty() {
                    groups.push(TextGroup::from_fragments(
                        bucket.iter().map(|&idx| fragments[idx].clone()).collect(),
                    ));
                }
            }
        } else {
            groups.push(TextGroup::from_fragments(
                line.iter().map(|&idx| fragments[idx].clone()).collect(),
            ));
        }
    }

    groups
}
