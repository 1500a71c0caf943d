//! Corner-point packing
//!
//! Items are placed largest first. Every placed item contributes its
//! top-left and bottom-right corners as candidate points; each following item
//! is tried with its bottom-left corner on every candidate, and the position
//! yielding the smallest and squarest overall box wins.

use crate::geometry::{Point, Rect};

use super::PlacementError;

/// One box to pack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackItem {
    pub name: String,
    pub ident: String,
    pub bbox: Rect,
    /// Free space kept around the item on every side
    pub clearance: i64,
}

impl PackItem {
    pub fn new(name: impl Into<String>, ident: impl Into<String>, bbox: Rect) -> Self {
        Self {
            name: name.into(),
            ident: ident.into(),
            bbox,
            clearance: 0,
        }
    }

    pub fn with_clearance(mut self, clearance: i64) -> Self {
        self.clearance = clearance;
        self
    }
}

/// Footprint metric of a candidate arrangement: sum of sides plus an aspect
/// ratio penalty
fn score(bbox: &Rect) -> i64 {
    bbox.width + bbox.height + (bbox.width - bbox.height).abs()
}

/// Pack `items` and return each item's new box, in input order.
///
/// Boxes are packed grown by their clearance, so two neighbours end up at
/// least the sum of their clearances apart. The arrangement is anchored with
/// the largest item's (grown) top-left corner at the origin. Ties in area are
/// broken by name, then identifier.
pub fn pack(items: &[PackItem]) -> Result<Vec<Rect>, PlacementError> {
    let padded: Vec<Rect> = items
        .iter()
        .map(|item| item.bbox.inflate(item.clearance))
        .collect();

    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        let (ia, ib) = (&items[a], &items[b]);
        padded[b]
            .area()
            .cmp(&padded[a].area())
            .then_with(|| ia.name.cmp(&ib.name))
            .then_with(|| ia.ident.cmp(&ib.ident))
    });

    let mut result: Vec<Rect> = padded.clone();
    let mut placed: Vec<usize> = Vec::with_capacity(items.len());
    let mut points: Vec<Point> = Vec::new();

    for (n, &idx) in order.iter().enumerate() {
        let item = &items[idx];
        let height = padded[idx].height;

        let chosen = if n == 0 {
            padded[idx].with_origin(Point::new(0, 0))
        } else {
            let mut best: Option<(i64, Rect)> = None;
            for pt in &points {
                let candidate = padded[idx].with_origin(Point::new(pt.x, pt.y - height));
                let blocked = placed
                    .iter()
                    .any(|&other| candidate.intersects(&result[other]));
                if blocked {
                    tracing::trace!("{}: collision at ({}, {})", item.name, pt.x, pt.y);
                    continue;
                }

                let overall = placed
                    .iter()
                    .fold(candidate, |acc, &other| acc.union(&result[other]));
                let size = score(&overall);
                if best.map_or(true, |(best_size, _)| size < best_size) {
                    best = Some((size, candidate));
                }
            }
            match best {
                Some((_, rect)) => rect,
                None => return Err(PlacementError::no_valid_point(&item.name, &item.ident)),
            }
        };

        tracing::debug!("placed {} at {}", item.name, chosen);
        result[idx] = chosen;
        placed.push(idx);

        let used = chosen.bottom_left();
        points.retain(|p| *p != used);
        points.push(chosen.top_left());
        points.push(chosen.bottom_right());
    }

    Ok(result
        .into_iter()
        .zip(items)
        .map(|(rect, item)| rect.inflate(-item.clearance))
        .collect())
}
