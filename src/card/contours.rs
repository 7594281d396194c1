//! Contour collector and region selector
//!
//! External outlines are traced with [`imageproc::contours::find_contours`].
//! A contour's area is the number of pixels enclosed by its outline, holes
//! included, computed from the traced boundary with Pick's theorem.

use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use std::cmp::Ordering;

use super::types::{CardError, Result};
use crate::raster::{BinaryMask, BoundingBox};

/// One external outline of a merged mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContourRegion {
    /// Enclosed pixel count
    pub area: u64,
    /// Axis-aligned bounds of the outline
    pub bounds: BoundingBox,
    /// Boundary pixels in tracing order
    pub points: Vec<Point<i32>>,
}

impl ContourRegion {
    fn from_points(points: Vec<Point<i32>>) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        Some(Self {
            area: enclosed_pixel_count(&points),
            bounds: BoundingBox::from_edges(
                min_x.max(0) as u32,
                min_y.max(0) as u32,
                (max_x + 1).max(0) as u32,
                (max_y + 1).max(0) as u32,
            ),
            points,
        })
    }

    /// Total order used to pick the anchor: larger area first, then
    /// top-most, then left-most
    pub fn anchor_order(&self, other: &Self) -> Ordering {
        other
            .area
            .cmp(&self.area)
            .then(self.bounds.y.cmp(&other.bounds.y))
            .then(self.bounds.x.cmp(&other.bounds.x))
    }
}

/// Pixels on or inside a closed lattice polygon: `A + B/2 + 1`
fn enclosed_pixel_count(points: &[Point<i32>]) -> u64 {
    let n = points.len();
    let mut twice_area: i64 = 0;
    let mut boundary: i64 = 0;

    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice_area += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        boundary += gcd((b.x - a.x).abs() as i64, (b.y - a.y).abs() as i64);
    }

    ((twice_area.abs() + boundary) / 2 + 1) as u64
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Extracts external outlines and applies the minimum-area filter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourCollector {
    /// Minimum enclosed area, already scaled to the image resolution
    pub min_area: f64,
}

impl ContourCollector {
    /// `min_area` is given at baseline resolution and scaled by `scale^2`
    pub fn new(min_area: u32, scale: f32) -> Self {
        Self {
            min_area: min_area as f64 * (scale as f64).powi(2),
        }
    }

    /// All external outlines in scan order, before filtering
    pub fn outlines(mask: &BinaryMask) -> Vec<ContourRegion> {
        find_contours::<i32>(mask.as_gray())
            .into_iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
            .filter_map(|c| ContourRegion::from_points(c.points))
            .collect()
    }

    /// External outlines whose area clears the threshold
    pub fn collect(&self, mask: &BinaryMask) -> Vec<ContourRegion> {
        let all = Self::outlines(mask);
        let total = all.len();
        let survivors: Vec<ContourRegion> = all
            .into_iter()
            .filter(|c| c.area as f64 >= self.min_area)
            .collect();

        tracing::debug!(
            total,
            survivors = survivors.len(),
            min_area = self.min_area,
            "collected contours"
        );
        survivors
    }
}

/// Anchor plus union of every surviving contour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSelection {
    pub anchor: ContourRegion,
    pub union: BoundingBox,
    pub survivors: usize,
}

/// Pick the largest contour as anchor and union all survivors' boxes
pub fn select_region(mut regions: Vec<ContourRegion>) -> Result<RegionSelection> {
    if regions.is_empty() {
        return Err(CardError::NoContentFound);
    }

    regions.sort_by(ContourRegion::anchor_order);
    let union = BoundingBox::union_all(regions.iter().map(|r| &r.bounds))
        .ok_or(CardError::NoContentFound)?;
    let survivors = regions.len();
    let anchor = regions.swap_remove(0);

    Ok(RegionSelection {
        anchor,
        union,
        survivors,
    })
}
