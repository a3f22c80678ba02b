//! Classical plate localization: smooth, detect edges, and keep the largest
//! contour that simplifies to a quadrilateral.

use image::{DynamicImage, GrayImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::filter::bilateral_filter;
use imageproc::geometry::{approximate_polygon_dp, contour_area};
use imageproc::point::Point;
use tracing::{debug, instrument};

use crate::models::detection::PlateRegion;

const BILATERAL_WINDOW: u32 = 11;
const BILATERAL_SIGMA_COLOR: f32 = 17.0;
const BILATERAL_SIGMA_SPATIAL: f32 = 17.0;

const CANNY_LOW: f32 = 30.0;
const CANNY_HIGH: f32 = 200.0;

/// Only this many of the largest contours are ever considered.
pub const MAX_CANDIDATE_CONTOURS: usize = 10;

/// Douglas-Peucker tolerance in pixels.
const POLYGON_EPSILON: f64 = 10.0;

/// Find the most plate-like quadrilateral in `frame`.
///
/// Returns `None` when none of the largest contours simplifies to exactly
/// four vertices; callers fall back to reading the whole frame.
#[instrument(skip(frame), fields(width = frame.width(), height = frame.height()), level = "debug")]
pub fn locate_plate(frame: &DynamicImage) -> Option<PlateRegion> {
    let gray = frame.to_luma8();
    let smoothed = bilateral_filter(
        &gray,
        BILATERAL_WINDOW,
        BILATERAL_SIGMA_COLOR,
        BILATERAL_SIGMA_SPATIAL,
    );
    let edges = canny(&smoothed, CANNY_LOW, CANNY_HIGH);
    locate_in_edges(&edges)
}

/// Contour stage of [`locate_plate`], over an already computed edge map.
pub fn locate_in_edges(edges: &GrayImage) -> Option<PlateRegion> {
    let mut contours: Vec<(f64, Vec<Point<i32>>)> = find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.points.len() >= 3)
        .map(|c| (contour_area(&c.points), c.points))
        .collect();

    // Stable sort keeps discovery order among equal areas.
    contours.sort_by(|a, b| b.0.total_cmp(&a.0));

    debug!(contours = contours.len(), "Ranked external contours");

    contours
        .into_iter()
        .take(MAX_CANDIDATE_CONTOURS)
        .find_map(|(area, points)| {
            let polygon = approximate_closed(&points, POLYGON_EPSILON);
            let corners: [Point<i32>; 4] = polygon.try_into().ok()?;
            Some(PlateRegion {
                corners: corners.map(|p| (p.x, p.y)),
                contour_area: area,
            })
        })
}

/// Simplify a closed contour.
///
/// The contour is split at the point farthest from its start and each half is
/// simplified as an open chain, so a rectangle keeps all four corners no matter
/// where tracing began. The result does not repeat its first vertex.
fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let Some(&start) = points.first() else {
        return Vec::new();
    };

    let far = points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| squared_distance(start, **p))
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return vec![start];
    }

    let mut polygon = approximate_polygon_dp(&points[..=far], epsilon, false);

    let mut closing = points[far..].to_vec();
    closing.push(start);
    let second = approximate_polygon_dp(&closing, epsilon, false);

    // `second` starts at points[far] and ends at `start`, both already present.
    if second.len() > 2 {
        polygon.extend_from_slice(&second[1..second.len() - 1]);
    }
    polygon
}

fn squared_distance(a: Point<i32>, b: Point<i32>) -> i64 {
    let dx = i64::from(a.x - b.x);
    let dy = i64::from(a.y - b.y);
    dx * dx + dy * dy
}
