//! 2D geometry operations on the XZ plane
//!
//! Navigation cells are evaluated in their xz-column, so most operations here
//! take [`Vec2`] values where `x` is the world x-value and `y` is the world
//! z-value. Use [`xz`] to project a 3D position.

use crate::{Vec2, Vec3};

/// Standard tolerance used for "close enough" comparisons of positions.
pub const TOLERANCE_STD: f32 = 0.0001;

/// Projects a 3D position onto the XZ plane.
#[inline]
pub fn xz(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Position of a point relative to a directed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLineRelation {
    /// The point is left of the line when looking from A toward B.
    LeftSide,
    /// The point is right of the line when looking from A toward B.
    RightSide,
    /// The point lies on the line within tolerance.
    OnLine,
}

impl PointLineRelation {
    /// Classifies a signed distance from a line.
    ///
    /// Positive distances are on the right, negative on the left.
    pub fn from_signed_distance(distance: f32, tolerance: f32) -> Self {
        if distance > tolerance {
            PointLineRelation::RightSide
        } else if distance < -tolerance {
            PointLineRelation::LeftSide
        } else {
            PointLineRelation::OnLine
        }
    }
}

/// Relationship between line AB and line CD.
///
/// Variants that intersect at a single point carry the intersection point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineRelation {
    /// The lines are collinear.
    Collinear,
    /// The lines are parallel and do not overlap.
    Parallel,
    /// The two segments intersect.
    SegmentsIntersect(Vec2),
    /// Line AB crosses segment CD but segment AB does not reach it.
    ALineCrossesBSeg(Vec2),
    /// Line CD crosses segment AB but segment CD does not reach it.
    BLineCrossesASeg(Vec2),
    /// The lines intersect outside both segments.
    LinesIntersect(Vec2),
}

/// Determines the relationship between lines AB and CD.
///
/// The check is inclusive of segment end points, but floating point error can
/// cause an end point intersection to be classified as one of the line
/// crossing variants.
pub fn line_relationship(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> LineRelation {
    let delta_ab = b - a;
    let delta_cd = d - c;
    let delta_ca = a - c;

    let numerator = (delta_ca.y * delta_cd.x) - (delta_ca.x * delta_cd.y);
    let denominator = (delta_ab.x * delta_cd.y) - (delta_ab.y * delta_cd.x);

    if denominator == 0.0 {
        if numerator == 0.0 {
            return LineRelation::Collinear;
        }
        return LineRelation::Parallel;
    }

    let factor_ab = numerator / denominator;
    let factor_cd = ((delta_ca.y * delta_ab.x) - (delta_ca.x * delta_ab.y)) / denominator;

    let point = a + delta_ab * factor_ab;

    let ab_in_range = (0.0..=1.0).contains(&factor_ab);
    let cd_in_range = (0.0..=1.0).contains(&factor_cd);

    match (ab_in_range, cd_in_range) {
        (true, true) => LineRelation::SegmentsIntersect(point),
        (false, true) => LineRelation::ALineCrossesBSeg(point),
        (true, false) => LineRelation::BLineCrossesASeg(point),
        (false, false) => LineRelation::LinesIntersect(point),
    }
}

/// Normalized normal of the line A to B, pointing to the right of the line.
///
/// Returns zero if A and B are too close to form a line.
pub fn line_normal_2d(a: Vec2, b: Vec2) -> Vec2 {
    if sloppy_equals_2d(a, b, TOLERANCE_STD) {
        return Vec2::ZERO;
    }
    let dir = (b - a).normalize_or_zero();
    Vec2::new(dir.y, -dir.x)
}

/// Twice the signed area of triangle ABC.
///
/// Positive when the vertices wind clockwise in a left-handed view, negative
/// for the reverse. Zero for collinear points.
#[inline]
pub fn signed_area_x2_2d(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

/// True if every component of `a` is within `tolerance` of `b`.
#[inline]
pub fn sloppy_equals_2d(a: Vec2, b: Vec2, tolerance: f32) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

/// True if every component of `a` is within `tolerance` of `b`.
#[inline]
pub fn sloppy_equals_3d(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    (a.x - b.x).abs() <= tolerance
        && (a.y - b.y).abs() <= tolerance
        && (a.z - b.z).abs() <= tolerance
}

/// Check if a point lies within a rectangle (inclusive).
#[inline]
pub fn rect_contains_point(min: Vec2, max: Vec2, p: Vec2) -> bool {
    !(p.x < min.x || p.y < min.y || p.x > max.x || p.y > max.y)
}

/// Check if rectangle B lies fully within rectangle A (inclusive).
#[inline]
pub fn rect_contains_rect(amin: Vec2, amax: Vec2, bmin: Vec2, bmax: Vec2) -> bool {
    bmin.x >= amin.x && bmin.y >= amin.y && bmax.x <= amax.x && bmax.y <= amax.y
}

/// Check if two rectangles overlap (inclusive of touching edges).
#[inline]
pub fn rect_intersects(amin: Vec2, amax: Vec2, bmin: Vec2, bmax: Vec2) -> bool {
    !(bmax.x < amin.x || amax.x < bmin.x || bmax.y < amin.y || amax.y < bmin.y)
}

/// Moves from A toward B by `factor` of the distance between them.
#[inline]
pub fn translate_toward(a: Vec3, b: Vec3, factor: f32) -> Vec3 {
    a + (b - a) * factor
}
