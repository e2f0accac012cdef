//! Edge primitives and box helpers shared by the snapping engine.
//!
//! Points, vectors, boxes and transforms are the `kurbo` types. This module
//! adds the directed [`Edge`] the contour search works with, plus inclusive
//! box tests (`kurbo::Rect::contains` is half-open, which drops hits that sit
//! exactly on the border of a search region).

use kurbo::{Affine, Point, Rect, Vec2};

/// Tolerance for "is this an edge or nearly a point" tests, in microns.
pub const EPSILON: f64 = 1e-10;

/// Minimum length of a ruler segment, in microns.
pub const LENGTH_EPSILON: f64 = 1e-5;

/// An ordered pair of points.
///
/// An edge may be degenerate (`p1 == p2`), in which case it stands for a
/// point-like shape.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edge {
    pub p1: Point,
    pub p2: Point,
}

impl Edge {
    /// Create a new edge.
    pub const fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    /// Create an edge starting at `origin` and running along `direction`.
    pub fn from_direction(origin: Point, direction: Vec2) -> Self {
        Self::new(origin, origin + direction)
    }

    /// The direction vector `p2 - p1`.
    pub fn d(&self) -> Vec2 {
        self.p2 - self.p1
    }

    pub fn length(&self) -> f64 {
        self.d().hypot()
    }

    /// True if the edge is shorter than [`EPSILON`].
    pub fn is_degenerate(&self) -> bool {
        self.length() < EPSILON
    }

    pub fn reversed(&self) -> Self {
        Self::new(self.p2, self.p1)
    }

    pub fn bbox(&self) -> Rect {
        Rect::from_points(self.p1, self.p2)
    }

    /// Apply an affine transform to both end points.
    pub fn transformed(&self, affine: Affine) -> Self {
        Self::new(affine * self.p1, affine * self.p2)
    }

    /// Intersection of the supporting lines of `self` and `other`.
    ///
    /// The point does not need to lie on either segment. Returns `None` for
    /// parallel or degenerate edges.
    pub fn cut_point(&self, other: &Edge) -> Option<Point> {
        let d1 = self.d();
        let d2 = other.d();
        let denom = d1.cross(d2);
        if denom.abs() <= EPSILON * d1.hypot() * d2.hypot() {
            return None;
        }
        let t = (other.p1 - self.p1).cross(d2) / denom;
        Some(self.p1 + d1 * t)
    }

    /// Intersection of the two segments, if they cross.
    pub fn intersect_point(&self, other: &Edge) -> Option<Point> {
        self.cut_point(other)
            .filter(|&p| self.contains(p) && other.contains(p))
    }

    /// Distance from `point` to the segment.
    pub fn distance_to(&self, point: Point) -> f64 {
        let d = self.d();
        let len_sq = d.hypot2();
        if len_sq < EPSILON * EPSILON {
            return point.distance(self.p1);
        }
        let t = ((point - self.p1).dot(d) / len_sq).clamp(0.0, 1.0);
        point.distance(self.p1 + d * t)
    }

    /// Distance from `point` to the supporting line of the edge.
    pub fn line_distance(&self, point: Point) -> f64 {
        let d = self.d();
        let len = d.hypot();
        if len < EPSILON {
            return point.distance(self.p1);
        }
        (point - self.p1).cross(d).abs() / len
    }

    /// True if `point` lies on the segment within a coordinate-scaled
    /// tolerance.
    pub fn contains(&self, point: Point) -> bool {
        self.distance_to(point) <= tolerance_at(point)
    }

    /// The part of the segment inside `rect` (border included).
    pub fn clipped(&self, rect: &Rect) -> Option<Edge> {
        let d = self.d();
        let mut t0 = 0.0_f64;
        let mut t1 = 1.0_f64;
        let bounds = [
            (-d.x, self.p1.x - rect.x0),
            (d.x, rect.x1 - self.p1.x),
            (-d.y, self.p1.y - rect.y0),
            (d.y, rect.y1 - self.p1.y),
        ];
        for (p, q) in bounds {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else {
                let t = q / p;
                if p < 0.0 {
                    if t > t1 {
                        return None;
                    }
                    t0 = t0.max(t);
                } else {
                    if t < t0 {
                        return None;
                    }
                    t1 = t1.min(t);
                }
            }
        }
        Some(Edge::new(self.p1 + d * t0, self.p1 + d * t1))
    }
}

/// The vector rotated by -90 degrees.
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

/// Absolute tolerance for on-segment tests around `point`.
pub(crate) fn tolerance_at(point: Point) -> f64 {
    EPSILON * (1.0 + point.x.abs().max(point.y.abs()))
}

/// True if `point` is inside `rect`, border included.
pub fn rect_contains(rect: &Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// True if the two boxes overlap or share a border.
pub fn rects_touch(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Intersection of two boxes, or `None` if they do not touch.
pub fn rect_intersection(a: &Rect, b: &Rect) -> Option<Rect> {
    rects_touch(a, b).then(|| a.intersect(*b))
}

/// Square box of half-width `half_width` centered at `center`.
pub fn rect_around(center: Point, half_width: f64) -> Rect {
    Rect::new(
        center.x - half_width,
        center.y - half_width,
        center.x + half_width,
        center.y + half_width,
    )
}

/// True if two points coincide within the on-segment tolerance.
pub fn points_coincide(a: Point, b: Point) -> bool {
    a.distance(b) <= tolerance_at(a)
}
