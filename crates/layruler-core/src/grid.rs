//! Grid snapping.

use kurbo::{Point, Vec2};

/// Grid pitches at or below this value disable grid snapping.
pub const GRID_EPSILON: f64 = 1e-10;

/// Added before flooring so values a rounding error below a half step
/// still round up.
const ROUND_EPSILON: f64 = 1e-10;

/// Round to the nearest integer; halves round up.
pub fn snap_unit(c: f64) -> f64 {
    (c + 0.5 + ROUND_EPSILON).floor()
}

/// Snap a coordinate to the nearest multiple of `grid`.
///
/// A grid of `1e-10` or less is treated as "no grid" and returns `c`
/// unchanged.
pub fn snap_coord(c: f64, grid: f64) -> f64 {
    if grid <= GRID_EPSILON {
        c
    } else {
        snap_unit(c / grid) * grid
    }
}

/// Snap both coordinates of a point to the same grid pitch.
pub fn snap_point(p: Point, grid: f64) -> Point {
    Point::new(snap_coord(p.x, grid), snap_coord(p.y, grid))
}

/// Snap a point to an anisotropic grid.
///
/// If either component of `grid` is degenerate the point is returned
/// unchanged on both axes.
pub fn snap_xy(p: Point, grid: Vec2) -> Point {
    if grid.x <= GRID_EPSILON || grid.y <= GRID_EPSILON {
        p
    } else {
        Point::new(snap_coord(p.x, grid.x), snap_coord(p.y, grid.y))
    }
}

/// True if `grid` enables snapping on both axes.
pub fn is_active(grid: Vec2) -> bool {
    grid.x > GRID_EPSILON && grid.y > GRID_EPSILON
}
