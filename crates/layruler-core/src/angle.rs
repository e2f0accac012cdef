//! Angle constraints for ruler directions.

use crate::geometry::Edge;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Vectors shorter than this are returned unchanged by [`snap_angle`].
const ANGLE_EPSILON: f64 = 1e-6;

const HORIZONTAL: Vec2 = Vec2::new(1.0, 0.0);
const VERTICAL: Vec2 = Vec2::new(0.0, 1.0);
const DIAGONAL_UP: Vec2 = Vec2::new(1.0, 1.0);
const DIAGONAL_DOWN: Vec2 = Vec2::new(1.0, -1.0);

/// Restriction on the direction of a ruler segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AngleConstraint {
    /// Any direction.
    #[default]
    Any,
    /// Multiples of 45 degrees.
    Diagonal,
    /// Horizontal or vertical.
    Ortho,
    Horizontal,
    Vertical,
    /// Use the caller's configured default.
    Global,
}

impl AngleConstraint {
    /// Replace `Global` by `default`.
    ///
    /// A `Global` default resolves to `Any`.
    pub fn resolve(self, default: AngleConstraint) -> AngleConstraint {
        match (self, default) {
            (AngleConstraint::Global, AngleConstraint::Global) => AngleConstraint::Any,
            (AngleConstraint::Global, default) => default,
            (mode, _) => mode,
        }
    }

    /// Reference directions allowed by this mode, in tie-break order.
    ///
    /// `Any` and `Global` have none.
    pub fn reference_directions(self) -> &'static [Vec2] {
        match self {
            AngleConstraint::Any | AngleConstraint::Global => &[],
            AngleConstraint::Diagonal => &[HORIZONTAL, VERTICAL, DIAGONAL_UP, DIAGONAL_DOWN],
            AngleConstraint::Ortho => &[HORIZONTAL, VERTICAL],
            AngleConstraint::Horizontal => &[HORIZONTAL],
            AngleConstraint::Vertical => &[VERTICAL],
        }
    }
}

/// Project `v` onto the closest reference direction of `mode`.
///
/// Also returns the winning direction (possibly negated), or `None` when the
/// vector was returned unchanged.
pub fn snap_angle_with_reference(v: Vec2, mode: AngleConstraint) -> (Vec2, Option<Vec2>) {
    let refs = mode.reference_directions();
    let len = v.hypot();
    if refs.is_empty() || len < ANGLE_EPSILON {
        return (v, None);
    }

    let mut best: Option<(Vec2, f64)> = None;
    for &r in refs {
        for dir in [r, -r] {
            let cos = v.dot(dir) / (len * dir.hypot());
            if best.is_none_or(|(_, best_cos)| cos > best_cos) {
                best = Some((dir, cos));
            }
        }
    }

    match best {
        Some((dir, cos)) => (dir * (len * cos / dir.hypot()), Some(dir)),
        None => (v, None),
    }
}

/// Project `v` onto the closest reference direction of `mode`.
pub fn snap_angle(v: Vec2, mode: AngleConstraint) -> Vec2 {
    snap_angle_with_reference(v, mode).0
}

/// One cutline per reference direction, starting at `origin`.
pub fn make_cutlines(mode: AngleConstraint, origin: Point) -> Vec<Edge> {
    mode.reference_directions()
        .iter()
        .map(|&r| Edge::from_direction(origin, r))
        .collect()
}
