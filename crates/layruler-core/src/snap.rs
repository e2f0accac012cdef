//! Snap functionality for aligning ruler points to grid, directions and
//! layout contours.
//!
//! [`obj_snap`] resolves one point, [`obj_snap2`] locates two facing
//! contours around a seed for auto-measurement. Both are total: a missing
//! snap target is reported through [`SnapTargetKind::None`] or
//! [`TwoPointSnapResult::found`], and a missing view simply disables object
//! snapping.

use crate::angle::{make_cutlines, AngleConstraint};
use crate::finder::{Candidate, ContourFinder};
use crate::geometry::{perpendicular, Edge, LENGTH_EPSILON};
use crate::grid::snap_xy;
use crate::view::LayoutView;
use kurbo::{Point, Vec2};

/// A plain projection onto a cutline only overrides a contour hit if it is
/// this many times closer (after adding the search range).
pub const PROJECTION_PENALTY: f64 = 5.0;

/// Relative tolerance for "cutline is collinear with the measurement".
const COLLINEAR_EPSILON: f64 = 1e-6;

/// What a snapped point is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SnapTargetKind {
    /// Not attached to any object.
    #[default]
    None,
    /// A shape vertex.
    Vertex,
    /// A point on a shape edge.
    Edge,
    /// A shape point without an edge, such as a point-like shape.
    Unspecific,
}

impl SnapTargetKind {
    fn of(candidate: &Candidate) -> Self {
        match (candidate.is_vertex, candidate.has_edge()) {
            (_, false) => SnapTargetKind::Unspecific,
            (true, true) => SnapTargetKind::Vertex,
            (false, true) => SnapTargetKind::Edge,
        }
    }

    /// Check if the point is attached to an object.
    pub fn is_object(self) -> bool {
        self != SnapTargetKind::None
    }
}

/// Result of a one-sided snap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    pub kind: SnapTargetKind,
    /// The edge the point is attached to. Only set for object snaps.
    pub object_ref: Option<Edge>,
}

impl SnapResult {
    /// Create a result not attached to any object.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            kind: SnapTargetKind::None,
            object_ref: None,
        }
    }

    fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            point: candidate.point,
            kind: SnapTargetKind::of(candidate),
            object_ref: candidate.edge(),
        }
    }

    /// Check if the point snapped to an object.
    pub fn is_snapped(&self) -> bool {
        self.kind.is_object()
    }
}

/// Result of a two-sided snap.
///
/// When `found` is false the points are meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TwoPointSnapResult {
    pub found: bool,
    pub first: Point,
    pub second: Point,
    pub first_kind: SnapTargetKind,
    pub second_kind: SnapTargetKind,
    pub first_ref: Option<Edge>,
    pub second_ref: Option<Edge>,
}

impl TwoPointSnapResult {
    pub fn not_found() -> Self {
        Self::default()
    }

    fn from_candidates(first: &Candidate, second: &Candidate) -> Self {
        Self {
            found: true,
            first: first.point,
            second: second.point,
            first_kind: SnapTargetKind::of(first),
            second_kind: SnapTargetKind::of(second),
            first_ref: first.edge(),
            second_ref: second.edge(),
        }
    }

    /// The measured segment, if found.
    pub fn edge(&self) -> Option<Edge> {
        self.found.then(|| Edge::new(self.first, self.second))
    }
}

/// Snap `seed` to the closest contour of `view`, or to the grid.
pub fn obj_snap(
    view: Option<&LayoutView>,
    seed: Point,
    grid: Vec2,
    search_range: f64,
) -> SnapResult {
    do_obj_snap(view, seed, grid, Vec::new(), search_range)
}

/// Snap `seed` under an angle constraint relative to `reference`.
///
/// Candidates must lie on one of the directions `mode` allows from
/// `reference`. Without a contour hit, the seed is projected onto the
/// closest allowed direction.
pub fn obj_snap_constrained(
    view: Option<&LayoutView>,
    reference: Point,
    seed: Point,
    grid: Vec2,
    mode: AngleConstraint,
    search_range: f64,
) -> SnapResult {
    do_obj_snap(view, seed, grid, make_cutlines(mode, reference), search_range)
}

/// Find two facing contours around `seed`.
pub fn obj_snap2(
    view: Option<&LayoutView>,
    seed: Point,
    grid: Vec2,
    min_range: f64,
    max_range: f64,
) -> TwoPointSnapResult {
    obj_snap2_constrained(view, seed, seed, grid, AngleConstraint::Any, min_range, max_range)
}

/// Find a contour near `seed1` and the facing contour towards `seed2`.
///
/// With a constraining `mode` the measurement runs along one of its
/// directions. The search range starts at `min_range` and doubles while it
/// stays within `max_range`.
pub fn obj_snap2_constrained(
    view: Option<&LayoutView>,
    seed1: Point,
    seed2: Point,
    grid: Vec2,
    mode: AngleConstraint,
    min_range: f64,
    max_range: f64,
) -> TwoPointSnapResult {
    let Some(view) = view else {
        return TwoPointSnapResult::not_found();
    };

    let p1s = snap_xy(seed1, grid);
    let p2s = snap_xy(seed2, grid);
    let cutlines = make_cutlines(mode, p1s);
    let with_vertex = cutlines.is_empty();

    let first_finder = ContourFinder::new(p1s, grid, cutlines.clone(), with_vertex);
    let Some(first) = find_exact(&first_finder, view, min_range, max_range) else {
        log::debug!("Auto-measure at {p1s:?} ({mode:?}): no first contour up to {max_range}");
        return TwoPointSnapResult::not_found();
    };

    let directed = directed_cutlines(&cutlines, &first, p2s);
    if directed.is_empty() {
        log::debug!("Auto-measure at {p1s:?}: no direction towards {p2s:?}");
        return TwoPointSnapResult::not_found();
    }

    let second_finder = ContourFinder::new(p2s, grid, directed, false)
        .directed(true)
        .excluding(first.point);
    let Some(second) = find_exact(&second_finder, view, min_range, max_range) else {
        log::debug!("Auto-measure at {p1s:?} ({mode:?}): no facing contour up to {max_range}");
        return TwoPointSnapResult::not_found();
    };

    log::debug!("Auto-measure at {p1s:?}: {:?} -> {:?}", first.point, second.point);
    TwoPointSnapResult::from_candidates(&first, &second)
}

fn do_obj_snap(
    view: Option<&LayoutView>,
    seed: Point,
    grid: Vec2,
    cutlines: Vec<Edge>,
    search_range: f64,
) -> SnapResult {
    let projection = closest_projection(snap_xy(seed, grid), &cutlines);

    let found = view.and_then(|view| {
        let finder = ContourFinder::new(seed, grid, cutlines, true);
        finder.find(view, search_range).found().copied()
    });

    let result = match (found, projection) {
        (Some(hit), Some(projected))
            if (seed.distance(projected) + search_range) * PROJECTION_PENALTY < hit.distance =>
        {
            SnapResult::none(projected)
        }
        (Some(hit), _) => SnapResult::from_candidate(&hit),
        (None, Some(projected)) => SnapResult::none(projected),
        (None, None) => SnapResult::none(snap_xy(seed, grid)),
    };
    log::debug!("Snap {seed:?} within {search_range}: {:?} at {:?}", result.kind, result.point);
    result
}

/// The closest foot of a perpendicular from `p` onto any cutline.
fn closest_projection(p: Point, cutlines: &[Edge]) -> Option<Point> {
    cutlines
        .iter()
        .filter_map(|cl| cl.cut_point(&Edge::from_direction(p, perpendicular(cl.d()))))
        .fold(None, |best: Option<Point>, q| match best {
            Some(b) if p.distance(b) <= p.distance(q) => Some(b),
            _ => Some(q),
        })
}

/// Run `finder` with a doubling search range until it finds an exact hit.
fn find_exact(
    finder: &ContourFinder,
    view: &LayoutView,
    min_range: f64,
    max_range: f64,
) -> Option<Candidate> {
    let mut range = if min_range > 0.0 { min_range } else { max_range };
    if !(range > 0.0) {
        return None;
    }
    while range <= max_range {
        if let Some(hit) = finder.find(view, range).exact {
            return Some(hit);
        }
        range *= 2.0;
        log::debug!("No exact contour at {:?}, widening search to {range}", finder.seed());
    }
    None
}

/// Cutlines for the second leg of an auto-measurement, pointing from the
/// first hit towards `target`.
///
/// Empty when `target` sits on the first hit: there is no direction left
/// to measure in.
fn directed_cutlines(cutlines: &[Edge], first: &Candidate, target: Point) -> Vec<Edge> {
    let p1 = first.point;
    let d = target - p1;
    if d.hypot() < LENGTH_EPSILON {
        return Vec::new();
    }
    let towards = |n: Vec2| if n.dot(d) < 0.0 { -n } else { n };

    if !cutlines.is_empty() {
        cutlines
            .iter()
            .map(Edge::d)
            .filter(|n| n.cross(d).abs() < COLLINEAR_EPSILON * n.hypot() * d.hypot())
            .map(|n| Edge::from_direction(p1, towards(n)))
            .collect()
    } else if first.is_vertex {
        vec![Edge::new(p1, target)]
    } else if let Some(edge) = first.edge() {
        vec![Edge::from_direction(p1, towards(perpendicular(edge.d())))]
    } else {
        Vec::new()
    }
}
