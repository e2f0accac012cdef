//! Contour search around a seed point.
//!
//! [`ContourFinder`] walks the visible part of a [`LayoutView`] inside a
//! square search region and collects the best point on a shape contour.
//! Candidates are kept on two tracks:
//!
//! - the *exact* track holds points that satisfy the constraints precisely
//!   (a cutline crossing inside both the edge and the region, or any vertex
//!   or edge point in unconstrained mode),
//! - the *generic* track holds points inferred from supporting lines only.
//!
//! Exact candidates always win over generic ones. Within a track the closest
//! candidate wins and ties go to the first one found.

use crate::geometry::{
    perpendicular, points_coincide, rect_around, rect_contains, rect_intersection, rects_touch,
    tolerance_at, Edge, LENGTH_EPSILON,
};
use crate::grid::{is_active, snap_xy};
use crate::layout::{CellIndex, LayerIndex};
use crate::view::LayoutView;
use kurbo::{Affine, Point, Rect, Vec2};

/// Default number of shape and instance visits per search.
pub const DEFAULT_TEST_BUDGET: usize = 10_000;

/// A point found on a contour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub point: Point,
    /// Distance to the seed.
    pub distance: f64,
    /// True if the point is a shape vertex.
    pub is_vertex: bool,
    edges: [Option<Edge>; 2],
}

impl Candidate {
    fn new(point: Point, distance: f64, edge: Option<Edge>, is_vertex: bool) -> Self {
        Self {
            point,
            distance,
            is_vertex,
            edges: [edge, None],
        }
    }

    /// The edge the point was found on, if any.
    pub fn edge(&self) -> Option<Edge> {
        self.edges[0]
    }

    /// True if the candidate is anchored to an edge.
    pub fn has_edge(&self) -> bool {
        self.edges[0].is_some()
    }

    /// Edges meeting at the point. Vertices shared by two edges report both.
    pub fn incident_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.iter().flatten().copied()
    }

    fn merge_vertex(&mut self, edge: Option<Edge>) {
        self.is_vertex = true;
        let Some(edge) = edge else {
            return;
        };
        match self.edges {
            [None, _] => self.edges[0] = Some(edge),
            [Some(first), None] if first != edge && first != edge.reversed() => {
                self.edges[1] = Some(edge);
            }
            _ => {}
        }
    }
}

/// Offer a point to a track.
///
/// A point coinciding with the current best only upgrades it to a vertex.
/// Otherwise it replaces the best when strictly closer.
fn offer(
    best: &mut Option<Candidate>,
    seed: Point,
    point: Point,
    edge: Option<Edge>,
    is_vertex: bool,
) {
    let distance = seed.distance(point);
    match best {
        Some(current) if points_coincide(current.point, point) => {
            if is_vertex {
                current.merge_vertex(edge);
            }
        }
        Some(current) if distance >= current.distance => {}
        _ => *best = Some(Candidate::new(point, distance, edge, is_vertex)),
    }
}

/// Result of one search.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchOutcome {
    pub exact: Option<Candidate>,
    pub generic: Option<Candidate>,
    /// True if the search stopped because the test budget ran out.
    pub exhausted: bool,
}

impl SearchOutcome {
    /// True if any candidate was found.
    pub fn any(&self) -> bool {
        self.exact.is_some() || self.generic.is_some()
    }

    pub fn any_exact(&self) -> bool {
        self.exact.is_some()
    }

    /// The best candidate: exact if there is one, generic otherwise.
    pub fn found(&self) -> Option<&Candidate> {
        self.exact.as_ref().or(self.generic.as_ref())
    }
}

/// Hard cap on shape and instance visits.
#[derive(Debug, Clone, Copy)]
struct TestBudget {
    remaining: usize,
    exhausted: bool,
}

impl TestBudget {
    fn new(limit: usize) -> Self {
        Self {
            remaining: limit,
            exhausted: false,
        }
    }

    /// Take one visit from the budget. Returns false once it is used up.
    fn consume(&mut self) -> bool {
        if self.remaining == 0 {
            self.exhausted = true;
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Search parameters for one contour query.
#[derive(Debug, Clone)]
pub struct ContourFinder {
    seed: Point,
    cutlines: Vec<Edge>,
    with_vertex: bool,
    directed: bool,
    excluded: Option<Point>,
    budget: usize,
}

impl ContourFinder {
    /// Create a finder around `seed`.
    ///
    /// Without cutlines and with an active `grid`, the grid lines around the
    /// seed's grid position act as cutlines so grid points on contours are
    /// found through the same crossing tests.
    pub fn new(seed: Point, grid: Vec2, cutlines: Vec<Edge>, with_vertex: bool) -> Self {
        let cutlines = if cutlines.is_empty() && is_active(grid) {
            grid_cutlines(seed, grid)
        } else {
            cutlines
        };
        Self {
            seed,
            cutlines,
            with_vertex,
            directed: false,
            excluded: None,
            budget: DEFAULT_TEST_BUDGET,
        }
    }

    /// Only accept candidates ahead of the seed along every cutline.
    pub fn directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }

    /// Ignore candidates within [`LENGTH_EPSILON`] of `p`.
    pub fn excluding(mut self, p: Point) -> Self {
        self.excluded = Some(p);
        self
    }

    /// Override the visit budget.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget;
        self
    }

    pub fn seed(&self) -> Point {
        self.seed
    }

    pub fn cutlines(&self) -> &[Edge] {
        &self.cutlines
    }

    /// Search the visible shapes of `view` within `search_range` microns of
    /// the seed.
    pub fn find(&self, view: &LayoutView, search_range: f64) -> SearchOutcome {
        let layout = view.layout();
        let search_box = rect_around(self.seed, search_range.max(0.0));
        let mut search = Search {
            finder: self,
            view,
            layer: 0,
            region: search_box,
            budget: TestBudget::new(self.budget),
            outcome: SearchOutcome::default(),
        };

        'layers: for entry in view.layers() {
            let Some(layer) = entry.layer else {
                continue;
            };
            if !entry.visible {
                log::trace!("Skipping hidden layer {}", entry.name);
                continue;
            }
            for variant in entry.transform_variants() {
                if search.budget.exhausted {
                    break 'layers;
                }
                let global = variant * Affine::scale(layout.dbu());
                let domain = global.transform_rect_bbox(layout.domain());
                let Some(region) = rect_intersection(&search_box, &domain) else {
                    continue;
                };
                search.layer = layer;
                search.region = region;
                search.walk(view.top(), global);
            }
        }

        if search.budget.exhausted {
            log::trace!(
                "Contour search at {:?} stopped: test budget of {} used up",
                self.seed,
                self.budget
            );
        }
        search.outcome.exhausted = search.budget.exhausted;
        search.outcome
    }

    /// True if `p` lies ahead of the seed along every cutline.
    ///
    /// Exact candidates may sit level with the seed, generic ones must be
    /// strictly ahead.
    fn is_forward(&self, p: Point, strict: bool) -> bool {
        !self.directed
            || self.cutlines.iter().all(|cl| {
                let s = (p - self.seed).dot(cl.d());
                if strict { s > 0.0 } else { s >= 0.0 }
            })
    }

    fn on_cutline(&self, p: Point) -> bool {
        self.cutlines.iter().any(|cl| cl.line_distance(p) <= tolerance_at(p))
    }

    fn is_excluded(&self, p: Point) -> bool {
        self.excluded.is_some_and(|q| q.distance(p) < LENGTH_EPSILON)
    }
}

/// Vertical and horizontal grid lines through the seed's grid point and
/// through the neighbouring grid lines on the seed's side.
fn grid_cutlines(seed: Point, grid: Vec2) -> Vec<Edge> {
    let pg = snap_xy(seed, grid);
    let dx = if seed.x < pg.x { -grid.x } else { grid.x };
    let dy = if seed.y < pg.y { -grid.y } else { grid.y };
    let up = Vec2::new(0.0, 1.0);
    let right = Vec2::new(1.0, 0.0);
    vec![
        Edge::from_direction(pg, up),
        Edge::from_direction(pg + Vec2::new(dx, 0.0), up),
        Edge::from_direction(pg, right),
        Edge::from_direction(pg + Vec2::new(0.0, dy), right),
    ]
}

/// Traversal state of one search.
struct Search<'a> {
    finder: &'a ContourFinder,
    view: &'a LayoutView,
    layer: LayerIndex,
    /// Search region in microns.
    region: Rect,
    budget: TestBudget,
    outcome: SearchOutcome,
}

/// A cell being descended into, with the next instance member to visit.
struct Frame {
    cell: CellIndex,
    trans: Affine,
    level: usize,
    inst: usize,
    member: usize,
}

impl Frame {
    /// Advance to the next member of a visible child instance.
    fn next_member(&mut self, view: &LayoutView) -> Option<(CellIndex, Affine)> {
        let instances = view.layout().instances(self.cell);
        while let Some(inst) = instances.get(self.inst) {
            if self.member < inst.len() && !view.is_cell_hidden(inst.cell) {
                let trans = inst.member_transform(self.member);
                self.member += 1;
                return Some((inst.cell, trans));
            }
            self.inst += 1;
            self.member = 0;
        }
        None
    }
}

impl Search<'_> {
    /// Visit the hierarchy below `top` placed with `trans` (dbu to view
    /// microns), depth first with an explicit stack.
    fn walk(&mut self, top: CellIndex, trans: Affine) {
        let mut stack: Vec<Frame> = self.enter(top, trans, 0).into_iter().collect();
        while let Some(frame) = stack.last_mut() {
            let Some((child, member)) = frame.next_member(self.view) else {
                stack.pop();
                continue;
            };
            if !self.budget.consume() {
                return;
            }
            let (trans, level) = (frame.trans * member, frame.level + 1);
            stack.extend(self.enter(child, trans, level));
            if self.budget.exhausted {
                return;
            }
        }
    }

    /// Test the shapes of `cell` and return a frame if its children are to
    /// be visited.
    fn enter(&mut self, cell: CellIndex, trans: Affine, level: usize) -> Option<Frame> {
        let view = self.view;
        let layout = view.layout();
        let bbox = layout.bbox(cell, self.layer)?;
        if !trans.determinant().is_normal() {
            return None;
        }
        let local_region = trans.inverse().transform_rect_bbox(self.region);
        if !rects_touch(&bbox, &local_region) {
            return None;
        }

        let (min_level, max_level) = view.hier_levels();
        if level >= min_level {
            for shape in layout.touching_shapes(cell, self.layer, local_region) {
                if !self.budget.consume() {
                    return None;
                }
                for edge in shape.edges() {
                    self.test_edge(edge.transformed(trans));
                }
            }
        }

        (level < max_level).then_some(Frame {
            cell,
            trans,
            level,
            inst: 0,
            member: 0,
        })
    }

    fn test_edge(&mut self, edge: Edge) {
        let finder = self.finder;
        let region = self.region;

        if edge.is_degenerate() {
            if finder.with_vertex && rect_contains(&region, edge.p1) {
                self.test_vertex(edge.p1, None);
            }
            return;
        }

        if finder.with_vertex {
            for p in [edge.p1, edge.p2] {
                if rect_contains(&region, p) {
                    self.test_vertex(p, Some(edge));
                }
            }
        }

        let Some(clipped) = edge.clipped(&region) else {
            return;
        };

        if !finder.cutlines.is_empty() {
            for cl in &finder.cutlines {
                if let Some(ip) = edge.cut_point(cl) {
                    if edge.contains(ip) && rect_contains(&region, ip) {
                        self.add_exact(ip, Some(edge), false);
                    } else {
                        self.add_generic(ip, Some(edge));
                    }
                }
            }
        } else {
            // Perpendicular from the seed, long enough to cross the region
            let n = perpendicular(edge.d()) / edge.length();
            let reach = region.width() + region.height();
            let normal = Edge::new(finder.seed - n * reach, finder.seed + n * reach);
            if let Some(ip) = clipped.intersect_point(&normal) {
                if finder.directed {
                    self.add_generic(ip, Some(edge));
                } else {
                    self.add_exact(ip, Some(edge), false);
                }
            }
        }
    }

    fn test_vertex(&mut self, p: Point, edge: Option<Edge>) {
        let finder = self.finder;
        if finder.cutlines.is_empty() {
            self.add_exact(p, edge, true);
            // Axis crossings through the seed, as cutline mode would produce
            if let Some(edge) = edge {
                for dir in [Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)] {
                    let ray = Edge::from_direction(finder.seed, dir);
                    let Some(ip) = edge.cut_point(&ray) else {
                        continue;
                    };
                    if edge.contains(ip) && rect_contains(&self.region, ip) {
                        self.add_exact(ip, Some(edge), false);
                    }
                }
            }
        } else if finder.on_cutline(p) {
            self.add_exact(p, edge, true);
        }
    }

    fn add_exact(&mut self, p: Point, edge: Option<Edge>, is_vertex: bool) {
        if self.finder.is_forward(p, false) && !self.finder.is_excluded(p) {
            offer(&mut self.outcome.exact, self.finder.seed, p, edge, is_vertex);
        }
    }

    fn add_generic(&mut self, p: Point, edge: Option<Edge>) {
        if self.finder.is_forward(p, true) && !self.finder.is_excluded(p) {
            offer(&mut self.outcome.generic, self.finder.seed, p, edge, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::{make_cutlines, AngleConstraint};
    use crate::layout::{CellInstArray, Layout, LayoutShape};

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn near(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    /// A view with the given dbu shapes in the top cell on one layer.
    fn view_with(shapes: Vec<LayoutShape>) -> LayoutView {
        let mut layout = Layout::new(0.001);
        let layer = layout.insert_layer("1/0");
        let top = layout.add_cell("TOP");
        for shape in shapes {
            layout.insert_shape(top, layer, shape).unwrap();
        }
        LayoutView::new(layout, top)
    }

    #[test]
    fn test_unconstrained_edge_projection() {
        let view = view_with(vec![LayoutShape::Box(Rect::new(0.0, 0.0, 1000.0, 1000.0))]);
        let finder = ContourFinder::new(pt(0.5, 0.04), Vec2::ZERO, Vec::new(), true);
        let outcome = finder.find(&view, 0.1);
        let best = outcome.found().unwrap();
        assert!(near(best.point, pt(0.5, 0.0)));
        assert!(!best.is_vertex);
        assert!(best.has_edge());
        assert!(!outcome.exhausted);
    }

    #[test]
    fn test_nothing_in_range() {
        let view = view_with(vec![LayoutShape::Box(Rect::new(0.0, 0.0, 1000.0, 1000.0))]);
        let finder = ContourFinder::new(pt(0.5, 0.5), Vec2::ZERO, Vec::new(), true);
        assert!(!finder.find(&view, 0.1).any());
    }

    #[test]
    fn test_exact_beats_closer_generic() {
        let view = view_with(vec![
            // Only reaches y = 0 with its supporting line
            LayoutShape::Box(Rect::new(50.0, 200.0, 60.0, 300.0)),
            // Crosses y = 0 farther away
            LayoutShape::Box(Rect::new(80.0, -100.0, 90.0, 100.0)),
        ]);
        let seed = pt(0.0, 0.0);
        let cutlines = make_cutlines(AngleConstraint::Horizontal, seed);
        let finder = ContourFinder::new(seed, Vec2::ZERO, cutlines, false);
        let outcome = finder.find(&view, 0.5);

        let generic = outcome.generic.unwrap();
        assert!(near(generic.point, pt(0.05, 0.0)));
        let best = outcome.found().unwrap();
        assert!(near(best.point, pt(0.08, 0.0)));
        assert_eq!(outcome.exact.as_ref(), Some(best));
    }

    #[test]
    fn test_shared_vertex_reports_both_edges() {
        let view = view_with(vec![LayoutShape::Polygon(vec![
            pt(0.0, 0.0),
            pt(1000.0, 0.0),
            pt(2000.0, 0.0),
            pt(2000.0, 1000.0),
            pt(0.0, 1000.0),
        ])]);
        let finder = ContourFinder::new(pt(1.0, 0.05), Vec2::ZERO, Vec::new(), true);
        let best = *finder.find(&view, 0.1).found().unwrap();
        assert!(near(best.point, pt(1.0, 0.0)));
        assert!(best.is_vertex);
        assert_eq!(best.incident_edges().count(), 2);
    }

    #[test]
    fn test_point_shape_has_no_edge() {
        let view = view_with(vec![LayoutShape::Point(pt(100.0, 100.0))]);
        let finder = ContourFinder::new(pt(0.11, 0.12), Vec2::ZERO, Vec::new(), true);
        let best = *finder.find(&view, 0.1).found().unwrap();
        assert!(near(best.point, pt(0.1, 0.1)));
        assert!(best.is_vertex);
        assert!(!best.has_edge());

        let finder = ContourFinder::new(pt(0.11, 0.12), Vec2::ZERO, Vec::new(), false);
        assert!(!finder.find(&view, 0.1).any());
    }

    #[test]
    fn test_directed_rejects_candidates_behind_seed() {
        let view = view_with(vec![
            LayoutShape::Box(Rect::new(-110.0, -500.0, -100.0, 500.0)),
            LayoutShape::Box(Rect::new(200.0, -500.0, 210.0, 500.0)),
        ]);
        let seed = pt(0.0, 0.0);
        let cutlines = vec![Edge::from_direction(seed, Vec2::new(1.0, 0.0))];

        let undirected = ContourFinder::new(seed, Vec2::ZERO, cutlines.clone(), false);
        let best = *undirected.find(&view, 0.5).found().unwrap();
        assert!(near(best.point, pt(-0.1, 0.0)));

        let directed = ContourFinder::new(seed, Vec2::ZERO, cutlines, false).directed(true);
        let outcome = directed.find(&view, 0.5);
        let best = *outcome.found().unwrap();
        assert!(near(best.point, pt(0.2, 0.0)));
        assert!((best.point - seed).dot(Vec2::new(1.0, 0.0)) >= 0.0);
    }

    #[test]
    fn test_grid_cutlines_bracket_seed() {
        let finder = ContourFinder::new(pt(0.23, 0.58), Vec2::new(0.1, 0.1), Vec::new(), true);
        let cutlines = finder.cutlines();
        assert_eq!(cutlines.len(), 4);
        // Grid point (0.2, 0.6); the seed lies right of it and below it
        assert!((cutlines[0].p1.x - 0.2).abs() < 1e-12);
        assert!((cutlines[1].p1.x - 0.3).abs() < 1e-12);
        assert!((cutlines[2].p1.y - 0.6).abs() < 1e-12);
        assert!((cutlines[3].p1.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_grid_point_on_edge() {
        let view = view_with(vec![LayoutShape::Box(Rect::new(0.0, 0.0, 1000.0, 1000.0))]);
        let finder = ContourFinder::new(pt(0.23, 0.02), Vec2::new(0.1, 0.1), Vec::new(), true);
        let best = *finder.find(&view, 0.1).found().unwrap();
        assert!(near(best.point, pt(0.2, 0.0)));
    }

    #[test]
    fn test_hidden_cell_and_levels() {
        let mut layout = Layout::new(0.001);
        let layer = layout.insert_layer("1/0");
        let top = layout.add_cell("TOP");
        let child = layout.add_cell("CHILD");
        layout
            .insert_shape(child, layer, LayoutShape::Box(Rect::new(0.0, 0.0, 1000.0, 1000.0)))
            .unwrap();
        layout
            .insert_instance(top, CellInstArray::single(child, Affine::translate((2000.0, 0.0))))
            .unwrap();
        let mut view = LayoutView::new(layout, top);

        let finder = ContourFinder::new(pt(2.05, 0.5), Vec2::ZERO, Vec::new(), true);
        let best = *finder.find(&view, 0.1).found().unwrap();
        assert!(near(best.point, pt(2.0, 0.5)));

        view.set_hier_levels(0, 0);
        assert!(!finder.find(&view, 0.1).any());

        view.set_hier_levels(0, 1);
        view.hide_cell(child);
        assert!(!finder.find(&view, 0.1).any());
    }

    #[test]
    fn test_transformed_instance_and_layer_variant() {
        let mut layout = Layout::new(0.001);
        let layer = layout.insert_layer("1/0");
        let top = layout.add_cell("TOP");
        let child = layout.add_cell("CHILD");
        layout
            .insert_shape(child, layer, LayoutShape::Box(Rect::new(0.0, 0.0, 500.0, 1000.0)))
            .unwrap();
        // Rotated by 90 degrees: the box spans x in [-1, 0]
        layout
            .insert_instance(
                top,
                CellInstArray::single(child, Affine::rotate(std::f64::consts::FRAC_PI_2)),
            )
            .unwrap();
        let mut view = LayoutView::new(layout, top);

        let finder = ContourFinder::new(pt(-0.95, 0.25), Vec2::ZERO, Vec::new(), true);
        let best = *finder.find(&view, 0.1).found().unwrap();
        assert!(near(best.point, pt(-1.0, 0.25)));

        // Drawn a second time shifted by 10 microns
        view.layers_mut()[0].transforms = vec![Affine::IDENTITY, Affine::translate((10.0, 0.0))];
        let finder = ContourFinder::new(pt(9.05, 0.25), Vec2::ZERO, Vec::new(), true);
        let best = *finder.find(&view, 0.1).found().unwrap();
        assert!(near(best.point, pt(9.0, 0.25)));
    }

    #[test]
    fn test_budget_stops_wide_array() {
        let mut layout = Layout::new(0.001);
        let layer = layout.insert_layer("1/0");
        let top = layout.add_cell("TOP");
        let child = layout.add_cell("CHILD");
        layout
            .insert_shape(child, layer, LayoutShape::Box(Rect::new(0.0, 0.0, 1000.0, 1000.0)))
            .unwrap();
        // 20,000 members stacked on the same spot
        layout
            .insert_instance(
                top,
                CellInstArray::array(child, Affine::IDENTITY, Vec2::ZERO, Vec2::ZERO, 200, 100),
            )
            .unwrap();
        let view = LayoutView::new(layout, top);

        let finder = ContourFinder::new(pt(0.5, 0.05), Vec2::ZERO, Vec::new(), true);
        let outcome = finder.find(&view, 0.1);
        assert!(outcome.exhausted);
        assert!(near(outcome.found().unwrap().point, pt(0.5, 0.0)));
    }

    #[test]
    fn test_budget_stops_deep_hierarchy() {
        let mut layout = Layout::new(0.001);
        let layer = layout.insert_layer("1/0");
        let cells: Vec<CellIndex> = (0..40).map(|i| layout.add_cell(format!("C{i}"))).collect();
        layout
            .insert_shape(cells[39], layer, LayoutShape::Box(Rect::new(0.0, 0.0, 1000.0, 1000.0)))
            .unwrap();
        // Every level doubles the number of paths: 2^39 leaves without a budget
        for pair in cells.windows(2) {
            for _ in 0..2 {
                layout
                    .insert_instance(pair[0], CellInstArray::single(pair[1], Affine::IDENTITY))
                    .unwrap();
            }
        }
        let view = LayoutView::new(layout, cells[0]);

        let finder =
            ContourFinder::new(pt(0.5, 0.05), Vec2::ZERO, Vec::new(), true).with_budget(500);
        let outcome = finder.find(&view, 0.1);
        assert!(outcome.exhausted);
        assert!(outcome.any_exact());
    }

    /// A chain of `depth` single placements with a unit box at the bottom.
    fn chain_view(depth: usize) -> LayoutView {
        let mut layout = Layout::new(0.001);
        let layer = layout.insert_layer("1/0");
        let cells: Vec<CellIndex> = (0..=depth).map(|i| layout.add_cell(format!("C{i}"))).collect();
        for pair in cells.windows(2) {
            layout
                .insert_instance(pair[0], CellInstArray::single(pair[1], Affine::IDENTITY))
                .unwrap();
        }
        let leaf = LayoutShape::Box(Rect::new(0.0, 0.0, 1000.0, 1000.0));
        layout.insert_shape(cells[depth], layer, leaf).unwrap();
        LayoutView::new(layout, cells[0])
    }

    #[test]
    fn test_budget_stops_very_deep_chain() {
        let view = chain_view(12_000);
        let finder = ContourFinder::new(pt(0.5, 0.05), Vec2::ZERO, Vec::new(), true);
        let outcome = finder.find(&view, 0.1);
        assert!(outcome.exhausted);
        assert!(!outcome.any());
    }

    #[test]
    fn test_deep_chain_within_budget() {
        let view = chain_view(10_000);
        let finder =
            ContourFinder::new(pt(0.5, 0.05), Vec2::ZERO, Vec::new(), true).with_budget(20_000);
        let outcome = finder.find(&view, 0.1);
        assert!(!outcome.exhausted);
        assert!(near(outcome.found().unwrap().point, pt(0.5, 0.0)));
    }

    #[test]
    fn test_excluded_point_is_skipped() {
        let view = view_with(vec![LayoutShape::Box(Rect::new(0.0, 0.0, 1000.0, 1000.0))]);
        let seed = pt(0.5, 0.0);
        let finder = ContourFinder::new(seed, Vec2::ZERO, Vec::new(), false);
        assert!(near(finder.find(&view, 0.1).found().unwrap().point, seed));

        let finder = finder.excluding(seed);
        assert!(!finder.find(&view, 0.1).any());
    }

    #[test]
    fn test_search_is_deterministic() {
        let view = view_with(vec![
            LayoutShape::Polygon(vec![pt(0.0, 0.0), pt(1000.0, 0.0), pt(0.0, 1000.0)]),
            LayoutShape::path(vec![pt(-500.0, 500.0), pt(1500.0, 500.0)], 100.0),
        ]);
        let finder = ContourFinder::new(pt(0.3, 0.47), Vec2::ZERO, Vec::new(), true);
        let first = finder.find(&view, 0.2);
        for _ in 0..5 {
            assert_eq!(finder.find(&view, 0.2), first);
        }
    }
}
