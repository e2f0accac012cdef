//! Hierarchical shape store.
//!
//! A [`Layout`] holds cells with shapes on layers. Cells are placed into
//! parent cells through [`CellInstArray`]s carrying a complex transform
//! (scale, rotation, mirror and displacement) and an optional regular array.
//! Shape coordinates are database units (dbu); [`Layout::dbu`] maps them to
//! microns.

use crate::geometry::{rects_touch, Edge};
use kurbo::{Affine, Point, Rect, Vec2};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use thiserror::Error;

/// Index of a cell inside its layout.
pub type CellIndex = usize;

/// Index of a layer inside its layout.
pub type LayerIndex = usize;

/// Layout mutation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Unknown cell index: {0}")]
    UnknownCell(CellIndex),
    #[error("Unknown layer index: {0}")]
    UnknownLayer(LayerIndex),
    #[error("Instantiating cell {child} in cell {parent} would create a cycle")]
    RecursiveInstance { parent: CellIndex, child: CellIndex },
}

/// Result type for layout mutations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Limits of the representable coordinate space, in dbu.
const COORD_MIN: f64 = i32::MIN as f64;
const COORD_MAX: f64 = i32::MAX as f64;

/// Miter joins sharper than this are limited (cosine of the half angle).
const MIN_MITER_COS: f64 = 0.1;

/// A shape stored in a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutShape {
    /// Closed polygon given by its hull points.
    Polygon(Vec<Point>),
    /// Wide path along a spine with flush or extended ends.
    Path {
        spine: Vec<Point>,
        width: f64,
        begin_ext: f64,
        end_ext: f64,
    },
    Box(Rect),
    /// A point-like marker.
    Point(Point),
}

impl LayoutShape {
    /// Create a path with flush ends.
    pub fn path(spine: Vec<Point>, width: f64) -> Self {
        LayoutShape::Path { spine, width, begin_ext: 0.0, end_ext: 0.0 }
    }

    /// Bounding box in local coordinates.
    pub fn bbox(&self) -> Rect {
        match self {
            LayoutShape::Polygon(points) => bbox_of(points),
            LayoutShape::Path { spine, width, begin_ext, end_ext } => {
                let outline = path_outline(spine, *width, *begin_ext, *end_ext);
                if outline.is_empty() {
                    let hw = width.abs() / 2.0;
                    bbox_of(spine).inflate(hw, hw)
                } else {
                    bbox_of(&outline).union(bbox_of(spine))
                }
            }
            LayoutShape::Box(rect) => rect.abs(),
            LayoutShape::Point(p) => Rect::from_points(*p, *p),
        }
    }

    /// Decompose the shape into edges in local coordinates.
    ///
    /// Paths yield their outline followed by their spine so a measurement
    /// can snap to the center line. Points yield one degenerate edge.
    pub fn edges(&self) -> Vec<Edge> {
        match self {
            LayoutShape::Polygon(points) => closed_edges(points),
            LayoutShape::Path { spine, width, begin_ext, end_ext } => {
                let mut edges = closed_edges(&path_outline(spine, *width, *begin_ext, *end_ext));
                edges.extend(spine.windows(2).map(|w| Edge::new(w[0], w[1])));
                if spine.len() == 1 {
                    edges.push(Edge::new(spine[0], spine[0]));
                }
                edges
            }
            LayoutShape::Box(rect) => {
                let r = rect.abs();
                closed_edges(&[
                    Point::new(r.x0, r.y0),
                    Point::new(r.x0, r.y1),
                    Point::new(r.x1, r.y1),
                    Point::new(r.x1, r.y0),
                ])
            }
            LayoutShape::Point(p) => vec![Edge::new(*p, *p)],
        }
    }
}

fn bbox_of(points: &[Point]) -> Rect {
    let mut iter = points.iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
}

fn closed_edges(points: &[Point]) -> Vec<Edge> {
    match points.len() {
        0 => Vec::new(),
        1 => vec![Edge::new(points[0], points[0])],
        n => (0..n).map(|i| Edge::new(points[i], points[(i + 1) % n])).collect(),
    }
}

/// Outline polygon of a path with miter joins.
fn path_outline(spine: &[Point], width: f64, begin_ext: f64, end_ext: f64) -> Vec<Point> {
    let mut pts: Vec<Point> = Vec::with_capacity(spine.len());
    for &p in spine {
        if pts.last() != Some(&p) {
            pts.push(p);
        }
    }
    let hw = width.abs() / 2.0;
    if pts.len() < 2 || hw <= 0.0 {
        return Vec::new();
    }

    let n = pts.len();
    let first_dir = (pts[1] - pts[0]).normalize();
    let last_dir = (pts[n - 1] - pts[n - 2]).normalize();
    pts[0] -= first_dir * begin_ext;
    pts[n - 1] += last_dir * end_ext;

    let normal = |i: usize| {
        let d = (pts[i + 1] - pts[i]).normalize();
        Vec2::new(-d.y, d.x)
    };

    let mut left = Vec::with_capacity(n);
    let mut right = Vec::with_capacity(n);
    for i in 0..n {
        let offset = if i == 0 {
            normal(0) * hw
        } else if i == n - 1 {
            normal(n - 2) * hw
        } else {
            let n1 = normal(i - 1);
            let n2 = normal(i);
            let m = n1 + n2;
            let m_len = m.hypot();
            if m_len < 1e-10 {
                n1 * hw
            } else {
                let m = m / m_len;
                m * (hw / m.dot(n1).max(MIN_MITER_COS))
            }
        };
        left.push(pts[i] + offset);
        right.push(pts[i] - offset);
    }
    left.extend(right.into_iter().rev());
    left
}

/// A (possibly arrayed) placement of a cell inside another cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellInstArray {
    /// The instantiated cell.
    pub cell: CellIndex,
    /// Transform of the first array member.
    pub trans: Affine,
    /// Displacement between columns.
    pub a: Vec2,
    /// Displacement between rows.
    pub b: Vec2,
    pub na: u32,
    pub nb: u32,
}

impl CellInstArray {
    /// A single placement.
    pub fn single(cell: CellIndex, trans: Affine) -> Self {
        Self { cell, trans, a: Vec2::ZERO, b: Vec2::ZERO, na: 1, nb: 1 }
    }

    /// A regular `na` x `nb` array.
    pub fn array(cell: CellIndex, trans: Affine, a: Vec2, b: Vec2, na: u32, nb: u32) -> Self {
        Self { cell, trans, a, b, na: na.max(1), nb: nb.max(1) }
    }

    /// Number of array members.
    pub fn len(&self) -> usize {
        self.na as usize * self.nb as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transform of member `index`, counting column-major.
    pub fn member_transform(&self, index: usize) -> Affine {
        let nb = self.nb.max(1) as usize;
        let (i, j) = ((index / nb) as f64, (index % nb) as f64);
        Affine::translate(self.a * i + self.b * j) * self.trans
    }

    /// Bounding box of all members given the child's bounding box.
    fn bbox(&self, child: Rect) -> Rect {
        let first = self.trans.transform_rect_bbox(child);
        let last_a = self.a * self.na.saturating_sub(1) as f64;
        let last_b = self.b * self.nb.saturating_sub(1) as f64;
        [last_a, last_b, last_a + last_b]
            .into_iter()
            .fold(first, |r, d| r.union(first + d))
    }
}

/// A cell: shapes per layer plus child instances.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    name: String,
    shapes: BTreeMap<LayerIndex, Vec<LayoutShape>>,
    instances: Vec<CellInstArray>,
}

impl Cell {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shapes on `layer`.
    pub fn shapes(&self, layer: LayerIndex) -> &[LayoutShape] {
        self.shapes.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn instances(&self) -> &[CellInstArray] {
        &self.instances
    }
}

/// Hierarchical layout database.
#[derive(Debug)]
pub struct Layout {
    dbu: f64,
    cells: Vec<Cell>,
    layers: Vec<String>,
    /// Per-layer cell bounding boxes, `None` when the cell is empty on the layer.
    bbox_cache: RwLock<HashMap<(CellIndex, LayerIndex), Option<Rect>>>,
}

impl Clone for Layout {
    fn clone(&self) -> Self {
        Self {
            dbu: self.dbu,
            cells: self.cells.clone(),
            layers: self.layers.clone(),
            bbox_cache: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(0.001)
    }
}

impl Layout {
    /// Create an empty layout with the given database unit in microns.
    pub fn new(dbu: f64) -> Self {
        Self {
            dbu,
            cells: Vec::new(),
            layers: Vec::new(),
            bbox_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Size of one database unit in microns.
    pub fn dbu(&self) -> f64 {
        self.dbu
    }

    /// Representable coordinate space, in dbu.
    pub fn domain(&self) -> Rect {
        Rect::new(COORD_MIN, COORD_MIN, COORD_MAX, COORD_MAX)
    }

    pub fn add_cell(&mut self, name: impl Into<String>) -> CellIndex {
        self.cells.push(Cell { name: name.into(), ..Cell::default() });
        self.cells.len() - 1
    }

    pub fn insert_layer(&mut self, name: impl Into<String>) -> LayerIndex {
        self.layers.push(name.into());
        self.layers.len() - 1
    }

    pub fn cell(&self, index: CellIndex) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn layer_name(&self, layer: LayerIndex) -> Option<&str> {
        self.layers.get(layer).map(String::as_str)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Cells that are not instantiated anywhere.
    pub fn top_cells(&self) -> Vec<CellIndex> {
        let mut used = vec![false; self.cells.len()];
        for inst in self.cells.iter().flat_map(|c| &c.instances) {
            used[inst.cell] = true;
        }
        (0..self.cells.len()).filter(|&i| !used[i]).collect()
    }

    /// Add a shape to a cell.
    pub fn insert_shape(
        &mut self,
        cell: CellIndex,
        layer: LayerIndex,
        shape: LayoutShape,
    ) -> LayoutResult<()> {
        if layer >= self.layers.len() {
            return Err(LayoutError::UnknownLayer(layer));
        }
        let target = self.cells.get_mut(cell).ok_or(LayoutError::UnknownCell(cell))?;
        target.shapes.entry(layer).or_default().push(shape);
        self.invalidate_bboxes();
        Ok(())
    }

    /// Place a cell into a parent cell.
    ///
    /// Fails if either cell is unknown or if `parent` is reachable from the
    /// instantiated cell.
    pub fn insert_instance(&mut self, parent: CellIndex, inst: CellInstArray) -> LayoutResult<()> {
        if parent >= self.cells.len() {
            return Err(LayoutError::UnknownCell(parent));
        }
        if inst.cell >= self.cells.len() {
            return Err(LayoutError::UnknownCell(inst.cell));
        }
        if self.is_reachable(inst.cell, parent) {
            return Err(LayoutError::RecursiveInstance { parent, child: inst.cell });
        }
        self.cells[parent].instances.push(inst);
        self.invalidate_bboxes();
        Ok(())
    }

    /// True if `target` is `from` or one of its descendants.
    fn is_reachable(&self, from: CellIndex, target: CellIndex) -> bool {
        let mut stack = vec![from];
        let mut seen = vec![false; self.cells.len()];
        while let Some(cell) = stack.pop() {
            if cell == target {
                return true;
            }
            if std::mem::replace(&mut seen[cell], true) {
                continue;
            }
            stack.extend(self.cells[cell].instances.iter().map(|i| i.cell));
        }
        false
    }

    fn invalidate_bboxes(&mut self) {
        if let Ok(cache) = self.bbox_cache.get_mut() {
            cache.clear();
        }
    }

    fn cached_bbox(&self, cell: CellIndex, layer: LayerIndex) -> Option<Option<Rect>> {
        self.bbox_cache.read().ok().and_then(|c| c.get(&(cell, layer)).copied())
    }

    /// Bounding box of a cell on one layer, including its subtree.
    ///
    /// Subtree boxes are computed children first from an explicit stack and
    /// cached until the next mutation.
    pub fn bbox(&self, cell: CellIndex, layer: LayerIndex) -> Option<Rect> {
        if cell >= self.cells.len() {
            return None;
        }
        if let Some(cached) = self.cached_bbox(cell, layer) {
            return cached;
        }

        let mut computed: HashMap<CellIndex, Option<Rect>> = HashMap::new();
        let mut stack = vec![(cell, false)];
        while let Some((current, children_done)) = stack.pop() {
            if computed.contains_key(&current) {
                continue;
            }
            if !children_done {
                if let Some(cached) = self.cached_bbox(current, layer) {
                    computed.insert(current, cached);
                    continue;
                }
                stack.push((current, true));
                for inst in &self.cells[current].instances {
                    if !computed.contains_key(&inst.cell) {
                        stack.push((inst.cell, false));
                    }
                }
                continue;
            }

            let target = &self.cells[current];
            let child_boxes = target.instances.iter().filter_map(|inst| {
                let child = computed.get(&inst.cell).copied().flatten()?;
                Some(inst.bbox(child))
            });
            let bbox = target
                .shapes(layer)
                .iter()
                .map(LayoutShape::bbox)
                .chain(child_boxes)
                .reduce(|a, b| a.union(b));
            computed.insert(current, bbox);
        }

        let bbox = computed.get(&cell).copied().flatten();
        if let Ok(mut cache) = self.bbox_cache.write() {
            cache.extend(computed.into_iter().map(|(c, b)| ((c, layer), b)));
        }
        bbox
    }

    /// Shapes of `cell` on `layer` whose bounding box touches `region`.
    pub fn touching_shapes<'a>(
        &'a self,
        cell: CellIndex,
        layer: LayerIndex,
        region: Rect,
    ) -> impl Iterator<Item = &'a LayoutShape> + 'a {
        self.cells
            .get(cell)
            .map(|c| c.shapes(layer))
            .unwrap_or(&[])
            .iter()
            .filter(move |s| rects_touch(&s.bbox(), &region))
    }

    /// Child instances of `cell`.
    pub fn instances(&self, cell: CellIndex) -> &[CellInstArray] {
        self.cells.get(cell).map(Cell::instances).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_polygon_edges_closed() {
        let shape = LayoutShape::Polygon(vec![pt(0.0, 0.0), pt(10.0, 0.0), pt(0.0, 10.0)]);
        let edges = shape.edges();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges[2], Edge::new(pt(0.0, 10.0), pt(0.0, 0.0)));
    }

    #[test]
    fn test_box_edges() {
        let shape = LayoutShape::Box(Rect::new(0.0, 0.0, 10.0, 5.0));
        assert_eq!(shape.edges().len(), 4);
        assert_eq!(shape.bbox(), Rect::new(0.0, 0.0, 10.0, 5.0));
    }

    #[test]
    fn test_point_shape_is_degenerate_edge() {
        let edges = LayoutShape::Point(pt(3.0, 4.0)).edges();
        assert_eq!(edges.len(), 1);
        assert!(edges[0].is_degenerate());
    }

    #[test]
    fn test_path_outline_and_spine() {
        let shape = LayoutShape::path(vec![pt(0.0, 0.0), pt(100.0, 0.0)], 20.0);
        let edges = shape.edges();
        // 4 outline edges plus 1 spine edge
        assert_eq!(edges.len(), 5);
        assert_eq!(edges[4], Edge::new(pt(0.0, 0.0), pt(100.0, 0.0)));
        let bbox = shape.bbox();
        assert!((bbox.y0 + 10.0).abs() < 1e-9);
        assert!((bbox.y1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_path_miter_join() {
        let shape = LayoutShape::path(vec![pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 100.0)], 20.0);
        let bbox = shape.bbox();
        assert!((bbox.x1 - 110.0).abs() < 1e-9);
        assert!((bbox.y0 + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_path_extensions() {
        let shape = LayoutShape::Path {
            spine: vec![pt(0.0, 0.0), pt(100.0, 0.0)],
            width: 20.0,
            begin_ext: 10.0,
            end_ext: 5.0,
        };
        let bbox = shape.bbox();
        assert!((bbox.x0 + 10.0).abs() < 1e-9);
        assert!((bbox.x1 - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_hierarchical_bbox() {
        let mut layout = Layout::new(0.001);
        let l1 = layout.insert_layer("1/0");
        let l2 = layout.insert_layer("2/0");
        let top = layout.add_cell("TOP");
        let child = layout.add_cell("CHILD");
        layout.insert_shape(child, l1, LayoutShape::Box(Rect::new(0.0, 0.0, 10.0, 10.0))).unwrap();
        layout
            .insert_instance(
                top,
                CellInstArray::array(
                    child,
                    Affine::translate((100.0, 0.0)),
                    Vec2::new(20.0, 0.0),
                    Vec2::new(0.0, 50.0),
                    3,
                    2,
                ),
            )
            .unwrap();

        assert_eq!(layout.bbox(top, l1), Some(Rect::new(100.0, 0.0, 150.0, 60.0)));
        assert_eq!(layout.bbox(top, l2), None);
    }

    #[test]
    fn test_bbox_cache_invalidated() {
        let mut layout = Layout::new(0.001);
        let l1 = layout.insert_layer("1/0");
        let top = layout.add_cell("TOP");
        layout.insert_shape(top, l1, LayoutShape::Point(pt(5.0, 5.0))).unwrap();
        assert_eq!(layout.bbox(top, l1), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        layout.insert_shape(top, l1, LayoutShape::Point(pt(-5.0, 5.0))).unwrap();
        assert_eq!(layout.bbox(top, l1), Some(Rect::new(-5.0, 5.0, 5.0, 5.0)));
    }

    #[test]
    fn test_array_members() {
        let (a, b) = (Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0));
        let inst = CellInstArray::array(0, Affine::IDENTITY, a, b, 2, 3);
        assert_eq!(inst.len(), 6);
        assert_eq!(inst.member_transform(0) * Point::ZERO, pt(0.0, 0.0));
        assert_eq!(inst.member_transform(2) * Point::ZERO, pt(0.0, 20.0));
        assert_eq!(inst.member_transform(5) * Point::ZERO, pt(10.0, 20.0));
    }

    #[test]
    fn test_bbox_of_deep_chain() {
        let mut layout = Layout::new(0.001);
        let l1 = layout.insert_layer("1/0");
        let cells: Vec<CellIndex> = (0..12_000).map(|i| layout.add_cell(format!("C{i}"))).collect();
        for pair in cells.windows(2) {
            let inst = CellInstArray::single(pair[1], Affine::translate((1.0, 0.0)));
            layout.insert_instance(pair[0], inst).unwrap();
        }
        let leaf = LayoutShape::Box(Rect::new(0.0, 0.0, 10.0, 10.0));
        layout.insert_shape(cells[11_999], l1, leaf).unwrap();

        assert_eq!(layout.bbox(cells[0], l1), Some(Rect::new(11_999.0, 0.0, 12_009.0, 10.0)));
        // Served from the cache filled by the first query
        assert_eq!(layout.bbox(cells[6_000], l1), Some(Rect::new(5_999.0, 0.0, 6_009.0, 10.0)));
    }

    #[test]
    fn test_bbox_shared_child() {
        let mut layout = Layout::new(0.001);
        let l1 = layout.insert_layer("1/0");
        let top = layout.add_cell("TOP");
        let mid = layout.add_cell("MID");
        let leaf = layout.add_cell("LEAF");
        layout.insert_shape(leaf, l1, LayoutShape::Box(Rect::new(0.0, 0.0, 10.0, 10.0))).unwrap();
        layout.insert_instance(mid, CellInstArray::single(leaf, Affine::IDENTITY)).unwrap();
        layout
            .insert_instance(top, CellInstArray::single(mid, Affine::translate((100.0, 0.0))))
            .unwrap();
        layout
            .insert_instance(top, CellInstArray::single(leaf, Affine::translate((0.0, -50.0))))
            .unwrap();

        assert_eq!(layout.bbox(top, l1), Some(Rect::new(0.0, -50.0, 110.0, 10.0)));
        assert_eq!(layout.bbox(mid, l1), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(layout.bbox(99, l1), None);
    }

    #[test]
    fn test_recursive_instance_rejected() {
        let mut layout = Layout::new(0.001);
        let a = layout.add_cell("A");
        let b = layout.add_cell("B");
        layout.insert_instance(a, CellInstArray::single(b, Affine::IDENTITY)).unwrap();
        assert_eq!(
            layout.insert_instance(b, CellInstArray::single(a, Affine::IDENTITY)),
            Err(LayoutError::RecursiveInstance { parent: b, child: a })
        );
        assert!(layout.insert_instance(a, CellInstArray::single(a, Affine::IDENTITY)).is_err());
        assert_eq!(layout.top_cells(), vec![a]);
    }

    #[test]
    fn test_unknown_indices() {
        let mut layout = Layout::new(0.001);
        let top = layout.add_cell("TOP");
        assert_eq!(
            layout.insert_shape(top, 3, LayoutShape::Point(Point::ZERO)),
            Err(LayoutError::UnknownLayer(3))
        );
        assert_eq!(
            layout.insert_instance(top, CellInstArray::single(7, Affine::IDENTITY)),
            Err(LayoutError::UnknownCell(7))
        );
    }

    #[test]
    fn test_touching_shapes() {
        let mut layout = Layout::new(0.001);
        let l1 = layout.insert_layer("1/0");
        let top = layout.add_cell("TOP");
        layout.insert_shape(top, l1, LayoutShape::Box(Rect::new(0.0, 0.0, 10.0, 10.0))).unwrap();
        layout
            .insert_shape(top, l1, LayoutShape::Box(Rect::new(100.0, 100.0, 110.0, 110.0)))
            .unwrap();
        assert_eq!(layout.touching_shapes(top, l1, Rect::new(10.0, 10.0, 20.0, 20.0)).count(), 1);
        let region = Rect::new(-50.0, -50.0, 200.0, 200.0);
        assert_eq!(layout.touching_shapes(top, l1, region).count(), 2);
    }
}
