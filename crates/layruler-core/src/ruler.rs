//! Ruler annotations and their measurements.

use crate::angle::AngleConstraint;
use crate::geometry::{Edge, LENGTH_EPSILON};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of an annotation inside a [`RulerCollection`].
pub type AnnotationId = u32;

/// Label formatting errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Unterminated expression in format: {0}")]
    UnterminatedExpression(String),
}

/// Decoration at the ends of a ruler line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RulerStyle {
    /// Line with tick marks.
    #[default]
    Ruler,
    ArrowEnd,
    ArrowStart,
    ArrowBoth,
    /// Plain line.
    Line,
    CrossEnd,
    CrossStart,
    CrossBoth,
}

/// How the points of a ruler are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutlineType {
    /// Straight segments between consecutive points.
    #[default]
    Diag,
    /// Horizontal then vertical leg.
    XY,
    /// Diagonal plus horizontal and vertical legs.
    DiagXY,
    /// Vertical then horizontal leg.
    YX,
    /// Diagonal plus vertical and horizontal legs.
    DiagYX,
    /// Box spanned by the first and last point.
    Box,
    /// Ellipse inscribed in the box spanned by the first and last point.
    Ellipse,
    /// Angle at the middle of three points.
    Angle,
    /// Circle through three points, or around the first point.
    Radius,
}

impl OutlineType {
    /// Number of points the outline needs to be meaningful.
    pub fn min_points(self) -> usize {
        match self {
            OutlineType::Angle | OutlineType::Radius => 3,
            _ => 2,
        }
    }
}

/// Where the main label is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionType {
    #[default]
    Auto,
    P1,
    P2,
    Center,
}

/// A measurement annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruler {
    id: AnnotationId,
    points: Vec<Point>,
    /// Main label format.
    pub fmt: String,
    /// Label format of the horizontal leg.
    pub fmt_x: String,
    /// Label format of the vertical leg.
    pub fmt_y: String,
    pub style: RulerStyle,
    pub outline: OutlineType,
    pub main_position: PositionType,
    /// Angle constraint used while editing. `Global` defers to the
    /// configured default.
    pub angle_constraint: AngleConstraint,
    /// Whether points snap to layout objects while editing.
    pub snap: bool,
    /// Decimal places of measurement values.
    pub precision: usize,
    /// Free-form grouping key.
    pub category: String,
}

impl Default for Ruler {
    fn default() -> Self {
        Self {
            id: 0,
            points: Vec::new(),
            fmt: "$D".to_string(),
            fmt_x: "$X".to_string(),
            fmt_y: "$Y".to_string(),
            style: RulerStyle::default(),
            outline: OutlineType::default(),
            main_position: PositionType::default(),
            angle_constraint: AngleConstraint::Global,
            snap: true,
            precision: 3,
            category: String::new(),
        }
    }
}

impl Ruler {
    /// A two-point ruler.
    pub fn new(p1: Point, p2: Point) -> Self {
        Self::from_points(vec![p1, p2])
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    /// Copy of this ruler used as a template, with new points.
    pub fn with_points(&self, points: Vec<Point>) -> Self {
        Self {
            id: 0,
            points,
            ..self.clone()
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn push_point(&mut self, p: Point) {
        self.points.push(p);
    }

    /// Replace point `index`. Returns false if there is no such point.
    pub fn set_point(&mut self, index: usize, p: Point) -> bool {
        match self.points.get_mut(index) {
            Some(slot) => {
                *slot = p;
                true
            }
            None => false,
        }
    }

    /// First point, or the origin for an empty ruler.
    pub fn p1(&self) -> Point {
        self.points.first().copied().unwrap_or(Point::ZERO)
    }

    /// Last point, or the origin for an empty ruler.
    pub fn p2(&self) -> Point {
        self.points.last().copied().unwrap_or(Point::ZERO)
    }

    /// Segment from the first to the last point.
    pub fn segment(&self) -> Edge {
        Edge::new(self.p1(), self.p2())
    }

    /// True if all points collapse onto the first one.
    pub fn is_degenerate(&self) -> bool {
        let p1 = self.p1();
        self.points.iter().all(|p| p.distance(p1) < LENGTH_EPSILON)
    }

    /// Bounding box of the points.
    pub fn bbox(&self) -> Rect {
        let p1 = self.p1();
        self.points.iter().fold(Rect::from_points(p1, p1), |r, p| r.union_pt(*p))
    }

    /// Distance between the first and last point.
    pub fn distance(&self) -> f64 {
        self.p1().distance(self.p2())
    }

    /// Signed horizontal extent.
    pub fn dx(&self) -> f64 {
        self.p2().x - self.p1().x
    }

    /// Signed vertical extent.
    pub fn dy(&self) -> f64 {
        self.p2().y - self.p1().y
    }

    /// Length of the polyline through all points.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Enclosed area.
    ///
    /// Two-point rulers measure the spanned box (or the inscribed ellipse),
    /// longer rulers the polygon through their points.
    pub fn area(&self) -> f64 {
        if self.points.len() > 2 && self.outline != OutlineType::Ellipse {
            let n = self.points.len();
            let twice: f64 = (0..n)
                .map(|i| {
                    let (a, b) = (self.points[i], self.points[(i + 1) % n]);
                    a.x * b.y - b.x * a.y
                })
                .sum();
            return twice.abs() / 2.0;
        }
        let box_area = (self.dx() * self.dy()).abs();
        if self.outline == OutlineType::Ellipse {
            box_area * std::f64::consts::PI / 4.0
        } else {
            box_area
        }
    }

    /// Angle in degrees.
    ///
    /// Angle rulers report the angle at their middle point (0 to 180),
    /// others the direction from the first to the last point.
    pub fn angle(&self) -> f64 {
        if self.outline == OutlineType::Angle && self.points.len() >= 3 {
            let center = self.points[1];
            let a = self.points[0] - center;
            let b = self.points[self.points.len() - 1] - center;
            if a.hypot() < LENGTH_EPSILON || b.hypot() < LENGTH_EPSILON {
                return 0.0;
            }
            return a.cross(b).abs().atan2(a.dot(b)).to_degrees();
        }
        self.dy().atan2(self.dx()).to_degrees()
    }

    /// Radius in microns.
    ///
    /// With three points this is the radius of the circle through them,
    /// otherwise the distance between the first and last point.
    pub fn radius(&self) -> f64 {
        if self.points.len() >= 3 {
            let (a, b, c) = (self.points[0], self.points[1], self.points[self.points.len() - 1]);
            let twice_area = (b - a).cross(c - a).abs();
            if twice_area > LENGTH_EPSILON * LENGTH_EPSILON {
                return a.distance(b) * b.distance(c) * c.distance(a) / (2.0 * twice_area);
            }
        }
        self.distance()
    }

    /// Edges making up the outline.
    pub fn segments(&self) -> Vec<Edge> {
        let (p1, p2) = (self.p1(), self.p2());
        let pairs = || self.points.windows(2).map(|w| (w[0], w[1]));
        match self.outline {
            OutlineType::Diag => pairs().map(|(a, b)| Edge::new(a, b)).collect(),
            OutlineType::XY | OutlineType::DiagXY => pairs()
                .flat_map(|(a, b)| {
                    let corner = Point::new(b.x, a.y);
                    let diag = (self.outline == OutlineType::DiagXY).then(|| Edge::new(a, b));
                    [Some(Edge::new(a, corner)), Some(Edge::new(corner, b)), diag]
                })
                .flatten()
                .collect(),
            OutlineType::YX | OutlineType::DiagYX => pairs()
                .flat_map(|(a, b)| {
                    let corner = Point::new(a.x, b.y);
                    let diag = (self.outline == OutlineType::DiagYX).then(|| Edge::new(a, b));
                    [Some(Edge::new(a, corner)), Some(Edge::new(corner, b)), diag]
                })
                .flatten()
                .collect(),
            OutlineType::Box | OutlineType::Ellipse => {
                let r = Rect::from_points(p1, p2);
                let corners = [
                    Point::new(r.x0, r.y0),
                    Point::new(r.x1, r.y0),
                    Point::new(r.x1, r.y1),
                    Point::new(r.x0, r.y1),
                ];
                (0..4).map(|i| Edge::new(corners[i], corners[(i + 1) % 4])).collect()
            }
            OutlineType::Angle => match self.points.len() {
                0 | 1 => Vec::new(),
                2 => vec![Edge::new(p1, p2)],
                _ => vec![Edge::new(self.points[1], p1), Edge::new(self.points[1], p2)],
            },
            OutlineType::Radius => match self.points.len() {
                0 | 1 => Vec::new(),
                _ => vec![Edge::new(p1, p2)],
            },
        }
    }

    /// Value of a measurement variable.
    fn variable(&self, name: &str) -> Option<f64> {
        let value = match name {
            "D" => self.distance(),
            "L" => self.length(),
            "X" => self.dx(),
            "Y" => self.dy(),
            "A" => self.area(),
            "G" => self.angle(),
            "R" => self.radius(),
            "U" => self.p1().x,
            "V" => self.p1().y,
            "P" => self.p2().x,
            "Q" => self.p2().y,
            _ => return None,
        };
        Some(value)
    }

    /// Expand `$` variables in `fmt`.
    ///
    /// Variables are single letters (`$D`) or braced names (`${D}`); `$$`
    /// yields a literal dollar sign.
    pub fn try_format(&self, fmt: &str) -> Result<String, FormatError> {
        let mut out = String::with_capacity(fmt.len());
        let mut chars = fmt.chars();
        while let Some(c) = chars.next() {
            if c != '$' {
                out.push(c);
                continue;
            }
            let name = match chars.next() {
                Some('$') => {
                    out.push('$');
                    continue;
                }
                Some('{') => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) => name.push(c),
                            None => {
                                return Err(FormatError::UnterminatedExpression(fmt.to_string()));
                            }
                        }
                    }
                    name
                }
                Some(c) => c.to_string(),
                None => return Err(FormatError::UnterminatedExpression(fmt.to_string())),
            };
            let value = self
                .variable(name.trim())
                .ok_or_else(|| FormatError::UnknownVariable(name.clone()))?;
            out.push_str(&format!("{value:.prec$}", prec = self.precision));
        }
        Ok(out)
    }

    fn text_for(&self, fmt: &str) -> String {
        self.try_format(fmt).unwrap_or_else(|err| {
            log::debug!("Ruler {}: {err}", self.id);
            fmt.to_string()
        })
    }

    /// Main label. Falls back to the raw format string if it cannot be
    /// expanded.
    pub fn text(&self) -> String {
        self.text_for(&self.fmt)
    }

    pub fn text_x(&self) -> String {
        self.text_for(&self.fmt_x)
    }

    pub fn text_y(&self) -> String {
        self.text_for(&self.fmt_y)
    }
}

/// A text marker placed at a point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    id: AnnotationId,
    pub position: Point,
    pub label: String,
}

impl Marker {
    pub fn new(position: Point, label: impl Into<String>) -> Self {
        Self {
            id: 0,
            position,
            label: label.into(),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }
}

/// Any annotation held by a [`RulerCollection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Annotation {
    Ruler(Ruler),
    Marker(Marker),
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        match self {
            Annotation::Ruler(r) => r.id,
            Annotation::Marker(m) => m.id,
        }
    }

    fn set_id(&mut self, id: AnnotationId) {
        match self {
            Annotation::Ruler(r) => r.id = id,
            Annotation::Marker(m) => m.id = id,
        }
    }

    pub fn is_ruler(&self) -> bool {
        matches!(self, Annotation::Ruler(_))
    }

    pub fn as_ruler(&self) -> Option<&Ruler> {
        match self {
            Annotation::Ruler(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_ruler_mut(&mut self) -> Option<&mut Ruler> {
        match self {
            Annotation::Ruler(r) => Some(r),
            _ => None,
        }
    }
}

impl From<Ruler> for Annotation {
    fn from(ruler: Ruler) -> Self {
        Annotation::Ruler(ruler)
    }
}

impl From<Marker> for Annotation {
    fn from(marker: Marker) -> Self {
        Annotation::Marker(marker)
    }
}

/// Annotations of one view, in insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulerCollection {
    annotations: Vec<Annotation>,
    next_id: AnnotationId,
    /// Maximum number of rulers kept. `None` is unlimited.
    max_rulers: Option<usize>,
}

impl RulerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection keeping at most `max_rulers` rulers.
    pub fn with_limit(max_rulers: Option<usize>) -> Self {
        Self {
            max_rulers,
            ..Self::default()
        }
    }

    pub fn max_rulers(&self) -> Option<usize> {
        self.max_rulers
    }

    /// Change the ruler limit. Excess rulers are dropped, oldest first.
    pub fn set_max_rulers(&mut self, max_rulers: Option<usize>) {
        self.max_rulers = max_rulers;
        if let Some(max) = max_rulers {
            self.drop_oldest_rulers(max);
        }
    }

    /// Add an annotation and assign it a fresh id.
    ///
    /// When the ruler limit is reached the oldest rulers make room. Returns
    /// `None` if rulers are disabled altogether (limit of zero).
    pub fn insert(&mut self, annotation: impl Into<Annotation>) -> Option<AnnotationId> {
        let mut annotation = annotation.into();
        if annotation.is_ruler() {
            if let Some(max) = self.max_rulers {
                if max == 0 {
                    log::warn!("Ruler rejected: the ruler limit is zero");
                    return None;
                }
                self.drop_oldest_rulers(max - 1);
            }
        }
        self.next_id += 1;
        annotation.set_id(self.next_id);
        self.annotations.push(annotation);
        Some(self.next_id)
    }

    fn drop_oldest_rulers(&mut self, keep: usize) {
        let count = self.ruler_count();
        if count <= keep {
            return;
        }
        let mut excess = count - keep;
        log::warn!("Ruler limit of {keep} reached, dropping {excess} oldest ruler(s)");
        self.annotations.retain(|a| {
            if excess > 0 && a.is_ruler() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.id() == id)?;
        Some(self.annotations.remove(index))
    }

    pub fn find(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    pub fn find_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id() == id)
    }

    pub fn ruler(&self, id: AnnotationId) -> Option<&Ruler> {
        self.find(id).and_then(Annotation::as_ruler)
    }

    pub fn ruler_mut(&mut self, id: AnnotationId) -> Option<&mut Ruler> {
        self.find_mut(id).and_then(Annotation::as_ruler_mut)
    }

    /// All rulers, oldest first.
    pub fn rulers(&self) -> impl Iterator<Item = &Ruler> {
        self.annotations.iter().filter_map(Annotation::as_ruler)
    }

    pub fn ruler_count(&self) -> usize {
        self.rulers().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Remove all annotations. Ids keep counting up.
    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    /// Remove all rulers, keeping other annotations.
    pub fn clear_rulers(&mut self) {
        self.annotations.retain(|a| !a.is_ruler());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_measurements() {
        let ruler = Ruler::new(pt(1.0, 1.0), pt(4.0, 5.0));
        assert_eq!(ruler.distance(), 5.0);
        assert_eq!(ruler.dx(), 3.0);
        assert_eq!(ruler.dy(), 4.0);
        assert_eq!(ruler.area(), 12.0);
        assert!((ruler.angle() - 53.130102354).abs() < 1e-6);
    }

    #[test]
    fn test_polyline_length_and_area() {
        let ruler =
            Ruler::from_points(vec![pt(0.0, 0.0), pt(2.0, 0.0), pt(2.0, 2.0), pt(0.0, 2.0)]);
        assert_eq!(ruler.length(), 6.0);
        assert_eq!(ruler.area(), 4.0);
        assert_eq!(ruler.distance(), 2.0);
    }

    #[test]
    fn test_angle_outline() {
        let mut ruler = Ruler::from_points(vec![pt(1.0, 0.0), pt(0.0, 0.0), pt(0.0, 3.0)]);
        ruler.outline = OutlineType::Angle;
        assert!((ruler.angle() - 90.0).abs() < 1e-9);
        assert_eq!(ruler.segments().len(), 2);
    }

    #[test]
    fn test_radius_through_three_points() {
        let mut ruler = Ruler::from_points(vec![pt(2.0, 0.0), pt(0.0, 2.0), pt(-2.0, 0.0)]);
        ruler.outline = OutlineType::Radius;
        assert!((ruler.radius() - 2.0).abs() < 1e-9);
        assert!((Ruler::new(pt(0.0, 0.0), pt(0.0, 3.0)).radius() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_xy_segments() {
        let mut ruler = Ruler::new(pt(0.0, 0.0), pt(3.0, 4.0));
        ruler.outline = OutlineType::XY;
        let segments = ruler.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].p2, pt(3.0, 0.0));

        ruler.outline = OutlineType::DiagYX;
        let segments = ruler.segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].p2, pt(0.0, 4.0));

        ruler.outline = OutlineType::Box;
        assert_eq!(ruler.segments().len(), 4);
    }

    #[test]
    fn test_format_variables() {
        let ruler = Ruler::new(pt(0.0, 0.0), pt(3.0, 4.0));
        assert_eq!(ruler.text(), "5.000");
        assert_eq!(ruler.try_format("dx=$X dy=${Y}").unwrap(), "dx=3.000 dy=4.000");
        assert_eq!(ruler.try_format("$$D").unwrap(), "$D");
        assert_eq!(ruler.try_format("no variables").unwrap(), "no variables");
    }

    #[test]
    fn test_format_precision() {
        let mut ruler = Ruler::new(pt(0.0, 0.0), pt(1.0, 1.0));
        ruler.precision = 1;
        assert_eq!(ruler.try_format("$D").unwrap(), "1.4");
    }

    #[test]
    fn test_format_errors() {
        let mut ruler = Ruler::new(pt(0.0, 0.0), pt(3.0, 4.0));
        assert_eq!(ruler.try_format("$Z"), Err(FormatError::UnknownVariable("Z".to_string())));
        assert_eq!(
            ruler.try_format("${D"),
            Err(FormatError::UnterminatedExpression("${D".to_string()))
        );
        assert!(ruler.try_format("trailing $").is_err());

        ruler.fmt = "${nope}".to_string();
        assert_eq!(ruler.text(), "${nope}");
    }

    #[test]
    fn test_degenerate() {
        assert!(Ruler::new(pt(1.0, 1.0), pt(1.0, 1.000001)).is_degenerate());
        assert!(!Ruler::new(pt(1.0, 1.0), pt(1.0, 1.001)).is_degenerate());
        assert!(Ruler::from_points(Vec::new()).is_degenerate());
    }

    #[test]
    fn test_collection_ids_and_lookup() {
        let mut rulers = RulerCollection::new();
        let a = rulers.insert(Ruler::new(pt(0.0, 0.0), pt(1.0, 0.0))).unwrap();
        let m = rulers.insert(Marker::new(pt(5.0, 5.0), "pad")).unwrap();
        assert_ne!(a, m);
        assert_eq!(rulers.ruler(a).map(Ruler::id), Some(a));
        assert!(rulers.ruler(m).is_none());
        assert!(!rulers.find(m).unwrap().is_ruler());

        rulers.ruler_mut(a).unwrap().fmt = "$L".to_string();
        assert_eq!(rulers.ruler(a).unwrap().text(), "1.000");

        assert!(rulers.remove(a).is_some());
        assert!(rulers.remove(a).is_none());
        assert_eq!(rulers.len(), 1);
    }

    #[test]
    fn test_collection_limit_drops_oldest() {
        let mut rulers = RulerCollection::with_limit(Some(2));
        let marker = rulers.insert(Marker::new(pt(0.0, 0.0), "m")).unwrap();
        let first = rulers.insert(Ruler::new(pt(0.0, 0.0), pt(1.0, 0.0))).unwrap();
        let second = rulers.insert(Ruler::new(pt(0.0, 0.0), pt(2.0, 0.0))).unwrap();
        let third = rulers.insert(Ruler::new(pt(0.0, 0.0), pt(3.0, 0.0))).unwrap();

        assert_eq!(rulers.ruler_count(), 2);
        assert!(rulers.find(first).is_none());
        assert!(rulers.find(second).is_some());
        assert!(rulers.find(third).is_some());
        assert!(rulers.find(marker).is_some());

        rulers.set_max_rulers(Some(1));
        assert_eq!(rulers.rulers().map(Ruler::id).collect::<Vec<_>>(), vec![third]);

        rulers.set_max_rulers(Some(0));
        assert_eq!(rulers.insert(Ruler::new(pt(0.0, 0.0), pt(1.0, 0.0))), None);
        assert_eq!(rulers.len(), 1);
    }

    #[test]
    fn test_clear_rulers_keeps_markers() {
        let mut rulers = RulerCollection::new();
        rulers.insert(Ruler::new(pt(0.0, 0.0), pt(1.0, 0.0)));
        rulers.insert(Marker::new(pt(0.0, 0.0), "m"));
        rulers.clear_rulers();
        assert_eq!(rulers.len(), 1);
        rulers.clear();
        assert!(rulers.is_empty());
    }

    #[test]
    fn test_ruler_json_round_trip() {
        let mut ruler = Ruler::new(pt(0.0, 0.0), pt(1.0, 2.0));
        ruler.outline = OutlineType::Ellipse;
        ruler.style = RulerStyle::ArrowBoth;
        let json = serde_json::to_string(&ruler).unwrap();
        let back: Ruler = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ruler);
    }
}
