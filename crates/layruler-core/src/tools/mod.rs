//! Ruler tool: turns pointer input into snapped rulers.
//!
//! The tool owns no layout state. Every event carries a [`SnapContext`]
//! with the view to snap against, the viewport used to convert the pixel
//! tolerance into microns and the modifier keys held.

use crate::angle::AngleConstraint;
use crate::config::RulerConfig;
use crate::geometry::LENGTH_EPSILON;
use crate::ruler::Ruler;
use crate::snap::{obj_snap, obj_snap2_constrained, obj_snap_constrained, SnapResult};
use crate::view::LayoutView;
use crate::viewport::Viewport;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    /// Angle constraint selected by the keys held.
    ///
    /// Shift restricts to horizontal and vertical, Ctrl adds the diagonals
    /// and both together lift any restriction. Without keys the ruler's
    /// own setting applies.
    pub fn angle_constraint(self) -> AngleConstraint {
        match (self.shift, self.ctrl) {
            (true, true) => AngleConstraint::Any,
            (true, false) => AngleConstraint::Ortho,
            (false, true) => AngleConstraint::Diagonal,
            (false, false) => AngleConstraint::Global,
        }
    }
}

/// Input for one snapping event.
#[derive(Debug, Clone, Copy)]
pub struct SnapContext<'a> {
    /// View to snap against. `None` disables object snapping.
    pub view: Option<&'a LayoutView>,
    pub viewport: &'a Viewport,
    pub modifiers: Modifiers,
}

/// How rulers are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RulerMode {
    /// Two points, by dragging or by two clicks.
    #[default]
    Single,
    /// One click measures between the two contours around it.
    AutoMetric,
    /// Each click appends a point until finished. Angle and radius
    /// templates finish after three points.
    MultiSegment,
}

/// State of a ruler interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolState {
    #[default]
    Idle,
    /// Placing points.
    Active {
        /// Points fixed so far.
        points: Vec<Point>,
        /// Snapped pointer position.
        current: Point,
    },
}

/// Creates and edits rulers.
#[derive(Debug, Clone)]
pub struct RulerTool {
    pub mode: RulerMode,
    pub state: ToolState,
    pub config: RulerConfig,
    /// Style, formats and constraint copied into new rulers.
    pub template: Ruler,
}

impl Default for RulerTool {
    fn default() -> Self {
        Self::new(RulerConfig::default())
    }
}

impl RulerTool {
    pub fn new(config: RulerConfig) -> Self {
        let template = config.ruler_template();
        Self {
            mode: RulerMode::default(),
            state: ToolState::Idle,
            config,
            template,
        }
    }

    /// Switch modes, dropping any interaction in progress.
    pub fn set_mode(&mut self, mode: RulerMode) {
        self.mode = mode;
        self.state = ToolState::Idle;
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ToolState::Active { .. })
    }

    pub fn cancel(&mut self) {
        self.state = ToolState::Idle;
    }

    /// Search range in microns for the current zoom.
    pub fn search_range(&self, viewport: &Viewport) -> f64 {
        viewport.pixels_to_world(self.config.snap_range_px)
    }

    /// Angle constraint in effect: modifier keys first, then the template,
    /// then the configured default.
    pub fn effective_constraint(&self, modifiers: Modifiers) -> AngleConstraint {
        match modifiers.angle_constraint() {
            AngleConstraint::Global => self
                .template
                .angle_constraint
                .resolve(self.config.default_angle_constraint),
            mode => mode,
        }
    }

    fn snap_view<'a>(&self, ctx: &SnapContext<'a>) -> Option<&'a LayoutView> {
        ctx.view.filter(|_| self.config.obj_snap && self.template.snap)
    }

    /// Snap one point, relative to `reference` if given.
    pub fn snap_point(
        &self,
        ctx: &SnapContext<'_>,
        p: Point,
        reference: Option<Point>,
    ) -> SnapResult {
        self.snap_in_range(ctx, p, reference, self.search_range(ctx.viewport))
    }

    fn snap_in_range(
        &self,
        ctx: &SnapContext<'_>,
        p: Point,
        reference: Option<Point>,
        range: f64,
    ) -> SnapResult {
        let view = self.snap_view(ctx);
        let grid = self.config.grid_vector();
        match reference {
            Some(reference) => {
                let mode = self.effective_constraint(ctx.modifiers);
                obj_snap_constrained(view, reference, p, grid, mode, range)
            }
            None => obj_snap(view, p, grid, range),
        }
    }

    /// Snap with a search range doubling from the pixel tolerance up to
    /// the configured factor, until an object is hit.
    pub fn snap_point_with_retry(
        &self,
        ctx: &SnapContext<'_>,
        p: Point,
        reference: Option<Point>,
    ) -> SnapResult {
        let initial = self.search_range(ctx.viewport);
        let max_range = initial * self.config.max_range_factor;
        let mut range = initial;
        loop {
            let result = self.snap_in_range(ctx, p, reference, range);
            let exhausted = !(range > 0.0) || !(range * 2.0 <= max_range);
            if result.is_snapped() || self.snap_view(ctx).is_none() || exhausted {
                return result;
            }
            range *= 2.0;
            log::debug!("Snap at {p:?} missed, retrying with range {range}");
        }
    }

    /// Measure between the two contours around `p`.
    pub fn auto_measure(&self, ctx: &SnapContext<'_>, p: Point) -> Option<Ruler> {
        let range = self.search_range(ctx.viewport);
        let mode = self.effective_constraint(ctx.modifiers);
        let result = obj_snap2_constrained(
            self.snap_view(ctx),
            p,
            p,
            self.config.grid_vector(),
            mode,
            range,
            range * self.config.max_range_factor,
        );
        if !result.found {
            log::debug!("Auto-measure at {p:?} found no contours");
            return None;
        }
        self.make_ruler(vec![result.first, result.second])
    }

    /// Pointer pressed. Returns a ruler if the press completes one.
    pub fn begin(&mut self, ctx: &SnapContext<'_>, p: Point) -> Option<Ruler> {
        if self.mode == RulerMode::AutoMetric {
            return self.auto_measure(ctx, p);
        }

        if !self.is_active() {
            let start = self.snap_point_from(ctx, p, None);
            self.state = ToolState::Active {
                points: vec![start],
                current: start,
            };
            return None;
        }

        let ToolState::Active { points, .. } = &self.state else {
            return None;
        };
        let snapped = self.snap_point_from(ctx, p, points.last().copied());
        self.push_point(snapped)
    }

    /// Pointer moved. Updates the point being placed.
    pub fn update(&mut self, ctx: &SnapContext<'_>, p: Point) {
        let reference = match &self.state {
            ToolState::Active { points, .. } => points.last().copied(),
            ToolState::Idle => return,
        };
        let snapped = self.snap_point_from(ctx, p, reference);
        if let ToolState::Active { current, .. } = &mut self.state {
            *current = snapped;
        }
    }

    /// Pointer released. Completes a dragged single ruler; a release on
    /// the start point leaves the tool waiting for a second click.
    pub fn end(&mut self, ctx: &SnapContext<'_>, p: Point) -> Option<Ruler> {
        if self.mode != RulerMode::Single {
            return None;
        }
        let ToolState::Active { points, .. } = &self.state else {
            return None;
        };
        let start = points.first().copied()?;
        if points.len() != 1 {
            return None;
        }
        let snapped = self.snap_point_from(ctx, p, Some(start));
        if snapped.distance(start) < LENGTH_EPSILON {
            return None;
        }
        self.push_point(snapped)
    }

    /// Complete a multi-segment ruler with a last point at `p`.
    pub fn finish(&mut self, ctx: &SnapContext<'_>, p: Point) -> Option<Ruler> {
        let ToolState::Active { points, .. } = &self.state else {
            return None;
        };
        let mut points = points.clone();
        let last = self.snap_point_from(ctx, p, points.last().copied());
        if points.last().is_none_or(|q| q.distance(last) >= LENGTH_EPSILON) {
            points.push(last);
        }
        self.state = ToolState::Idle;
        self.make_ruler(points)
    }

    /// The ruler as it would be created now.
    pub fn preview(&self) -> Option<Ruler> {
        match &self.state {
            ToolState::Active { points, current } => {
                let mut points = points.clone();
                points.push(*current);
                Some(self.template.with_points(points))
            }
            ToolState::Idle => None,
        }
    }

    /// Move point `index` of `ruler` to a snapped position near `p`.
    ///
    /// The neighbouring point serves as the angle reference. Returns false
    /// if the ruler has no such point.
    pub fn move_point(
        &self,
        ctx: &SnapContext<'_>,
        ruler: &mut Ruler,
        index: usize,
        p: Point,
    ) -> bool {
        let points = ruler.points();
        if index >= points.len() {
            return false;
        }
        let reference = match index {
            0 => points.get(1).copied(),
            i => points.get(i - 1).copied(),
        };
        let snapped = self.snap_point_with_retry(ctx, p, reference);
        ruler.set_point(index, snapped.point)
    }

    fn snap_point_from(&self, ctx: &SnapContext<'_>, p: Point, reference: Option<Point>) -> Point {
        self.snap_point(ctx, p, reference).point
    }

    /// Fix a point of the active ruler and complete it if the mode says so.
    fn push_point(&mut self, p: Point) -> Option<Ruler> {
        let ToolState::Active { points, current } = &mut self.state else {
            return None;
        };
        points.push(p);
        *current = p;

        let complete = match self.mode {
            RulerMode::Single => points.len() >= 2,
            RulerMode::MultiSegment => {
                let min = self.template.outline.min_points();
                min > 2 && points.len() >= min
            }
            RulerMode::AutoMetric => false,
        };
        if !complete {
            return None;
        }
        let points = std::mem::take(points);
        self.state = ToolState::Idle;
        self.make_ruler(points)
    }

    fn make_ruler(&self, points: Vec<Point>) -> Option<Ruler> {
        let ruler = self.template.with_points(points);
        if ruler.points().len() < 2 || ruler.is_degenerate() {
            log::debug!("Dropping degenerate ruler");
            return None;
        }
        Some(ruler)
    }
}
