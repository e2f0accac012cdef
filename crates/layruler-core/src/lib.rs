//! Layruler Core Library
//!
//! Snapping engine and ruler model for measuring hierarchical chip layouts.
//! Coordinates are in microns unless a function says otherwise.

pub mod angle;
pub mod config;
pub mod finder;
pub mod geometry;
pub mod grid;
pub mod layout;
pub mod ruler;
pub mod snap;
pub mod tools;
pub mod view;
pub mod viewport;

pub use angle::{AngleConstraint, make_cutlines, snap_angle, snap_angle_with_reference};
pub use config::{ConfigError, ConfigResult, RulerConfig};
pub use finder::{Candidate, ContourFinder, SearchOutcome};
pub use geometry::Edge;
pub use layout::{CellIndex, CellInstArray, LayerIndex, Layout, LayoutError, LayoutShape};
pub use ruler::{
    Annotation, AnnotationId, Marker, OutlineType, PositionType, Ruler, RulerCollection, RulerStyle,
};
pub use snap::{
    SnapResult, SnapTargetKind, TwoPointSnapResult, obj_snap, obj_snap2, obj_snap2_constrained,
    obj_snap_constrained,
};
pub use tools::{Modifiers, RulerMode, RulerTool, SnapContext, ToolState};
pub use view::{LayerView, LayoutView};
pub use viewport::Viewport;
