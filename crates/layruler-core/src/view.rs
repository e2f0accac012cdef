//! Visible state of a layout: layers, hidden cells and hierarchy depth.
//!
//! A [`LayoutView`] is what the snapping functions consume. It decides which
//! layers take part in a search, how often each is drawn (transform
//! variants) and how deep the cell hierarchy is walked.

use crate::layout::{CellIndex, LayerIndex, Layout};
use kurbo::Affine;
use std::collections::HashSet;

/// One entry of the layer list.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerView {
    /// Display name.
    pub name: String,
    /// Layout layer this entry draws. `None` for non-visual entries such as
    /// group headers.
    pub layer: Option<LayerIndex>,
    pub visible: bool,
    /// Micron-space transforms the layer is drawn with. Empty means identity.
    pub transforms: Vec<Affine>,
}

impl LayerView {
    /// A visible entry drawing `layer` once, untransformed.
    pub fn new(name: impl Into<String>, layer: LayerIndex) -> Self {
        Self {
            name: name.into(),
            layer: Some(layer),
            visible: true,
            transforms: Vec::new(),
        }
    }

    /// A non-visual entry.
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer: None,
            visible: true,
            transforms: Vec::new(),
        }
    }

    /// True if the entry draws a layer.
    pub fn is_visual(&self) -> bool {
        self.layer.is_some()
    }

    /// The independent transforms this entry is drawn with.
    pub fn transform_variants(&self) -> Vec<Affine> {
        if self.transforms.is_empty() {
            vec![Affine::IDENTITY]
        } else {
            let mut variants: Vec<Affine> = Vec::with_capacity(self.transforms.len());
            for t in &self.transforms {
                if !variants.contains(t) {
                    variants.push(*t);
                }
            }
            variants
        }
    }
}

/// A layout as shown in a viewer.
#[derive(Debug, Clone)]
pub struct LayoutView {
    layout: Layout,
    top: CellIndex,
    layers: Vec<LayerView>,
    hidden_cells: HashSet<CellIndex>,
    min_hier_level: usize,
    max_hier_level: usize,
}

impl LayoutView {
    /// Show `layout` from `top` with one visible entry per layout layer.
    pub fn new(layout: Layout, top: CellIndex) -> Self {
        let layers = (0..layout.layer_count())
            .map(|l| LayerView::new(layout.layer_name(l).unwrap_or_default(), l))
            .collect();
        Self {
            layout,
            top,
            layers,
            hidden_cells: HashSet::new(),
            min_hier_level: 0,
            max_hier_level: usize::MAX,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn top(&self) -> CellIndex {
        self.top
    }

    pub fn layers(&self) -> &[LayerView] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut Vec<LayerView> {
        &mut self.layers
    }

    pub fn hide_cell(&mut self, cell: CellIndex) {
        self.hidden_cells.insert(cell);
    }

    pub fn show_cell(&mut self, cell: CellIndex) {
        self.hidden_cells.remove(&cell);
    }

    pub fn is_cell_hidden(&self, cell: CellIndex) -> bool {
        self.hidden_cells.contains(&cell)
    }

    /// Restrict the hierarchy levels whose shapes are considered.
    ///
    /// The top cell is level 0. Shapes are taken from levels
    /// `min..=max`; instances below `max` are not descended into.
    pub fn set_hier_levels(&mut self, min: usize, max: usize) {
        self.min_hier_level = min;
        self.max_hier_level = max.max(min);
    }

    pub fn hier_levels(&self) -> (usize, usize) {
        (self.min_hier_level, self.max_hier_level)
    }
}
