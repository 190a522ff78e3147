//! Recording plot surface for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::render::plot_interaction::PlotViewState;
use crate::render::surface::{
    Axis, AxisRange, ColorMapField, ItemId, LineGraph, OverlayItem, PlotSurface, RangeChange,
    ScreenRect, ScreenSize, MAIN_LAYER,
};

/// Surface with a linear pixel mapping over a 100 x 50 viewport. Text is
/// measured at 6 px per character per 10 pt, lines are 12 px per 10 pt.
pub struct MockSurface {
    pub view: PlotViewState,
    pub viewport: ScreenRect,
    pub muted: bool,
    pub pending: Vec<RangeChange>,
    pub layers: Vec<&'static str>,
    pub items: HashMap<ItemId, OverlayItem>,
    next_item: u64,
    pub graphs: Vec<LineGraph>,
    pub color_maps: Vec<ColorMapField>,
    pub top_axis: Option<(String, AxisRange)>,
    pub x_sets: usize,
    pub y_sets: usize,
    pub full_replots: usize,
    pub layer_replots: HashMap<String, usize>,
}

impl MockSurface {
    pub fn new(x: AxisRange, y: AxisRange) -> Self {
        let mut view = PlotViewState::new();
        view.set_x_range(x);
        view.set_y_range(y);
        Self {
            view,
            viewport: ScreenRect::new(0.0, 0.0, 100.0, 50.0),
            muted: false,
            pending: Vec::new(),
            layers: vec![MAIN_LAYER],
            items: HashMap::new(),
            next_item: 1,
            graphs: Vec::new(),
            color_maps: Vec::new(),
            top_axis: None,
            x_sets: 0,
            y_sets: 0,
            full_replots: 0,
            layer_replots: HashMap::new(),
        }
    }

    pub fn shared(x: AxisRange, y: AxisRange) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(x, y)))
    }

    pub fn item_ref(&self, id: ItemId) -> Option<&OverlayItem> {
        self.items.get(&id)
    }

    pub fn layer_replots(&self, name: &str) -> usize {
        self.layer_replots.get(name).copied().unwrap_or(0)
    }

    pub fn visible_items_on(&self, layer: &str) -> usize {
        self.items.values().filter(|i| i.layer == layer && i.visible).count()
    }
}

impl PlotSurface for MockSurface {
    fn pixel_to_x(&self, px: f32) -> f64 {
        self.view.pixel_to_x(px, self.viewport)
    }

    fn pixel_to_y(&self, py: f32) -> f64 {
        self.view.pixel_to_y(py, self.viewport)
    }

    fn x_range(&self) -> AxisRange {
        self.view.x_range()
    }

    fn y_range(&self) -> AxisRange {
        self.view.y_range()
    }

    fn set_x_range(&mut self, range: AxisRange) {
        self.view.set_x_range(range);
        self.x_sets += 1;
        if !self.muted {
            self.pending.push(RangeChange { axis: Axis::X, range });
        }
    }

    fn set_y_range(&mut self, range: AxisRange) {
        self.view.set_y_range(range);
        self.y_sets += 1;
        if !self.muted {
            self.pending.push(RangeChange { axis: Axis::Y, range });
        }
    }

    fn set_x_limits(&mut self, limits: Option<AxisRange>) {
        self.view.x_limits = limits;
    }

    fn set_notifications_muted(&mut self, muted: bool) -> bool {
        std::mem::replace(&mut self.muted, muted)
    }

    fn drain_range_changes(&mut self) -> Vec<RangeChange> {
        std::mem::take(&mut self.pending)
    }

    fn viewport(&self) -> ScreenRect {
        self.viewport
    }

    fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|l| *l == name)
    }

    fn add_layer_above(&mut self, name: &'static str, below: &str) {
        if self.has_layer(name) {
            return;
        }
        let at = self
            .layers
            .iter()
            .position(|l| *l == below)
            .map(|i| i + 1)
            .unwrap_or(self.layers.len());
        self.layers.insert(at, name);
    }

    fn add_item(&mut self, item: OverlayItem) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        self.items.insert(id, item);
        id
    }

    fn item_mut(&mut self, id: ItemId) -> Option<&mut OverlayItem> {
        self.items.get_mut(&id)
    }

    fn remove_item(&mut self, id: ItemId) -> bool {
        self.items.remove(&id).is_some()
    }

    fn clear_plottables(&mut self) {
        self.graphs.clear();
        self.color_maps.clear();
    }

    fn add_line_graph(&mut self, graph: LineGraph) {
        self.graphs.push(graph);
    }

    fn add_color_map(&mut self, map: ColorMapField) {
        self.color_maps.push(map);
    }

    fn set_top_axis(&mut self, title: Option<&str>, range: AxisRange) {
        self.top_axis = title.map(|t| (t.to_string(), range));
    }

    fn measure_text(&self, text: &str, font_size: f32) -> ScreenSize {
        ScreenSize {
            width: text.chars().count() as f32 * font_size * 6.0 / 10.0,
            height: self.line_height(font_size),
        }
    }

    fn line_height(&self, font_size: f32) -> f32 {
        font_size * 12.0 / 10.0
    }

    fn replot_layer(&mut self, name: &str) {
        *self.layer_replots.entry(name.to_string()).or_insert(0) += 1;
    }

    fn replot(&mut self) {
        self.full_replots += 1;
    }
}
