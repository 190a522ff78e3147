use std::cell::RefCell;
use std::rc::Rc;

/// Layer holding plottables (traces, colour maps) and the selection rectangle.
pub const MAIN_LAYER: &str = "main";
/// Layer above `main` for cursor guides and the readout frame.
pub const OVERLAY_LAYER: &str = "overlay";
/// Layer above `overlay` for the coordinate readout text.
pub const TEXT_OVERLAY_LAYER: &str = "textOverlay";

/// Identity of a surface inside a [`PlotRegistry`](crate::engine::registry::PlotRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u64);

/// Identity of an overlay item on one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Shared handle to a plot surface. The engine never owns the surface's lifetime
/// beyond holding this handle while it is registered.
pub type SurfaceHandle = Rc<RefCell<dyn PlotSurface>>;

/// Surface-local pixel position (origin at the top left of the widget).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenSize {
    pub width: f32,
    pub height: f32,
}

/// Pixel rectangle of the plotting area, in surface-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    pub fn contains(&self, pos: ScreenPos) -> bool {
        pos.x >= self.left && pos.x <= self.right() && pos.y >= self.top && pos.y <= self.bottom()
    }

    pub fn contains_y(&self, y: f32) -> bool {
        y >= self.top && y <= self.bottom()
    }
}

/// A closed axis interval in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub lower: f64,
    pub upper: f64,
}

impl AxisRange {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Same interval with `lower <= upper`.
    pub fn normalized(self) -> Self {
        if self.lower <= self.upper {
            self
        } else {
            Self::new(self.upper, self.lower)
        }
    }

    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }
}

impl Default for AxisRange {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// Pointer input delivered by the host, in surface-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Enter(ScreenPos),
    Move(ScreenPos),
    Leave,
    Press(ScreenPos),
    Release(ScreenPos),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// A range-change notification emitted by a surface whose notifications are not muted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeChange {
    pub axis: Axis,
    pub range: AxisRange,
}

/// Position of an overlay item anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemPosition {
    /// Data coordinates on the surface's axes.
    Plot { x: f64, y: f64 },
    /// Surface-local pixels.
    Pixel(ScreenPos),
}

impl ItemPosition {
    pub fn plot(x: f64, y: f64) -> Self {
        ItemPosition::Plot { x, y }
    }

    pub fn pixel(x: f32, y: f32) -> Self {
        ItemPosition::Pixel(ScreenPos::new(x, y))
    }

    /// Data-space coordinates, if this is a plot-space position.
    pub fn coords(&self) -> Option<(f64, f64)> {
        match *self {
            ItemPosition::Plot { x, y } => Some((x, y)),
            ItemPosition::Pixel(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Line { start: ItemPosition, end: ItemPosition },
    Rect { top_left: ItemPosition, bottom_right: ItemPosition },
    Text { position: ItemPosition, text: String, font_size: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ItemStyle {
    pub stroke: Option<[u8; 4]>,
    pub fill: Option<[u8; 4]>,
    pub dotted: bool,
}

/// A line, rectangle or text item drawn on a named layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub layer: &'static str,
    pub visible: bool,
    pub shape: OverlayShape,
    pub style: ItemStyle,
}

impl OverlayItem {
    pub fn line(layer: &'static str, style: ItemStyle) -> Self {
        Self {
            layer,
            visible: false,
            shape: OverlayShape::Line {
                start: ItemPosition::plot(0.0, 0.0),
                end: ItemPosition::plot(0.0, 0.0),
            },
            style,
        }
    }

    pub fn rect(layer: &'static str, style: ItemStyle) -> Self {
        Self {
            layer,
            visible: false,
            shape: OverlayShape::Rect {
                top_left: ItemPosition::plot(0.0, 0.0),
                bottom_right: ItemPosition::plot(0.0, 0.0),
            },
            style,
        }
    }

    pub fn text(layer: &'static str, font_size: f32, style: ItemStyle) -> Self {
        Self {
            layer,
            visible: false,
            shape: OverlayShape::Text {
                position: ItemPosition::plot(0.0, 0.0),
                text: String::new(),
                font_size,
            },
            style,
        }
    }

    /// Move both endpoints of a line item. No effect on other shapes.
    pub fn set_line(&mut self, start: ItemPosition, end: ItemPosition) {
        if let OverlayShape::Line { start: s, end: e } = &mut self.shape {
            *s = start;
            *e = end;
        }
    }

    /// Move both corners of a rectangle item. No effect on other shapes.
    pub fn set_rect(&mut self, top_left: ItemPosition, bottom_right: ItemPosition) {
        if let OverlayShape::Rect { top_left: tl, bottom_right: br } = &mut self.shape {
            *tl = top_left;
            *br = bottom_right;
        }
    }

    /// Replace the text and anchor of a text item. No effect on other shapes.
    pub fn set_text(&mut self, position: ItemPosition, text: String) {
        if let OverlayShape::Text { position: p, text: t, .. } = &mut self.shape {
            *p = position;
            *t = text;
        }
    }
}

/// Polyline trace drawn on the main layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGraph {
    pub name: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub color: [u8; 4],
    pub line_width: f32,
}

/// Dense 2-D field (spectrogram) drawn as a grid of cells.
///
/// `cells[ix][iy]` covers the `ix`-th column along x and the `iy`-th row along y.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapField {
    pub name: String,
    pub cells: Vec<Vec<f64>>,
    pub x_range: AxisRange,
    pub y_range: AxisRange,
    /// Values at or below `lower` map to the first gradient stop, at or above `upper` to the last.
    pub data_range: AxisRange,
}

impl ColorMapField {
    pub fn columns(&self) -> usize {
        self.cells.len()
    }

    pub fn rows(&self) -> usize {
        self.cells.first().map(|c| c.len()).unwrap_or(0)
    }
}

/// Capability the engine needs from a rendering backend.
///
/// Implementations record range changes made through [`set_x_range`](Self::set_x_range)
/// and [`set_y_range`](Self::set_y_range), as well as user pan/zoom, as pending
/// [`RangeChange`]s unless notifications are muted.
pub trait PlotSurface {
    fn pixel_to_x(&self, px: f32) -> f64;
    fn pixel_to_y(&self, py: f32) -> f64;

    fn x_range(&self) -> AxisRange;
    fn y_range(&self) -> AxisRange;
    fn set_x_range(&mut self, range: AxisRange);
    fn set_y_range(&mut self, range: AxisRange);
    /// Bound user pan/zoom on the x axis. `None` removes the bound.
    fn set_x_limits(&mut self, limits: Option<AxisRange>);

    /// Mute or unmute range-change notifications. Returns the previous state.
    fn set_notifications_muted(&mut self, muted: bool) -> bool;
    /// Take the range changes recorded since the last call.
    fn drain_range_changes(&mut self) -> Vec<RangeChange>;

    /// Plotting area in surface-local pixels.
    fn viewport(&self) -> ScreenRect;

    fn has_layer(&self, name: &str) -> bool;
    /// Insert `name` directly above `below`. No effect if `name` already exists.
    fn add_layer_above(&mut self, name: &'static str, below: &str);

    fn add_item(&mut self, item: OverlayItem) -> ItemId;
    fn item_mut(&mut self, id: ItemId) -> Option<&mut OverlayItem>;
    fn remove_item(&mut self, id: ItemId) -> bool;

    fn clear_plottables(&mut self);
    fn add_line_graph(&mut self, graph: LineGraph);
    fn add_color_map(&mut self, map: ColorMapField);

    /// Show a secondary time axis along the top edge with the given title, or hide it.
    fn set_top_axis(&mut self, title: Option<&str>, range: AxisRange);

    /// Pixel size of `text` rendered at `font_size` on a single line.
    fn measure_text(&self, text: &str, font_size: f32) -> ScreenSize;
    /// Height of one text line at `font_size`.
    fn line_height(&self, font_size: f32) -> f32;

    /// Redraw a single layer.
    fn replot_layer(&mut self, name: &str);
    /// Redraw every layer.
    fn replot(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_orders_bounds() {
        assert_eq!(AxisRange::new(3.0, 1.0).normalized(), AxisRange::new(1.0, 3.0));
        assert_eq!(AxisRange::new(1.0, 3.0).normalized(), AxisRange::new(1.0, 3.0));
    }

    #[test]
    fn shape_setters_ignore_mismatched_shapes() {
        let mut text = OverlayItem::text(TEXT_OVERLAY_LAYER, 10.0, ItemStyle::default());
        text.set_line(ItemPosition::plot(1.0, 1.0), ItemPosition::plot(2.0, 2.0));
        assert!(matches!(text.shape, OverlayShape::Text { .. }));

        let mut line = OverlayItem::line(OVERLAY_LAYER, ItemStyle::default());
        line.set_line(ItemPosition::plot(1.0, 0.0), ItemPosition::plot(1.0, 5.0));
        assert_eq!(
            line.shape,
            OverlayShape::Line {
                start: ItemPosition::plot(1.0, 0.0),
                end: ItemPosition::plot(1.0, 5.0),
            }
        );
    }

    #[test]
    fn viewport_contains_edges() {
        let r = ScreenRect::new(0.0, 0.0, 100.0, 50.0);
        assert!(r.contains(ScreenPos::new(0.0, 0.0)));
        assert!(r.contains(ScreenPos::new(100.0, 50.0)));
        assert!(!r.contains(ScreenPos::new(100.5, 10.0)));
        assert!(!r.contains_y(-1.0));
    }
}
