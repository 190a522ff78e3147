use std::collections::BTreeMap;

use crate::processing::downsampling;
use crate::render::plot_interaction::{self, PlotViewState};
use crate::render::surface::{
    Axis, AxisRange, ColorMapField, ItemId, ItemPosition, LineGraph, OverlayItem, OverlayShape,
    PlotSurface, PointerEvent, RangeChange, ScreenPos, ScreenRect, ScreenSize, MAIN_LAYER,
    TEXT_OVERLAY_LAYER,
};
use crate::state::theme::{color32, Theme};

const LEFT_MARGIN: f32 = 56.0;
const RIGHT_MARGIN: f32 = 12.0;
const TOP_MARGIN: f32 = 8.0;
/// Room for tick labels and the title of a top axis.
const TOP_AXIS_MARGIN: f32 = 34.0;
const BOTTOM_MARGIN: f32 = 20.0;
const TICK_FONT: f32 = 10.0;

/// [`PlotSurface`] painted with egui. Layers are painted bottom to top every
/// frame; layer replots only request a repaint.
pub struct EguiSurface {
    id: egui::Id,
    view: PlotViewState,
    /// Plot area relative to the widget's top-left corner.
    viewport: ScreenRect,
    ctx: Option<egui::Context>,
    muted: bool,
    pending: Vec<RangeChange>,
    layers: Vec<&'static str>,
    items: BTreeMap<ItemId, OverlayItem>,
    next_item: u64,
    graphs: Vec<LineGraph>,
    color_maps: Vec<ColorMapField>,
    top_axis: Option<(String, AxisRange)>,
    hovered: bool,
    pressing: bool,
    last_pointer: Option<ScreenPos>,
}

impl EguiSurface {
    pub fn new(id_source: impl std::hash::Hash) -> Self {
        Self {
            id: egui::Id::new("kinoscope_surface").with(id_source),
            view: PlotViewState::new(),
            viewport: ScreenRect::new(LEFT_MARGIN, TOP_MARGIN, 1.0, 1.0),
            ctx: None,
            muted: false,
            pending: Vec::new(),
            layers: vec![MAIN_LAYER],
            items: BTreeMap::new(),
            next_item: 1,
            graphs: Vec::new(),
            color_maps: Vec::new(),
            top_axis: None,
            hovered: false,
            pressing: false,
            last_pointer: None,
        }
    }

    fn notify(&mut self, axis: Axis, range: AxisRange) {
        if !self.muted {
            self.pending.push(RangeChange { axis, range });
        }
    }

    fn request_repaint(&self) {
        if let Some(ctx) = &self.ctx {
            ctx.request_repaint();
        }
    }

    /// Allocate, paint and interact. Returns the pointer events of this frame
    /// for the host to forward to the owning visualizer.
    pub fn show(&mut self, ui: &mut egui::Ui, height: f32, theme: &Theme) -> Vec<PointerEvent> {
        let width = ui.available_width();
        let total_rect = ui.allocate_space(egui::vec2(width, height)).1;
        let response = ui
            .interact(total_rect, self.id, egui::Sense::click_and_drag())
            .on_hover_cursor(egui::CursorIcon::Crosshair);
        self.ctx = Some(ui.ctx().clone());

        let top = if self.top_axis.is_some() { TOP_AXIS_MARGIN } else { TOP_MARGIN };
        self.viewport = ScreenRect::new(
            LEFT_MARGIN,
            top,
            (width - LEFT_MARGIN - RIGHT_MARGIN).max(1.0),
            (height - top - BOTTOM_MARGIN).max(1.0),
        );
        let origin = total_rect.min;

        if let Some(range) = self.view.handle_input(&response, self.viewport, origin) {
            self.notify(Axis::X, range);
        }
        let events = self.pointer_events(ui, &response, origin);

        let painter = ui.painter_at(total_rect);
        let plot_rect = self.plot_rect(origin);
        let clipped = painter.with_clip_rect(plot_rect);
        for layer in self.layers.clone() {
            if layer == MAIN_LAYER {
                self.paint_main(&painter, &clipped, plot_rect, theme);
            }
            // The readout may extend into the margins; everything else stays inside the plot.
            let target = if layer == TEXT_OVERLAY_LAYER { &painter } else { &clipped };
            self.paint_items(target, layer, origin, theme);
        }
        events
    }

    fn plot_rect(&self, origin: egui::Pos2) -> egui::Rect {
        let v = self.viewport;
        egui::Rect::from_min_size(
            origin + egui::vec2(v.left, v.top),
            egui::vec2(v.width, v.height),
        )
    }

    fn pointer_events(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        origin: egui::Pos2,
    ) -> Vec<PointerEvent> {
        let local = |p: egui::Pos2| ScreenPos::new(p.x - origin.x, p.y - origin.y);
        let pointer = if self.pressing {
            response.interact_pointer_pos().or(response.hover_pos()).map(local)
        } else {
            response.hover_pos().map(local)
        };
        let (pressed, released) = ui.input(|i| (i.pointer.primary_pressed(), i.pointer.primary_released()));

        let mut events = Vec::new();
        match (self.hovered, pointer) {
            (false, Some(pos)) => {
                self.hovered = true;
                events.push(PointerEvent::Enter(pos));
            }
            (true, Some(pos)) if self.last_pointer != Some(pos) => events.push(PointerEvent::Move(pos)),
            (true, None) if !self.pressing => {
                self.hovered = false;
                events.push(PointerEvent::Leave);
            }
            _ => {}
        }

        if let Some(pos) = pointer {
            if pressed && response.hovered() {
                self.pressing = true;
                events.push(PointerEvent::Press(pos));
            } else if released && self.pressing {
                self.pressing = false;
                events.push(PointerEvent::Release(pos));
            }
        } else if released && self.pressing {
            self.pressing = false;
            if let Some(pos) = self.last_pointer {
                events.push(PointerEvent::Release(pos));
            }
        }

        self.last_pointer = pointer.or(self.last_pointer);
        events
    }

    fn to_screen(&self, position: ItemPosition, origin: egui::Pos2) -> egui::Pos2 {
        let p = match position {
            ItemPosition::Plot { x, y } => self.view.data_to_screen(x, y, self.viewport),
            ItemPosition::Pixel(p) => p,
        };
        origin + egui::vec2(p.x, p.y)
    }

    fn paint_main(
        &self,
        painter: &egui::Painter,
        clipped: &egui::Painter,
        plot_rect: egui::Rect,
        theme: &Theme,
    ) {
        let origin = plot_rect.min - egui::vec2(self.viewport.left, self.viewport.top);
        painter.rect_filled(plot_rect, 0.0, theme.plot_bg());

        for map in &self.color_maps {
            self.paint_color_map(clipped, map, origin, theme);
        }

        let grid_stroke = egui::Stroke::new(1.0, theme.grid_color());
        let pv = &self.view;
        let x_grid = plot_interaction::compute_grid_lines(pv.x_min, pv.x_max);
        let y_grid = plot_interaction::compute_grid_lines(pv.y_min, pv.y_max);
        for &(xval, _) in x_grid.iter().filter(|(_, major)| *major) {
            let x = self.to_screen(ItemPosition::plot(xval, pv.y_min), origin).x;
            clipped.vline(x, plot_rect.y_range(), grid_stroke);
        }
        for &(yval, _) in y_grid.iter().filter(|(_, major)| *major) {
            let y = self.to_screen(ItemPosition::plot(pv.x_min, yval), origin).y;
            clipped.hline(plot_rect.x_range(), y, grid_stroke);
        }

        // Roughly two points per pixel is enough for a line trace.
        let max_points = (plot_rect.width() * 2.0).max(3.0) as usize;
        for graph in &self.graphs {
            let (xs, ys) = downsampling::downsample_for_view(
                &graph.x,
                &graph.y,
                (pv.x_min, pv.x_max),
                max_points,
            );
            let points: Vec<egui::Pos2> = xs
                .iter()
                .zip(&ys)
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|(&x, &y)| self.to_screen(ItemPosition::plot(x, y), origin))
                .collect();
            if points.len() >= 2 {
                clipped.add(egui::Shape::line(
                    points,
                    egui::Stroke::new(graph.line_width, color32(graph.color)),
                ));
            }
        }

        self.paint_axes(painter, plot_rect, &x_grid, &y_grid, origin);
        self.paint_legend(painter, plot_rect);
    }

    fn paint_color_map(&self, painter: &egui::Painter, map: &ColorMapField, origin: egui::Pos2, theme: &Theme) {
        let (columns, rows) = (map.columns(), map.rows());
        if columns == 0 || rows == 0 {
            return;
        }
        let (low, high) = theme.field_gradient();
        let dx = map.x_range.span() / columns as f64;
        let dy = map.y_range.span() / rows as f64;

        let mut mesh = egui::Mesh::default();
        for (ix, column) in map.cells.iter().enumerate() {
            let x0 = map.x_range.lower + ix as f64 * dx;
            for (iy, &value) in column.iter().enumerate() {
                let y0 = map.y_range.lower + iy as f64 * dy;
                let t = gradient_fraction(value, map.data_range);
                let rect = egui::Rect::from_two_pos(
                    self.to_screen(ItemPosition::plot(x0, y0), origin),
                    self.to_screen(ItemPosition::plot(x0 + dx, y0 + dy), origin),
                );
                mesh.add_colored_rect(rect, lerp_color(low, high, t));
            }
        }
        painter.add(egui::Shape::mesh(mesh));
    }

    fn paint_axes(
        &self,
        painter: &egui::Painter,
        plot_rect: egui::Rect,
        x_grid: &[(f64, bool)],
        y_grid: &[(f64, bool)],
        origin: egui::Pos2,
    ) {
        let text_color = painter.ctx().style().visuals.text_color();
        let dim_color = text_color.gamma_multiply(0.6);
        let font = egui::FontId::proportional(TICK_FONT);
        let pv = &self.view;

        painter.rect_stroke(plot_rect, 0.0, egui::Stroke::new(1.0, dim_color), egui::StrokeKind::Outside);

        for &(xval, _) in x_grid.iter().filter(|(_, major)| *major) {
            let x = self.to_screen(ItemPosition::plot(xval, pv.y_min), origin).x;
            painter.text(
                egui::pos2(x, plot_rect.bottom() + 3.0),
                egui::Align2::CENTER_TOP,
                plot_interaction::format_general(xval),
                font.clone(),
                dim_color,
            );
        }
        for &(yval, _) in y_grid.iter().filter(|(_, major)| *major) {
            let y = self.to_screen(ItemPosition::plot(pv.x_min, yval), origin).y;
            painter.text(
                egui::pos2(plot_rect.left() - 4.0, y),
                egui::Align2::RIGHT_CENTER,
                plot_interaction::format_general(yval),
                font.clone(),
                dim_color,
            );
        }

        if let Some((title, range)) = &self.top_axis {
            // The top axis shows its own range mapped across the full width.
            let span = range.span();
            for (tval, _) in plot_interaction::compute_grid_lines(range.lower, range.upper)
                .into_iter()
                .filter(|(_, major)| *major)
            {
                let t = if span > 0.0 { ((tval - range.lower) / span) as f32 } else { 0.0 };
                let x = plot_rect.left() + t * plot_rect.width();
                painter.text(
                    egui::pos2(x, plot_rect.top() - 2.0),
                    egui::Align2::CENTER_BOTTOM,
                    plot_interaction::format_general(tval),
                    font.clone(),
                    dim_color,
                );
            }
            painter.text(
                egui::pos2(plot_rect.center().x, plot_rect.top() - TOP_AXIS_MARGIN + TOP_MARGIN),
                egui::Align2::CENTER_TOP,
                title,
                egui::FontId::proportional(TICK_FONT + 1.0),
                text_color,
            );
        }
    }

    fn paint_legend(&self, painter: &egui::Painter, plot_rect: egui::Rect) {
        let named: Vec<&LineGraph> = self.graphs.iter().filter(|g| !g.name.is_empty()).collect();
        if named.is_empty() {
            return;
        }
        let font = egui::FontId::proportional(TICK_FONT);
        let text_color = painter.ctx().style().visuals.text_color();
        let row_h = TICK_FONT + 4.0;
        let swatch = 10.0;

        let width = named
            .iter()
            .map(|g| painter.layout_no_wrap(g.name.clone(), font.clone(), text_color).size().x)
            .fold(0.0f32, f32::max)
            + swatch
            + 12.0;
        let bg = egui::Rect::from_min_size(
            egui::pos2(plot_rect.right() - width - 6.0, plot_rect.top() + 6.0),
            egui::vec2(width, row_h * named.len() as f32 + 4.0),
        );
        let fill = painter.ctx().style().visuals.window_fill.gamma_multiply(0.9);
        painter.rect_filled(bg, 3.0, fill);

        for (i, graph) in named.iter().enumerate() {
            let y = bg.top() + 2.0 + row_h * i as f32 + row_h / 2.0;
            let sw = egui::Rect::from_center_size(egui::pos2(bg.left() + 4.0 + swatch / 2.0, y), egui::vec2(swatch, swatch));
            painter.rect_filled(sw, 1.0, color32(graph.color));
            painter.text(
                egui::pos2(sw.right() + 4.0, y),
                egui::Align2::LEFT_CENTER,
                &graph.name,
                font.clone(),
                text_color,
            );
        }
    }

    fn paint_items(&self, painter: &egui::Painter, layer: &str, origin: egui::Pos2, theme: &Theme) {
        for item in self.items.values().filter(|i| i.visible && i.layer == layer) {
            let stroke = item
                .style
                .stroke
                .map(|c| egui::Stroke::new(1.0, color32(c)))
                .unwrap_or(egui::Stroke::NONE);
            match &item.shape {
                OverlayShape::Line { start, end } => {
                    let points = [self.to_screen(*start, origin), self.to_screen(*end, origin)];
                    if item.style.dotted {
                        painter.extend(egui::Shape::dashed_line(&points, stroke, 2.0, 2.0));
                    } else {
                        painter.line_segment(points, stroke);
                    }
                }
                OverlayShape::Rect { top_left, bottom_right } => {
                    let rect = egui::Rect::from_two_pos(
                        self.to_screen(*top_left, origin),
                        self.to_screen(*bottom_right, origin),
                    );
                    if let Some(fill) = item.style.fill {
                        painter.rect_filled(rect, 0.0, color32(fill));
                    }
                    if stroke != egui::Stroke::NONE {
                        painter.rect_stroke(rect, 0.0, stroke, egui::StrokeKind::Inside);
                    }
                }
                OverlayShape::Text { position, text, font_size } => {
                    painter.text(
                        self.to_screen(*position, origin),
                        egui::Align2::LEFT_TOP,
                        text,
                        egui::FontId::proportional(*font_size),
                        theme.label_color(),
                    );
                }
            }
        }
    }
}

/// Position of `value` along the colour gradient of `data_range`, in `[0, 1]`.
/// Reversed bounds are swapped first.
fn gradient_fraction(value: f64, data_range: AxisRange) -> f32 {
    let range = data_range.normalized();
    let span = range.span();
    if span > 0.0 {
        ((value - range.lower) / span).clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

fn lerp_color(a: egui::Color32, b: egui::Color32, t: f32) -> egui::Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    egui::Color32::from_rgba_unmultiplied(
        mix(a.r(), b.r()),
        mix(a.g(), b.g()),
        mix(a.b(), b.b()),
        mix(a.a(), b.a()),
    )
}

impl PlotSurface for EguiSurface {
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
        self.notify(Axis::X, range);
    }

    fn set_y_range(&mut self, range: AxisRange) {
        self.view.set_y_range(range);
        self.notify(Axis::Y, range);
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
            .map_or(self.layers.len(), |i| i + 1);
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
        let font = egui::FontId::proportional(font_size);
        match &self.ctx {
            Some(ctx) => {
                let size = ctx.fonts(|f| f.layout_no_wrap(text.to_owned(), font, egui::Color32::WHITE).size());
                ScreenSize {
                    width: size.x,
                    height: size.y,
                }
            }
            // Not shown yet: estimate from the character count.
            None => ScreenSize {
                width: text.chars().count() as f32 * font_size * 0.6,
                height: self.line_height(font_size),
            },
        }
    }

    fn line_height(&self, font_size: f32) -> f32 {
        let font = egui::FontId::proportional(font_size);
        match &self.ctx {
            Some(ctx) => ctx.fonts(|f| f.row_height(&font)),
            None => font_size * 1.2,
        }
    }

    fn replot_layer(&mut self, _name: &str) {
        self.request_repaint();
    }

    fn replot(&mut self) {
        self.request_repaint();
    }
}
