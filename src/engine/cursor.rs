use crate::config::ViewerConfig;
use crate::engine::registry::{PlotRegistry, SurfaceKind};
use crate::render::plot_interaction::format_general;
use crate::render::surface::{
    ItemId, ItemPosition, ItemStyle, OverlayItem, PlotSurface, ScreenPos, SurfaceHandle, SurfaceId,
    OVERLAY_LAYER, TEXT_OVERLAY_LAYER,
};
use crate::state::signal_store::SignalStore;
use crate::state::theme::{CURSOR_COLOR, CURSOR_FILL};

/// Where the cursor is and what it reads. Recomputed on every pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CursorState {
    pub position: ScreenPos,
    pub data_x: f64,
    pub value: f64,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy)]
struct ReadoutLayout {
    font_size: f32,
    padding: f32,
    offset: f32,
}

/// Cross-hair of one visualizer: the horizontal guide, coordinate label and
/// label frame live on the primary surface; vertical guides come from the registry.
pub struct CursorEngine {
    primary: SurfaceId,
    h_line: ItemId,
    coord_text: ItemId,
    coord_frame: ItemId,
    layout: ReadoutLayout,
    state: CursorState,
}

impl CursorEngine {
    /// Create the primary-only cursor items on `surface`, registered as `primary`.
    pub fn attach(primary: SurfaceId, surface: &SurfaceHandle, config: &ViewerConfig) -> Self {
        let mut surface = surface.borrow_mut();

        let guide_style = ItemStyle {
            stroke: Some(CURSOR_COLOR),
            fill: None,
            dotted: true,
        };
        let frame_style = ItemStyle {
            stroke: None,
            fill: Some(CURSOR_FILL),
            dotted: false,
        };

        let h_line = surface.add_item(OverlayItem::line(OVERLAY_LAYER, guide_style));
        let coord_frame = surface.add_item(OverlayItem::rect(OVERLAY_LAYER, frame_style));
        let coord_text = surface.add_item(OverlayItem::text(
            TEXT_OVERLAY_LAYER,
            config.font_size,
            ItemStyle::default(),
        ));

        Self {
            primary,
            h_line,
            coord_text,
            coord_frame,
            layout: ReadoutLayout {
                font_size: config.font_size,
                padding: config.frame_padding,
                offset: config.label_offset,
            },
            state: CursorState::default(),
        }
    }

    /// Remove the primary-only items from the primary surface.
    pub fn detach(&self, registry: &PlotRegistry) {
        if let Some(handle) = registry.surface(self.primary) {
            let mut surface = handle.borrow_mut();
            for id in [self.h_line, self.coord_text, self.coord_frame] {
                surface.remove_item(id);
            }
        }
    }

    pub fn primary(&self) -> SurfaceId {
        self.primary
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Track the pointer over `surface`. Unregistered surfaces are ignored.
    pub fn on_pointer_move(
        &mut self,
        registry: &mut PlotRegistry,
        store: &SignalStore,
        tracked: &str,
        surface: SurfaceId,
        pos: ScreenPos,
    ) {
        let (Some(handle), Some(kind)) = (registry.surface(surface), registry.kind(surface)) else {
            tracing::trace!("Pointer move on unregistered surface {:?}", surface);
            return;
        };

        let (x, y) = {
            let s = handle.borrow();
            let x = s.pixel_to_x(pos.x);
            let y = match kind {
                SurfaceKind::DenseField => s.pixel_to_y(pos.y),
                SurfaceKind::Signal => store.value_at(tracked, x),
            };
            (x, y)
        };

        registry.set_hovered(Some(surface));
        registry.hide_all_vertical_lines();
        registry.show_vertical_line(surface, x);

        if surface == self.primary {
            self.update_readout(&handle, pos, x, y, y + store.offset(tracked));
        }

        self.state = CursorState {
            position: pos,
            data_x: x,
            value: y,
            visible: true,
        };
        tracing::trace!("Cursor at x={x}, y={y} on {:?}", surface);

        registry.broadcast_vertical_line(x);
    }

    /// Pointer entered `surface`: update the cursor and make sure the readout shows.
    pub fn on_pointer_enter(
        &mut self,
        registry: &mut PlotRegistry,
        store: &SignalStore,
        tracked: &str,
        surface: SurfaceId,
        pos: ScreenPos,
    ) {
        if !registry.contains(surface) {
            return;
        }
        self.on_pointer_move(registry, store, tracked, surface, pos);
        if surface == self.primary {
            self.set_readout_visible(registry, true);
        }
    }

    /// Pointer left the primary: hide its readout and every vertical guide.
    /// If the pointer has already entered another surface, that surface's
    /// guides stay up.
    pub fn on_pointer_leave(&mut self, registry: &mut PlotRegistry) {
        self.set_readout_visible(registry, false);
        self.state.visible = false;
        if registry.hovered().is_some_and(|id| id != self.primary) {
            tracing::trace!("Leave from {:?} after entering {:?}", self.primary, registry.hovered());
            return;
        }
        registry.set_hovered(None);
        registry.hide_all_vertical_lines();
        registry.replot_overlays();
    }

    fn update_readout(&self, handle: &SurfaceHandle, pos: ScreenPos, x: f64, y: f64, display_y: f64) {
        let mut surface = handle.borrow_mut();
        let x_range = surface.x_range();
        let pointer_inside = surface.viewport().contains_y(pos.y);

        if let Some(line) = surface.item_mut(self.h_line) {
            if pointer_inside {
                line.set_line(
                    ItemPosition::plot(x_range.lower, display_y),
                    ItemPosition::plot(x_range.upper, display_y),
                );
            }
            line.visible = pointer_inside;
        }

        // The frame is sized to the x line; the y line is assumed no wider.
        let x_line = format!("X: {}", format_general(x));
        let text = format!("{x_line}\nY: {}", format_general(y));
        let ReadoutLayout { font_size, padding, offset } = self.layout;
        let text_width = surface.measure_text(&x_line, font_size).width;
        let frame_width = text_width + padding * 2.0;
        let frame_height = surface.line_height(font_size) * 2.0 + padding;
        let anchor_x = pos.x + offset;

        if let Some(frame) = surface.item_mut(self.coord_frame) {
            frame.set_rect(
                ItemPosition::pixel(anchor_x - padding, pos.y - padding),
                ItemPosition::pixel(anchor_x + frame_width, pos.y + frame_height),
            );
            frame.visible = true;
        }
        if let Some(label) = surface.item_mut(self.coord_text) {
            label.set_text(ItemPosition::pixel(anchor_x, pos.y), text);
            label.visible = true;
        }

        surface.replot_layer(TEXT_OVERLAY_LAYER);
    }

    fn set_readout_visible(&self, registry: &PlotRegistry, visible: bool) {
        let Some(handle) = registry.surface(self.primary) else {
            return;
        };
        let mut surface = handle.borrow_mut();
        for id in [self.coord_text, self.coord_frame] {
            if let Some(item) = surface.item_mut(id) {
                item.visible = visible;
            }
        }
        if !visible {
            if let Some(item) = surface.item_mut(self.h_line) {
                item.visible = false;
            }
        }
        surface.replot_layer(TEXT_OVERLAY_LAYER);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{AxisRange, OverlayShape, ScreenRect};
    use crate::state::signal_store::SignalSample;
    use crate::testing::MockSurface;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixture {
        registry: PlotRegistry,
        primary: Rc<RefCell<MockSurface>>,
        primary_id: SurfaceId,
        other: Rc<RefCell<MockSurface>>,
        other_id: SurfaceId,
        engine: CursorEngine,
        store: SignalStore,
    }

    fn fixture() -> Fixture {
        let mut registry = PlotRegistry::new();
        let primary = MockSurface::shared(AxisRange::new(0.0, 2.0), AxisRange::new(-20.0, 20.0));
        let other = MockSurface::shared(AxisRange::new(0.0, 2.0), AxisRange::new(0.0, 5000.0));
        let primary_id = registry.register(primary.clone());
        let other_id = registry.register(other.clone());
        let handle: SurfaceHandle = primary.clone();
        let engine = CursorEngine::attach(primary_id, &handle, &ViewerConfig::default());

        let mut store = SignalStore::new();
        store.set_channel_data(
            "X",
            vec![
                SignalSample::new(0.0, 0.0),
                SignalSample::new(1.0, 10.0),
                SignalSample::new(2.0, 0.0),
            ],
        );
        store.set_offset("X", 3.0);

        Fixture {
            registry,
            primary,
            primary_id,
            other,
            other_id,
            engine,
            store,
        }
    }

    #[test]
    fn move_on_primary_reads_interpolated_value() {
        let mut f = fixture();
        // 25 px of 100 over [0, 2] is x = 0.5.
        f.engine
            .on_pointer_move(&mut f.registry, &f.store, "X", f.primary_id, ScreenPos::new(25.0, 10.0));

        let state = f.engine.state();
        assert!(state.visible);
        assert_eq!(state.data_x, 0.5);
        assert_eq!(state.value, 5.0);

        let mock = f.primary.borrow();
        let h_line = mock.item_ref(f.engine.h_line).unwrap();
        assert!(h_line.visible);
        assert_eq!(
            h_line.shape,
            OverlayShape::Line {
                start: ItemPosition::plot(0.0, 8.0),
                end: ItemPosition::plot(2.0, 8.0),
            }
        );

        let label = mock.item_ref(f.engine.coord_text).unwrap();
        match &label.shape {
            OverlayShape::Text { text, position, .. } => {
                assert_eq!(text, "X: 0.5\nY: 5");
                assert_eq!(*position, ItemPosition::pixel(45.0, 10.0));
            }
            other => panic!("unexpected shape {other:?}"),
        }

        // "X: 0.5" is 6 chars -> 36 px wide at 10 pt, lines are 12 px.
        let frame = mock.item_ref(f.engine.coord_frame).unwrap();
        assert_eq!(
            frame.shape,
            OverlayShape::Rect {
                top_left: ItemPosition::pixel(40.0, 5.0),
                bottom_right: ItemPosition::pixel(45.0 + 46.0, 10.0 + 29.0),
            }
        );
        assert_eq!(mock.layer_replots(TEXT_OVERLAY_LAYER), 1);
    }

    #[test]
    fn move_broadcasts_guides_to_every_surface() {
        let mut f = fixture();
        f.engine
            .on_pointer_move(&mut f.registry, &f.store, "X", f.primary_id, ScreenPos::new(50.0, 10.0));
        for id in [f.primary_id, f.other_id] {
            let guide = f.registry.guide(id).unwrap();
            assert!(guide.visible);
            assert_eq!(guide.x, 1.0);
        }
        assert_eq!(f.registry.guide(f.other_id).unwrap().span, AxisRange::new(0.0, 5000.0));
        assert_eq!(f.other.borrow().layer_replots(OVERLAY_LAYER), 1);
    }

    #[test]
    fn move_on_secondary_surface_leaves_readout_alone() {
        let mut f = fixture();
        f.engine
            .on_pointer_move(&mut f.registry, &f.store, "X", f.other_id, ScreenPos::new(50.0, 10.0));
        let mock = f.primary.borrow();
        assert!(!mock.item_ref(f.engine.coord_text).unwrap().visible);
        assert!(!mock.item_ref(f.engine.h_line).unwrap().visible);
        assert!(f.registry.guide(f.primary_id).unwrap().visible);
    }

    #[test]
    fn dense_field_reads_pointer_y() {
        let mut f = fixture();
        f.registry.set_kind(f.primary_id, SurfaceKind::DenseField);
        // y = 0 px is the top of [-20, 20].
        f.engine
            .on_pointer_move(&mut f.registry, &f.store, "X", f.primary_id, ScreenPos::new(50.0, 0.0));
        assert_eq!(f.engine.state().value, 20.0);
    }

    #[test]
    fn horizontal_guide_hides_when_pointer_leaves_vertical_extent() {
        let mut f = fixture();
        f.primary.borrow_mut().viewport = ScreenRect::new(0.0, 0.0, 100.0, 50.0);
        f.engine
            .on_pointer_move(&mut f.registry, &f.store, "X", f.primary_id, ScreenPos::new(50.0, 80.0));
        assert!(!f.primary.borrow().item_ref(f.engine.h_line).unwrap().visible);
    }

    #[test]
    fn untracked_channel_reads_zero() {
        let mut f = fixture();
        f.engine
            .on_pointer_move(&mut f.registry, &f.store, "Z", f.primary_id, ScreenPos::new(25.0, 10.0));
        assert_eq!(f.engine.state().value, 0.0);
    }

    #[test]
    fn leave_hides_everything() {
        let mut f = fixture();
        f.engine
            .on_pointer_enter(&mut f.registry, &f.store, "X", f.primary_id, ScreenPos::new(25.0, 10.0));
        assert!(f.primary.borrow().item_ref(f.engine.coord_frame).unwrap().visible);

        f.engine.on_pointer_leave(&mut f.registry);
        assert!(!f.engine.state().visible);
        for surface in [&f.primary, &f.other] {
            assert_eq!(surface.borrow().visible_items_on(OVERLAY_LAYER), 0);
            assert_eq!(surface.borrow().visible_items_on(TEXT_OVERLAY_LAYER), 0);
        }
    }

    #[test]
    fn late_leave_keeps_guides_of_entered_surface() {
        let mut f = fixture();
        f.engine
            .on_pointer_enter(&mut f.registry, &f.store, "X", f.primary_id, ScreenPos::new(25.0, 10.0));
        // The pointer reaches the other surface before the primary's leave arrives.
        let other_handle: SurfaceHandle = f.other.clone();
        let mut other_engine = CursorEngine::attach(f.other_id, &other_handle, &ViewerConfig::default());
        other_engine.on_pointer_enter(&mut f.registry, &f.store, "X", f.other_id, ScreenPos::new(50.0, 10.0));
        f.engine.on_pointer_leave(&mut f.registry);

        assert_eq!(f.registry.hovered(), Some(f.other_id));
        assert!(f.registry.guide(f.other_id).unwrap().visible);
        assert!(f.registry.guide(f.primary_id).unwrap().visible);
        assert_eq!(f.primary.borrow().visible_items_on(TEXT_OVERLAY_LAYER), 0);
        assert_eq!(f.other.borrow().visible_items_on(TEXT_OVERLAY_LAYER), 1);

        other_engine.on_pointer_leave(&mut f.registry);
        assert_eq!(f.registry.hovered(), None);
        assert!(!f.registry.guide(f.other_id).unwrap().visible);
    }

    #[test]
    fn unregistered_surface_is_ignored() {
        let mut f = fixture();
        f.engine
            .on_pointer_move(&mut f.registry, &f.store, "X", SurfaceId(99), ScreenPos::new(25.0, 10.0));
        assert!(!f.engine.state().visible);
        assert!(!f.registry.guide(f.primary_id).unwrap().visible);
    }
}
