use crate::engine::registry::{PlotRegistry, SelectionPhase, SelectionRect};
use crate::render::surface::{
    AxisRange, ItemPosition, ItemStyle, OverlayItem, PlotSurface, ScreenPos, SurfaceId, MAIN_LAYER,
};
use crate::state::theme::{CURSOR_COLOR, CURSOR_FILL};

/// Drag-to-select gesture on one visualizer's primary surface.
///
/// The rectangle itself lives in the registry, so a press on any visualizer
/// sharing the registry replaces whatever selection exists.
#[derive(Debug, Clone, Copy)]
pub struct SelectionController {
    primary: SurfaceId,
    dragging: bool,
}

impl SelectionController {
    pub fn new(primary: SurfaceId) -> Self {
        Self {
            primary,
            dragging: false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Start a selection at `pos`. Presses outside the primary's viewport only
    /// clear the previous selection.
    pub fn on_press(&mut self, registry: &mut PlotRegistry, pos: ScreenPos) {
        if registry.discard_selection() {
            registry.replot_all();
        }
        self.dragging = false;

        let Some(handle) = registry.surface(self.primary) else {
            return;
        };
        let selection = {
            let mut surface = handle.borrow_mut();
            if !surface.viewport().contains(pos) {
                return;
            }
            let x = surface.pixel_to_x(pos.x);
            let y = surface.y_range();
            let mut item = OverlayItem::rect(
                MAIN_LAYER,
                ItemStyle {
                    stroke: Some(CURSOR_COLOR),
                    fill: Some(CURSOR_FILL),
                    dotted: false,
                },
            );
            item.set_rect(ItemPosition::plot(x, y.upper), ItemPosition::plot(x, y.lower));
            item.visible = true;
            let id = surface.add_item(item);
            surface.replot();
            SelectionRect {
                owner: self.primary,
                item: id,
                top_left: (x, y.upper),
                bottom_right: (x, y.lower),
                phase: SelectionPhase::Selecting,
            }
        };

        tracing::debug!("Selection started at x={} on {:?}", selection.top_left.0, self.primary);
        registry.set_selection(selection);
        self.dragging = true;
    }

    /// Extend the selection being dragged to the pointer's x.
    pub fn on_drag(&mut self, registry: &mut PlotRegistry, pos: ScreenPos) {
        if self.dragging {
            self.move_edge(registry, pos);
        }
    }

    /// Finish the drag. The selection stays until cleared or zoomed to.
    pub fn on_release(&mut self, registry: &mut PlotRegistry, pos: ScreenPos) {
        if !self.dragging {
            return;
        }
        self.dragging = false;
        self.move_edge(registry, pos);
        if let Some(selection) = registry.selection_mut() {
            if selection.owner == self.primary {
                selection.phase = SelectionPhase::Committed;
                tracing::debug!("Selection committed: {:?}", selection.range());
            }
        }
    }

    fn move_edge(&self, registry: &mut PlotRegistry, pos: ScreenPos) {
        let Some(selection) = registry.selection() else {
            return;
        };
        if selection.owner != self.primary {
            return;
        }
        let Some(handle) = registry.surface(self.primary) else {
            return;
        };

        let x = {
            let mut surface = handle.borrow_mut();
            let x = surface.pixel_to_x(pos.x);
            let top_left = ItemPosition::plot(selection.top_left.0, selection.top_left.1);
            let bottom_right = ItemPosition::plot(x, selection.bottom_right.1);
            if let Some(item) = surface.item_mut(selection.item) {
                item.set_rect(top_left, bottom_right);
            }
            surface.replot();
            x
        };

        if let Some(selection) = registry.selection_mut() {
            selection.bottom_right.0 = x;
        }
    }

    /// `(lower, upper)` of the live selection, or `(0, 0)` when there is none.
    pub fn selection_range(registry: &PlotRegistry) -> (f64, f64) {
        registry
            .selection()
            .map(|s| {
                let r = s.range();
                (r.lower, r.upper)
            })
            .unwrap_or((0.0, 0.0))
    }

    pub fn phase(registry: &PlotRegistry) -> SelectionPhase {
        registry.selection().map(|s| s.phase).unwrap_or(SelectionPhase::Idle)
    }

    /// Remove the selection rectangle and redraw every surface.
    pub fn clear_selection(registry: &mut PlotRegistry) {
        if registry.discard_selection() {
            tracing::debug!("Selection cleared");
        }
        registry.replot_all();
    }

    /// Zoom the primary's x axis to the live selection, then clear it.
    /// Linked surfaces follow through the axis synchronizer.
    pub fn zoom_to_selection(&mut self, registry: &mut PlotRegistry) -> Option<AxisRange> {
        let Some(selection) = registry.selection() else {
            tracing::warn!("Zoom to selection requested without a selection");
            return None;
        };
        let range = selection.range();
        let handle = registry.surface(self.primary)?;
        {
            let mut surface = handle.borrow_mut();
            surface.set_x_range(range);
            surface.replot();
        }
        tracing::debug!("Zoomed {:?} to {:?}", self.primary, range);

        self.dragging = false;
        Self::clear_selection(registry);
        registry.propagate_range_changes();
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSurface;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn primary() -> (PlotRegistry, Rc<RefCell<MockSurface>>, SelectionController) {
        let mut registry = PlotRegistry::new();
        let surface = MockSurface::shared(AxisRange::new(0.0, 10.0), AxisRange::new(-1.0, 1.0));
        let id = registry.register(surface.clone());
        (registry, surface, SelectionController::new(id))
    }

    #[test]
    fn drag_builds_and_commits_a_rect() {
        let (mut registry, surface, mut ctl) = primary();
        ctl.on_press(&mut registry, ScreenPos::new(60.0, 20.0));
        assert_eq!(SelectionController::phase(&registry), SelectionPhase::Selecting);
        assert_eq!(SelectionController::selection_range(&registry), (6.0, 6.0));

        ctl.on_drag(&mut registry, ScreenPos::new(20.0, 20.0));
        ctl.on_release(&mut registry, ScreenPos::new(30.0, 25.0));

        assert_eq!(SelectionController::phase(&registry), SelectionPhase::Committed);
        assert_eq!(SelectionController::selection_range(&registry), (3.0, 6.0));
        let selection = registry.selection().unwrap();
        assert_eq!(selection.top_left, (6.0, 1.0));
        assert_eq!(selection.bottom_right, (3.0, -1.0));

        let mock = surface.borrow();
        let item = mock.item_ref(selection.item).unwrap();
        assert_eq!(item.layer, MAIN_LAYER);
        assert!(item.visible);
        // press, drag and release each replot everything.
        assert_eq!(mock.full_replots, 3);
    }

    #[test]
    fn press_outside_viewport_only_clears() {
        let (mut registry, _surface, mut ctl) = primary();
        ctl.on_press(&mut registry, ScreenPos::new(10.0, 10.0));
        ctl.on_release(&mut registry, ScreenPos::new(40.0, 10.0));
        ctl.on_press(&mut registry, ScreenPos::new(150.0, 10.0));
        assert!(registry.selection().is_none());
        assert!(!ctl.is_dragging());
        assert_eq!(SelectionController::selection_range(&registry), (0.0, 0.0));
    }

    #[test]
    fn drag_past_the_edge_keeps_converting() {
        let (mut registry, _surface, mut ctl) = primary();
        ctl.on_press(&mut registry, ScreenPos::new(50.0, 10.0));
        ctl.on_release(&mut registry, ScreenPos::new(150.0, 10.0));
        assert_eq!(SelectionController::selection_range(&registry), (5.0, 15.0));
    }

    #[test]
    fn one_selection_across_visualizers() {
        let mut registry = PlotRegistry::new();
        let a = MockSurface::shared(AxisRange::new(0.0, 10.0), AxisRange::new(0.0, 1.0));
        let b = MockSurface::shared(AxisRange::new(0.0, 10.0), AxisRange::new(0.0, 1.0));
        let mut ctl_a = SelectionController::new(registry.register(a.clone()));
        let mut ctl_b = SelectionController::new(registry.register(b.clone()));

        ctl_a.on_press(&mut registry, ScreenPos::new(10.0, 10.0));
        ctl_a.on_release(&mut registry, ScreenPos::new(40.0, 10.0));
        ctl_b.on_press(&mut registry, ScreenPos::new(70.0, 10.0));
        ctl_b.on_release(&mut registry, ScreenPos::new(90.0, 10.0));

        assert_eq!(a.borrow().visible_items_on(MAIN_LAYER), 0);
        assert_eq!(b.borrow().visible_items_on(MAIN_LAYER), 1);
        assert_eq!(SelectionController::selection_range(&registry), (7.0, 9.0));

        // A release on the other visualizer does not touch b's rectangle.
        ctl_a.on_release(&mut registry, ScreenPos::new(0.0, 10.0));
        assert_eq!(SelectionController::selection_range(&registry), (7.0, 9.0));
    }

    #[test]
    fn zoom_round_trip_sets_range_and_clears() {
        let mut registry = PlotRegistry::new();
        let a = MockSurface::shared(AxisRange::new(0.0, 10.0), AxisRange::new(0.0, 1.0));
        let b = MockSurface::shared(AxisRange::new(0.0, 10.0), AxisRange::new(0.0, 1.0));
        let id_a = registry.register(a.clone());
        let id_b = registry.register(b.clone());
        registry.link_x_axes(&[id_a, id_b]);
        let mut ctl = SelectionController::new(id_a);

        ctl.on_press(&mut registry, ScreenPos::new(80.0, 10.0));
        ctl.on_release(&mut registry, ScreenPos::new(20.0, 10.0));
        assert_eq!(ctl.zoom_to_selection(&mut registry), Some(AxisRange::new(2.0, 8.0)));

        assert_eq!(a.borrow().x_range(), AxisRange::new(2.0, 8.0));
        assert_eq!(b.borrow().x_range(), AxisRange::new(2.0, 8.0));
        assert!(registry.selection().is_none());
        assert_eq!(SelectionController::selection_range(&registry), (0.0, 0.0));
        assert_eq!(a.borrow().visible_items_on(MAIN_LAYER), 0);
    }

    #[test]
    fn zoom_without_selection_is_a_no_op() {
        let (mut registry, surface, mut ctl) = primary();
        assert_eq!(ctl.zoom_to_selection(&mut registry), None);
        assert_eq!(surface.borrow().x_sets, 0);
    }

    #[test]
    fn clear_replots_every_surface() {
        let (mut registry, surface, mut ctl) = primary();
        let other = MockSurface::shared(AxisRange::new(0.0, 1.0), AxisRange::new(0.0, 1.0));
        registry.register(other.clone());
        ctl.on_press(&mut registry, ScreenPos::new(10.0, 10.0));
        SelectionController::clear_selection(&mut registry);
        assert!(registry.selection().is_none());
        assert_eq!(surface.borrow().visible_items_on(MAIN_LAYER), 0);
        assert_eq!(other.borrow().full_replots, 1);
    }
}
