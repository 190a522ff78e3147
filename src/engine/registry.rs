use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::axis_sync::AxisSynchronizer;
use crate::render::surface::{
    AxisRange, ItemId, ItemPosition, ItemStyle, OverlayItem, SurfaceHandle, SurfaceId, MAIN_LAYER,
    OVERLAY_LAYER, TEXT_OVERLAY_LAYER,
};
use crate::state::theme::{trace_color, CURSOR_COLOR};

/// Registry shared by every visualizer that should show a common cursor.
pub type SharedRegistry = Rc<RefCell<PlotRegistry>>;

/// How the cursor engine derives the readout value on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SurfaceKind {
    /// Line traces: the value is interpolated from the tracked channel.
    #[default]
    Signal,
    /// Dense 2-D field (spectrogram): the value is the pointer's y coordinate.
    DenseField,
}

/// The vertical cursor line drawn on one surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalGuide {
    pub item: ItemId,
    pub x: f64,
    pub span: AxisRange,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    Idle,
    Selecting,
    Committed,
}

/// The live zoom selection. Corners are `(x, y)` in the owner's data space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    pub owner: SurfaceId,
    pub item: ItemId,
    pub top_left: (f64, f64),
    pub bottom_right: (f64, f64),
    pub phase: SelectionPhase,
}

impl SelectionRect {
    /// Selected x interval with `lower <= upper`.
    pub fn range(&self) -> AxisRange {
        AxisRange::new(self.top_left.0, self.bottom_right.0).normalized()
    }
}

/// Trace colours memoised per key so the same channel of the same
/// configuration keeps its colour across visualizers and redraws.
#[derive(Debug, Clone, Default)]
pub struct ColorBook {
    assigned: HashMap<String, [u8; 4]>,
}

impl ColorBook {
    pub fn color_for(&mut self, key: &str) -> [u8; 4] {
        let next = self.assigned.len();
        *self
            .assigned
            .entry(key.to_string())
            .or_insert_with(|| trace_color(next))
    }
}

struct RegisteredSurface {
    id: SurfaceId,
    handle: SurfaceHandle,
    kind: SurfaceKind,
    guide: VerticalGuide,
}

/// Table of live plot surfaces, their vertical guides and the single
/// selection rectangle.
pub struct PlotRegistry {
    surfaces: Vec<RegisteredSurface>,
    next_id: u64,
    selection: Option<SelectionRect>,
    hovered: Option<SurfaceId>,
    sync: AxisSynchronizer,
    colors: ColorBook,
}

impl PlotRegistry {
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
            next_id: 1,
            selection: None,
            hovered: None,
            sync: AxisSynchronizer::new(),
            colors: ColorBook::default(),
        }
    }

    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Add a surface: ensure its overlay layers, create its hidden vertical guide.
    pub fn register(&mut self, handle: SurfaceHandle) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;

        let guide = {
            let mut surface = handle.borrow_mut();
            if !surface.has_layer(OVERLAY_LAYER) {
                surface.add_layer_above(OVERLAY_LAYER, MAIN_LAYER);
            }
            if !surface.has_layer(TEXT_OVERLAY_LAYER) {
                surface.add_layer_above(TEXT_OVERLAY_LAYER, OVERLAY_LAYER);
            }
            let style = ItemStyle {
                stroke: Some(CURSOR_COLOR),
                fill: None,
                dotted: true,
            };
            let item = surface.add_item(OverlayItem::line(OVERLAY_LAYER, style));
            VerticalGuide {
                item,
                x: 0.0,
                span: surface.y_range(),
                visible: false,
            }
        };

        self.surfaces.push(RegisteredSurface {
            id,
            handle,
            kind: SurfaceKind::Signal,
            guide,
        });
        tracing::debug!("Registered plot surface {:?} ({} live)", id, self.surfaces.len());
        id
    }

    /// Remove a surface and its guide. A selection drawn on it is discarded.
    pub fn unregister(&mut self, id: SurfaceId) -> bool {
        if self.selection.map(|s| s.owner) == Some(id) {
            self.discard_selection();
        }
        self.sync.unlink(id);
        if self.hovered == Some(id) {
            self.hovered = None;
        }

        let Some(pos) = self.surfaces.iter().position(|s| s.id == id) else {
            return false;
        };
        let entry = self.surfaces.remove(pos);
        entry.handle.borrow_mut().remove_item(entry.guide.item);
        tracing::debug!("Unregistered plot surface {:?} ({} live)", id, self.surfaces.len());
        true
    }

    pub fn contains(&self, id: SurfaceId) -> bool {
        self.entry(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Ids in registration order.
    pub fn ids(&self) -> Vec<SurfaceId> {
        self.surfaces.iter().map(|s| s.id).collect()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<SurfaceHandle> {
        self.entry(id).map(|s| Rc::clone(&s.handle))
    }

    pub fn kind(&self, id: SurfaceId) -> Option<SurfaceKind> {
        self.entry(id).map(|s| s.kind)
    }

    pub fn set_kind(&mut self, id: SurfaceId, kind: SurfaceKind) {
        if let Some(entry) = self.entry_mut(id) {
            entry.kind = kind;
        }
    }

    /// Surface the pointer was last seen over, if it has not left since.
    pub fn hovered(&self) -> Option<SurfaceId> {
        self.hovered
    }

    pub fn set_hovered(&mut self, id: Option<SurfaceId>) {
        self.hovered = id;
    }

    pub fn guide(&self, id: SurfaceId) -> Option<VerticalGuide> {
        self.entry(id).map(|s| s.guide)
    }

    /// Place and show the vertical guide of one surface at `x`, spanning its y range.
    pub fn show_vertical_line(&mut self, id: SurfaceId, x: f64) {
        if let Some(entry) = self.entry_mut(id) {
            place_guide(entry, x);
        }
    }

    /// Show every guide at `x` and redraw each surface's overlay layer.
    pub fn broadcast_vertical_line(&mut self, x: f64) {
        for entry in &mut self.surfaces {
            place_guide(entry, x);
            entry.handle.borrow_mut().replot_layer(OVERLAY_LAYER);
        }
    }

    pub fn hide_all_vertical_lines(&mut self) {
        for entry in &mut self.surfaces {
            entry.guide.visible = false;
            if let Some(item) = entry.handle.borrow_mut().item_mut(entry.guide.item) {
                item.visible = false;
            }
        }
    }

    /// Request an overlay-layer redraw on every surface.
    pub fn replot_overlays(&self) {
        for entry in &self.surfaces {
            entry.handle.borrow_mut().replot_layer(OVERLAY_LAYER);
        }
    }

    /// Full redraw of every surface.
    pub fn replot_all(&self) {
        for entry in &self.surfaces {
            entry.handle.borrow_mut().replot();
        }
    }

    pub fn selection(&self) -> Option<SelectionRect> {
        self.selection
    }

    pub fn selection_mut(&mut self) -> Option<&mut SelectionRect> {
        self.selection.as_mut()
    }

    /// Install a new selection. Any previous one is discarded first.
    pub fn set_selection(&mut self, selection: SelectionRect) {
        self.discard_selection();
        self.selection = Some(selection);
    }

    /// Remove the selection rectangle from its surface. Returns true if one existed.
    pub fn discard_selection(&mut self) -> bool {
        let Some(selection) = self.selection.take() else {
            return false;
        };
        if let Some(handle) = self.surface(selection.owner) {
            handle.borrow_mut().remove_item(selection.item);
        }
        true
    }

    pub fn sync(&self) -> &AxisSynchronizer {
        &self.sync
    }

    /// Lock the x axes of the given surfaces together. Unknown ids are skipped.
    pub fn link_x_axes(&mut self, ids: &[SurfaceId]) -> bool {
        let known: Vec<SurfaceId> = ids.iter().copied().filter(|id| self.contains(*id)).collect();
        self.sync.link_x_axes(&known)
    }

    /// Lock the y axis of `reference` with each of `others`. Unknown ids are skipped.
    pub fn link_y_axes(&mut self, reference: SurfaceId, others: &[SurfaceId]) -> bool {
        if !self.contains(reference) {
            return false;
        }
        let known: Vec<SurfaceId> = others.iter().copied().filter(|id| self.contains(*id)).collect();
        self.sync.link_y_axes(reference, &known)
    }

    /// Forward pending range changes to linked surfaces. Returns the number of forced updates.
    pub fn propagate_range_changes(&self) -> usize {
        let handles: Vec<(SurfaceId, SurfaceHandle)> = self
            .surfaces
            .iter()
            .map(|s| (s.id, Rc::clone(&s.handle)))
            .collect();
        self.sync.propagate(&handles)
    }

    pub fn colors_mut(&mut self) -> &mut ColorBook {
        &mut self.colors
    }

    fn entry(&self, id: SurfaceId) -> Option<&RegisteredSurface> {
        self.surfaces.iter().find(|s| s.id == id)
    }

    fn entry_mut(&mut self, id: SurfaceId) -> Option<&mut RegisteredSurface> {
        self.surfaces.iter_mut().find(|s| s.id == id)
    }
}

impl Default for PlotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn place_guide(entry: &mut RegisteredSurface, x: f64) {
    let mut surface = entry.handle.borrow_mut();
    let span = surface.y_range();
    entry.guide.x = x;
    entry.guide.span = span;
    entry.guide.visible = true;
    if let Some(item) = surface.item_mut(entry.guide.item) {
        item.set_line(ItemPosition::plot(x, span.lower), ItemPosition::plot(x, span.upper));
        item.visible = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::{OverlayShape, PlotSurface};
    use crate::testing::MockSurface;

    #[test]
    fn register_creates_layers_and_hidden_guide() {
        let mut registry = PlotRegistry::new();
        let surface = MockSurface::shared(AxisRange::new(0.0, 10.0), AxisRange::new(-1.0, 1.0));
        let id = registry.register(surface.clone());

        let mock = surface.borrow();
        assert_eq!(mock.layers, vec![MAIN_LAYER, OVERLAY_LAYER, TEXT_OVERLAY_LAYER]);
        let guide = registry.guide(id).unwrap();
        assert!(!guide.visible);
        let item = mock.item_ref(guide.item).unwrap();
        assert_eq!(item.layer, OVERLAY_LAYER);
        assert!(!item.visible);
        assert_eq!(registry.kind(id), Some(SurfaceKind::Signal));
    }

    #[test]
    fn layers_are_created_once_per_surface() {
        let surface = MockSurface::shared(AxisRange::new(0.0, 1.0), AxisRange::new(0.0, 1.0));
        let mut a = PlotRegistry::new();
        let mut b = PlotRegistry::new();
        a.register(surface.clone());
        b.register(surface.clone());
        assert_eq!(surface.borrow().layers.len(), 3);
    }

    #[test]
    fn broadcast_spans_each_surface_y_range() {
        let mut registry = PlotRegistry::new();
        let spans = [
            AxisRange::new(-1.0, 1.0),
            AxisRange::new(0.0, 5000.0),
            AxisRange::new(10.0, 20.0),
        ];
        let surfaces: Vec<_> = spans
            .iter()
            .map(|&y| MockSurface::shared(AxisRange::new(0.0, 10.0), y))
            .collect();
        let ids: Vec<_> = surfaces.iter().map(|s| registry.register(s.clone())).collect();

        registry.broadcast_vertical_line(2.5);

        for ((id, surface), span) in ids.iter().zip(&surfaces).zip(spans) {
            let guide = registry.guide(*id).unwrap();
            assert!(guide.visible);
            assert_eq!(guide.x, 2.5);
            assert_eq!(guide.span, span);

            let mock = surface.borrow();
            let item = mock.item_ref(guide.item).unwrap();
            assert!(item.visible);
            assert_eq!(
                item.shape,
                OverlayShape::Line {
                    start: ItemPosition::plot(2.5, span.lower),
                    end: ItemPosition::plot(2.5, span.upper),
                }
            );
            assert_eq!(mock.layer_replots(OVERLAY_LAYER), 1);
            assert_eq!(mock.full_replots, 0);
        }

        registry.hide_all_vertical_lines();
        assert!(ids.iter().all(|id| !registry.guide(*id).unwrap().visible));
    }

    #[test]
    fn unregister_removes_guide_and_owned_selection() {
        let mut registry = PlotRegistry::new();
        let surface = MockSurface::shared(AxisRange::new(0.0, 10.0), AxisRange::new(0.0, 1.0));
        let id = registry.register(surface.clone());
        let guide_item = registry.guide(id).unwrap().item;
        let rect_item = surface
            .borrow_mut()
            .add_item(OverlayItem::rect(MAIN_LAYER, ItemStyle::default()));
        registry.set_selection(SelectionRect {
            owner: id,
            item: rect_item,
            top_left: (1.0, 1.0),
            bottom_right: (2.0, 0.0),
            phase: SelectionPhase::Committed,
        });

        assert!(registry.unregister(id));
        assert!(registry.selection().is_none());
        assert!(registry.is_empty());
        assert!(surface.borrow().item_ref(guide_item).is_none());
        assert!(surface.borrow().item_ref(rect_item).is_none());
        assert!(!registry.unregister(id));
    }

    #[test]
    fn color_book_is_stable_per_key() {
        let mut book = ColorBook::default();
        let a = book.color_for("AccelX");
        let b = book.color_for("AccelY");
        assert_ne!(a, b);
        assert_eq!(book.color_for("AccelX"), a);
    }
}
