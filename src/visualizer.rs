use std::collections::BTreeMap;

use crate::config::ViewerConfig;
use crate::engine::cursor::{CursorEngine, CursorState};
use crate::engine::registry::{SelectionPhase, SharedRegistry, SurfaceKind};
use crate::engine::selection::SelectionController;
use crate::render::surface::{
    AxisRange, ColorMapField, LineGraph, PointerEvent, ScreenPos, SurfaceHandle, SurfaceId,
};
use crate::state::signal_store::{bounds, SignalChannel, SignalStore};

/// Title of the top time axis shown on audio plots.
const AUDIO_TIME_AXIS: &str = "Time (s)";
/// Configuration label that gets the secondary time axis.
const AUDIO_LABEL: &str = "Audio";

/// One kinematic plot: a primary surface with its own signal store, a
/// cross-plot cursor and drag-to-zoom selection.
///
/// All views sharing a [`SharedRegistry`] show the same vertical cursor and
/// share a single selection.
pub struct KinematicView {
    registry: SharedRegistry,
    surface: SurfaceHandle,
    primary: SurfaceId,
    store: SignalStore,
    tracked: String,
    cursor: CursorEngine,
    selection: SelectionController,
    config: ViewerConfig,
    x_limits: AxisRange,
}

impl KinematicView {
    pub fn new(registry: SharedRegistry, surface: SurfaceHandle, config: ViewerConfig) -> Self {
        let primary = registry.borrow_mut().register(surface.clone());
        let cursor = CursorEngine::attach(primary, &surface, &config);
        let x_limits = {
            let mut s = surface.borrow_mut();
            let range = s.x_range();
            s.set_top_axis(None, range);
            range
        };

        Self {
            registry,
            surface,
            primary,
            store: SignalStore::new(),
            tracked: "X".to_string(),
            cursor,
            selection: SelectionController::new(primary),
            config,
            x_limits,
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.primary
    }

    pub fn surface(&self) -> &SurfaceHandle {
        &self.surface
    }

    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    pub fn tracked_parameter(&self) -> &str {
        &self.tracked
    }

    /// Channel whose interpolated value the readout shows.
    pub fn set_tracked_parameter(&mut self, name: impl Into<String>) {
        self.tracked = name.into();
    }

    pub fn cursor_state(&self) -> CursorState {
        self.cursor.state()
    }

    /// Plot every channel as a trace, centred on the common mid-range.
    ///
    /// Each channel is shifted by `global_centre - local_centre` for display;
    /// the store keeps the unshifted samples at `x = i / sampling_rate`.
    pub fn visualize_signal(
        &mut self,
        channels: &BTreeMap<String, Vec<f64>>,
        label: &str,
        line_width: f32,
        sampling_rate: u32,
    ) {
        let rate = if sampling_rate == 0 {
            tracing::warn!("Sampling rate 0 for {label:?}; plotting one sample per second");
            1.0
        } else {
            sampling_rate as f64
        };

        self.reset_surface(SurfaceKind::Signal);
        self.store.clear();

        let (global_min, global_max) = channels
            .values()
            .filter_map(|v| finite_bounds(v))
            .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
            .unwrap_or((0.0, 0.0));
        let global_centre = (global_min + global_max) / 2.0;

        let mut max_time: f64 = 0.0;
        for (key, values) in channels {
            let Some((local_min, local_max)) = finite_bounds(values) else {
                tracing::debug!("Channel {key:?} of {label:?} has no finite samples");
                continue;
            };
            let offset = global_centre - (local_min + local_max) / 2.0;

            let mut channel = SignalChannel::from_uniform(key.as_str(), values, rate);
            channel.offset = offset;
            if let Some(last) = channel.samples.last() {
                max_time = max_time.max(last.x);
            }

            let color = self.registry.borrow_mut().colors_mut().color_for(&format!("{label}{key}"));
            let name = if label == key {
                label.to_string()
            } else {
                format!("{label} {key}")
            };
            let graph = LineGraph {
                name,
                x: channel.samples.iter().map(|s| s.x).collect(),
                y: channel.samples.iter().map(|s| s.y + offset).collect(),
                color,
                line_width,
            };
            self.surface.borrow_mut().add_line_graph(graph);
            self.store.insert(channel);
        }

        let mut padding = (global_max - global_min) * self.config.y_padding_fraction;
        if padding == 0.0 {
            padding = 1.0;
        }
        self.x_limits = AxisRange::new(0.0, max_time);
        {
            let mut surface = self.surface.borrow_mut();
            surface.set_x_range(self.x_limits);
            surface.set_x_limits(Some(self.x_limits));
            surface.set_y_range(AxisRange::new(global_min - padding, global_max + padding));
            if label == AUDIO_LABEL {
                surface.set_top_axis(Some(AUDIO_TIME_AXIS), self.x_limits);
            }
            surface.replot();
        }
        tracing::debug!(
            "Plotted {} channel(s) of {label:?} over [0, {max_time}]",
            channels.len()
        );
    }

    /// Plot a dense field over `[0, duration]` by `[0, spectrogram_max_frequency]`.
    /// `field[ix][iy]` is the cell at time column `ix`, frequency row `iy`.
    pub fn visualize_spectrogram(&mut self, field: &[Vec<f64>], label: &str, duration: f64) {
        if field.first().map_or(true, |column| column.is_empty()) {
            tracing::warn!("Empty spectrogram for {label:?}; nothing to plot");
            return;
        }

        self.reset_surface(SurfaceKind::DenseField);

        let (data_min, data_max) = field
            .iter()
            .filter_map(|column| finite_bounds(column))
            .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
            .unwrap_or((0.0, 0.0));
        let x_range = AxisRange::new(0.0, duration);
        let y_range = AxisRange::new(0.0, self.config.spectrogram_max_frequency);
        let map = ColorMapField {
            name: String::new(),
            cells: field.to_vec(),
            x_range,
            y_range,
            // Halving the upper bound saturates the loudest cells for contrast.
            data_range: AxisRange::new(data_min, data_max / 2.0).normalized(),
        };

        self.x_limits = x_range;
        let mut surface = self.surface.borrow_mut();
        surface.add_color_map(map);
        surface.set_x_range(x_range);
        surface.set_x_limits(Some(x_range));
        surface.set_y_range(y_range);
        surface.replot();
        tracing::debug!(
            "Plotted {}x{} spectrogram of {label:?} over [0, {duration}]",
            field.len(),
            field[0].len()
        );
    }

    /// Replace the tracked samples without touching the plot. Samples land at
    /// `x = index`; display offsets of channels that stay are kept.
    pub fn set_signal_data(&mut self, channels: &BTreeMap<String, Vec<f64>>) {
        self.store.clear();
        for (key, values) in channels {
            let mut channel = SignalChannel::from_indexed(key.as_str(), values);
            channel.offset = self.store.offset(key);
            self.store.insert(channel);
        }
    }

    /// `(lower, upper)` of the shared selection, `(0, 0)` if there is none.
    pub fn selection_range(&self) -> (f64, f64) {
        SelectionController::selection_range(&self.registry.borrow())
    }

    pub fn selection_phase(&self) -> SelectionPhase {
        SelectionController::phase(&self.registry.borrow())
    }

    pub fn zoom_to_selection(&mut self) -> Option<AxisRange> {
        self.selection.zoom_to_selection(&mut self.registry.borrow_mut())
    }

    pub fn clear_selection(&self) {
        SelectionController::clear_selection(&mut self.registry.borrow_mut());
    }

    /// Pan/zoom bounds of the x axis.
    pub fn axis_limits(&self) -> (f64, f64) {
        (self.x_limits.lower, self.x_limits.upper)
    }

    pub fn set_zoom_limits(&mut self, min: f64, max: f64) {
        self.x_limits = AxisRange::new(min, max);
        self.surface.borrow_mut().set_x_limits(Some(self.x_limits));
    }

    /// Whether the visible x range already covers the zoom limits.
    pub fn is_at_zoom_out_limit(&self) -> bool {
        let range = self.surface.borrow().x_range();
        range.lower <= self.x_limits.lower && range.upper >= self.x_limits.upper
    }

    /// Show the full x range again. Linked surfaces follow on the next propagation.
    pub fn reset_zoom(&mut self) {
        let mut surface = self.surface.borrow_mut();
        surface.set_x_range(self.x_limits);
        surface.replot();
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Enter(pos) => self.pointer_enter(pos),
            PointerEvent::Move(pos) => self.pointer_move(pos),
            PointerEvent::Leave => self.pointer_leave(),
            PointerEvent::Press(pos) => self.pointer_press(pos),
            PointerEvent::Release(pos) => self.pointer_release(pos),
        }
    }

    pub fn pointer_enter(&mut self, pos: ScreenPos) {
        let mut registry = self.registry.borrow_mut();
        self.cursor
            .on_pointer_enter(&mut registry, &self.store, &self.tracked, self.primary, pos);
    }

    /// Move the cursor and extend a selection being dragged.
    pub fn pointer_move(&mut self, pos: ScreenPos) {
        let mut registry = self.registry.borrow_mut();
        self.cursor
            .on_pointer_move(&mut registry, &self.store, &self.tracked, self.primary, pos);
        self.selection.on_drag(&mut registry, pos);
    }

    pub fn pointer_leave(&mut self) {
        self.cursor.on_pointer_leave(&mut self.registry.borrow_mut());
    }

    pub fn pointer_press(&mut self, pos: ScreenPos) {
        self.selection.on_press(&mut self.registry.borrow_mut(), pos);
    }

    pub fn pointer_release(&mut self, pos: ScreenPos) {
        self.selection.on_release(&mut self.registry.borrow_mut(), pos);
    }

    fn reset_surface(&mut self, kind: SurfaceKind) {
        self.registry.borrow_mut().set_kind(self.primary, kind);
        let mut surface = self.surface.borrow_mut();
        surface.clear_plottables();
        let range = surface.x_range();
        surface.set_top_axis(None, range);
    }
}

fn finite_bounds(values: &[f64]) -> Option<(f64, f64)> {
    bounds(values.iter().copied().filter(|v| v.is_finite()))
}

impl Drop for KinematicView {
    fn drop(&mut self) {
        match self.registry.try_borrow_mut() {
            Ok(mut registry) => {
                self.cursor.detach(&registry);
                registry.unregister(self.primary);
            }
            Err(_) => tracing::warn!("Registry busy; {:?} left registered", self.primary),
        }
    }
}
