use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use eframe::egui;
use kinoscope::render::egui_surface::EguiSurface;
use kinoscope::render::plot_interaction::format_general;
use kinoscope::render::surface::PointerEvent;
use kinoscope::state::theme::Theme;
use kinoscope::{KinematicView, PlotRegistry, SharedRegistry, ViewerConfig};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Duration of the generated recordings in seconds.
const DEMO_SECONDS: f64 = 4.0;
const KINEMATIC_RATE: u32 = 100;
const AUDIO_RATE: u32 = 2000;

/// One plot row: the painted surface and the view driving it.
struct PlotRow {
    title: String,
    surface: Rc<RefCell<EguiSurface>>,
    view: KinematicView,
}

/// Demo host: a column of kinematic plots sharing one cursor, one selection
/// and a linked time axis.
pub struct KinoscopeApp {
    config: ViewerConfig,
    registry: SharedRegistry,
    rows: Vec<PlotRow>,
    tracked: String,
}

impl KinoscopeApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: ViewerConfig) -> Self {
        // --- Global UI style ---
        let ctx = &cc.egui_ctx;
        let mut style = (*ctx.style()).clone();
        style.text_styles.insert(
            egui::TextStyle::Body,
            egui::FontId::proportional(15.0),
        );
        style.text_styles.insert(
            egui::TextStyle::Button,
            egui::FontId::proportional(14.5),
        );
        style.text_styles.insert(
            egui::TextStyle::Heading,
            egui::FontId::proportional(22.0),
        );
        style.spacing.button_padding = egui::vec2(10.0, 5.0);
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.visuals.widgets.inactive.corner_radius = egui::CornerRadius::same(6);
        style.visuals.widgets.hovered.corner_radius = egui::CornerRadius::same(6);
        style.visuals.widgets.active.corner_radius = egui::CornerRadius::same(6);
        ctx.set_style(style);
        ctx.set_visuals(config.theme.visuals());

        let registry = PlotRegistry::shared();
        let mut rows = Vec::new();
        for (title, config_name) in [("Pelvis", "Pelvis"), ("Knee", "Knee"), ("Audio", "Audio"), ("Spectrogram", "Audio")] {
            let surface = Rc::new(RefCell::new(EguiSurface::new(title)));
            let mut view = KinematicView::new(registry.clone(), surface.clone(), config.clone());
            match title {
                "Spectrogram" => view.visualize_spectrogram(&spectrogram(64, 48), config_name, DEMO_SECONDS),
                "Audio" => {
                    let audio: BTreeMap<String, Vec<f64>> =
                        [("Audio".to_string(), audio_signal())].into_iter().collect();
                    view.visualize_signal(&audio, config_name, config.line_width, AUDIO_RATE);
                }
                _ => {
                    let phase = rows.len() as f64;
                    view.visualize_signal(&kinematics(phase), config_name, config.line_width, KINEMATIC_RATE);
                }
            }
            rows.push(PlotRow {
                title: title.to_string(),
                surface,
                view,
            });
        }

        // Drop the range changes of the initial setup before linking.
        registry.borrow().propagate_range_changes();
        let ids: Vec<_> = rows.iter().map(|r| r.view.surface_id()).collect();
        registry.borrow_mut().link_x_axes(&ids);
        tracing::info!("Kinoscope demo with {} linked plots", rows.len());

        Self {
            config,
            registry,
            rows,
            tracked: "X".to_string(),
        }
    }

    fn set_tracked(&mut self, name: &str) {
        self.tracked = name.to_string();
        for row in &mut self.rows {
            row.view.set_tracked_parameter(name);
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Cursor");
        ui.add_space(4.0);
        ui.label("Tracked parameter");
        ui.horizontal(|ui| {
            for name in ["X", "Y", "Z"] {
                if ui.selectable_label(self.tracked == name, name).clicked() {
                    self.set_tracked(name);
                }
            }
        });

        if let Some(row) = self.rows.first() {
            let state = row.view.cursor_state();
            if state.visible {
                ui.monospace(format!("x = {}", format_general(state.data_x)));
                ui.monospace(format!("y = {}", format_general(state.value)));
            } else {
                ui.weak("Hover a plot");
            }
        }

        ui.separator();
        ui.heading("Selection");
        ui.add_space(4.0);
        let (lo, hi) = self.rows.first().map(|r| r.view.selection_range()).unwrap_or((0.0, 0.0));
        if lo != hi {
            ui.monospace(format!("{} .. {}", format_general(lo), format_general(hi)));
        } else {
            ui.weak("Drag on a plot to select");
        }

        let owner = self.rows.iter().position(|r| {
            self.registry
                .borrow()
                .selection()
                .is_some_and(|s| s.owner == r.view.surface_id())
        });
        if ui
            .add_enabled(owner.is_some(), egui::Button::new("Zoom to Selection"))
            .clicked()
        {
            if let Some(i) = owner {
                self.rows[i].view.zoom_to_selection();
            }
        }
        if ui.button("Clear Selection").clicked() {
            if let Some(row) = self.rows.first() {
                row.view.clear_selection();
            }
        }

        let at_limit = self.rows.iter().all(|r| r.view.is_at_zoom_out_limit());
        if ui.add_enabled(!at_limit, egui::Button::new("Reset Zoom")).clicked() {
            for row in &mut self.rows {
                row.view.reset_zoom();
            }
        }

        ui.separator();
        let theme_label = match self.config.theme {
            Theme::Dark => "Light Mode",
            Theme::Light => "Dark Mode",
        };
        if ui.button(theme_label).clicked() {
            self.config.theme = self.config.theme.toggle();
        }
    }
}

impl eframe::App for KinoscopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(self.config.theme.visuals());

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(16, 8)))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Kinoscope");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.small(format!("v{VERSION}"));
                    });
                });
            });

        egui::SidePanel::right("controls")
            .resizable(false)
            .default_width(220.0)
            .show(ctx, |ui| self.show_controls(ui));

        let theme = self.config.theme;
        let height = self.config.plot_height;
        let mut frame_events = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                for (index, row) in self.rows.iter().enumerate() {
                    ui.label(egui::RichText::new(&row.title).strong());
                    let events = row.surface.borrow_mut().show(ui, height, &theme);
                    frame_events.extend(events.into_iter().map(|event| (index, event)));
                    ui.add_space(6.0);
                }
            });
        });

        // Leaves go first so a plot left this frame cannot hide the cursor
        // of the plot just entered.
        frame_events.sort_by_key(|(_, event)| !matches!(event, PointerEvent::Leave));
        for (index, event) in frame_events {
            self.rows[index].view.handle_pointer(event);
        }

        self.registry.borrow().propagate_range_changes();
    }
}

/// Three joint-angle channels with a gait-like shape.
fn kinematics(phase: f64) -> BTreeMap<String, Vec<f64>> {
    let tau = std::f64::consts::TAU;
    let mut channels = BTreeMap::new();
    channels.insert(
        "X".to_string(),
        sample(KINEMATIC_RATE, |t| 30.0 * (tau * t + phase).sin() + 8.0 * (2.0 * tau * t).sin()),
    );
    channels.insert(
        "Y".to_string(),
        sample(KINEMATIC_RATE, |t| 12.0 * (tau * t + phase + 1.2).cos() + 40.0),
    );
    channels.insert(
        "Z".to_string(),
        sample(KINEMATIC_RATE, |t| 5.0 * (3.0 * tau * t).sin() * (tau * t / 4.0).cos() - 10.0),
    );
    channels
}

fn sample(rate: u32, f: impl Fn(f64) -> f64) -> Vec<f64> {
    let n = (DEMO_SECONDS * rate as f64) as usize;
    (0..n).map(|i| f(i as f64 / rate as f64)).collect()
}

/// Footstep-like bursts of a decaying tone.
fn audio_signal() -> Vec<f64> {
    sample(AUDIO_RATE, |t| (-8.0 * (t % 1.0)).exp() * (std::f64::consts::TAU * 180.0 * t).sin())
}

/// Field with energy in a low band that pulses once per second.
fn spectrogram(columns: usize, rows: usize) -> Vec<Vec<f64>> {
    (0..columns)
        .map(|ix| {
            let t = ix as f64 / columns as f64 * DEMO_SECONDS;
            let pulse = (-6.0 * (t % 1.0)).exp();
            (0..rows)
                .map(|iy| {
                    let f = iy as f64 / rows as f64;
                    pulse * (-((f - 0.15) / 0.08).powi(2)).exp() + 0.05 * (1.0 - f)
                })
                .collect()
        })
        .collect()
}
