use egui::{Color32, Visuals};
use serde::{Deserialize, Serialize};

/// Muted trace palette; every channel sits between 80 and 175 per component
/// so traces stay readable on both backgrounds.
pub const TRACE_PALETTE: [[u8; 4]; 8] = [
    [160, 90, 90, 255],
    [90, 150, 100, 255],
    [95, 110, 170, 255],
    [170, 140, 80, 255],
    [140, 95, 160, 255],
    [85, 150, 155, 255],
    [150, 120, 105, 255],
    [115, 115, 115, 255],
];

pub fn trace_color(index: usize) -> [u8; 4] {
    TRACE_PALETTE[index % TRACE_PALETTE.len()]
}

/// Red, used for the cross-hair guides.
pub const CURSOR_COLOR: [u8; 4] = [255, 0, 0, 255];
/// Translucent red behind the coordinate readout and for the selection rectangle.
pub const CURSOR_FILL: [u8; 4] = [255, 0, 0, 50];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(&self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn visuals(&self) -> Visuals {
        match self {
            Theme::Dark => Visuals::dark(),
            Theme::Light => Visuals::light(),
        }
    }

    pub fn plot_bg(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgb(20, 20, 20),
            Theme::Light => Color32::from_rgb(255, 255, 255),
        }
    }

    pub fn grid_color(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgba_premultiplied(100, 100, 100, 60),
            Theme::Light => Color32::from_rgba_premultiplied(180, 180, 180, 80),
        }
    }

    /// Colour of the readout text drawn over the translucent frame.
    pub fn label_color(&self) -> Color32 {
        match self {
            Theme::Dark => Color32::from_rgb(235, 235, 235),
            Theme::Light => Color32::BLACK,
        }
    }

    /// Gradient end points for dense fields: (lowest value, highest value).
    pub fn field_gradient(&self) -> (Color32, Color32) {
        match self {
            Theme::Dark => (Color32::BLACK, Color32::WHITE),
            Theme::Light => (Color32::WHITE, Color32::BLACK),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Light
    }
}

pub fn color32(c: [u8; 4]) -> Color32 {
    Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}
