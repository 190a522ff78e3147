use crate::render::surface::{AxisRange, ScreenPos, ScreenRect};

/// View state of a plot surface. Tracks the visible data bounds and maps
/// between surface-local pixels and data coordinates.
#[derive(Debug, Clone)]
pub struct PlotViewState {
    /// Current view bounds in data coordinates
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    /// Pan/zoom bounds for the x axis. Zooming out never goes past them.
    pub x_limits: Option<AxisRange>,
}

impl Default for PlotViewState {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 1.0,
            y_min: 0.0,
            y_max: 1.0,
            x_limits: None,
        }
    }
}

impl PlotViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn x_range(&self) -> AxisRange {
        AxisRange::new(self.x_min, self.x_max)
    }

    pub fn y_range(&self) -> AxisRange {
        AxisRange::new(self.y_min, self.y_max)
    }

    pub fn set_x_range(&mut self, range: AxisRange) {
        self.x_min = range.lower;
        self.x_max = range.upper;
    }

    pub fn set_y_range(&mut self, range: AxisRange) {
        self.y_min = range.lower;
        self.y_max = range.upper;
    }

    /// Convert a surface-local pixel x to a data x.
    pub fn pixel_to_x(&self, px: f32, rect: ScreenRect) -> f64 {
        let t_x = (px - rect.left) as f64 / rect.width.max(f32::EPSILON) as f64;
        self.x_min + t_x * (self.x_max - self.x_min)
    }

    /// Convert a surface-local pixel y to a data y. Pixel y grows downwards.
    pub fn pixel_to_y(&self, py: f32, rect: ScreenRect) -> f64 {
        let t_y = 1.0 - (py - rect.top) as f64 / rect.height.max(f32::EPSILON) as f64;
        self.y_min + t_y * (self.y_max - self.y_min)
    }

    /// Convert data coordinates to a surface-local pixel position.
    pub fn data_to_screen(&self, x: f64, y: f64, rect: ScreenRect) -> ScreenPos {
        let x_span = (self.x_max - self.x_min).abs().max(1e-15);
        let y_span = (self.y_max - self.y_min).abs().max(1e-15);
        let t_x = (x - self.x_min) / x_span;
        let t_y = 1.0 - (y - self.y_min) / y_span;
        ScreenPos::new(
            rect.left + (t_x as f32) * rect.width,
            rect.top + (t_y as f32) * rect.height,
        )
    }

    /// Zoom the x axis by `factor` around the data x under `anchor_px`.
    /// A factor above 1 zooms out. Returns true if the range changed.
    pub fn zoom_x(&mut self, factor: f64, anchor_px: f32, rect: ScreenRect) -> bool {
        let factor = factor.clamp(0.5, 2.0);
        let cx = self.pixel_to_x(anchor_px, rect);
        let lo = cx + (self.x_min - cx) * factor;
        let hi = cx + (self.x_max - cx) * factor;
        let (lo, hi) = self.clamp_to_limits(lo, hi);
        self.apply_x(lo, hi)
    }

    /// Pan the x axis by a pixel delta, staying inside the limits.
    /// Returns true if the range changed.
    pub fn pan_x(&mut self, delta_px: f32, rect: ScreenRect) -> bool {
        let dx = -(delta_px as f64) * (self.x_max - self.x_min) / rect.width.max(f32::EPSILON) as f64;
        let (lo, hi) = self.clamp_to_limits(self.x_min + dx, self.x_max + dx);
        self.apply_x(lo, hi)
    }

    /// Shift `[lo, hi]` back inside the x limits, keeping its span.
    /// A span at least as wide as the limits becomes the limits.
    fn clamp_to_limits(&self, mut lo: f64, mut hi: f64) -> (f64, f64) {
        let Some(limits) = self.x_limits else {
            return (lo, hi);
        };
        if hi - lo >= limits.span() {
            return (limits.lower, limits.upper);
        }
        if lo < limits.lower {
            hi += limits.lower - lo;
            lo = limits.lower;
        }
        if hi > limits.upper {
            lo -= hi - limits.upper;
            hi = limits.upper;
        }
        (lo, hi)
    }

    fn apply_x(&mut self, lo: f64, hi: f64) -> bool {
        if !lo.is_finite() || !hi.is_finite() || hi <= lo {
            return false;
        }
        let changed = (lo - self.x_min).abs() > 1e-15 || (hi - self.x_max).abs() > 1e-15;
        self.x_min = lo;
        self.x_max = hi;
        changed
    }

    /// Handle egui pointer input over the plot area: scroll zooms the x axis
    /// around the pointer, shift+scroll or a secondary drag pans, and a
    /// double-click restores the pan/zoom limits.
    /// Returns the new x range if it changed.
    pub fn handle_input(&mut self, response: &egui::Response, rect: ScreenRect, origin: egui::Pos2) -> Option<AxisRange> {
        let mut changed = false;

        if response.dragged_by(egui::PointerButton::Secondary) {
            changed |= self.pan_x(response.drag_delta().x, rect);
        }

        let (scroll, shift) = response.ctx.input(|i| {
            if response.hovered() {
                (i.smooth_scroll_delta.y, i.modifiers.shift)
            } else {
                (0.0, false)
            }
        });

        if scroll.abs() > 0.0 {
            if shift {
                changed |= self.pan_x(scroll, rect);
            } else if let Some(mouse_pos) = response.hover_pos() {
                let zoom_factor = 1.0 - (scroll as f64) * 0.001;
                changed |= self.zoom_x(zoom_factor, mouse_pos.x - origin.x, rect);
            }
        }

        if response.double_clicked() {
            if let Some(limits) = self.x_limits {
                changed |= self.apply_x(limits.lower, limits.upper);
            }
        }

        changed.then(|| self.x_range())
    }
}

/// Tick positions for an axis range as `(value, is_major)`, five minor ticks per major step.
pub fn compute_grid_lines(min: f64, max: f64) -> Vec<(f64, bool)> {
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return Vec::new();
    }

    let raw_step = range / 8.0;
    let order = 10f64.powf(raw_step.log10().floor());
    let normalized = raw_step / order;

    let nice_step = if normalized <= 1.0 {
        order
    } else if normalized <= 2.0 {
        2.0 * order
    } else if normalized <= 5.0 {
        5.0 * order
    } else {
        10.0 * order
    };

    let minor_step = nice_step / 5.0;
    let start = (min / minor_step).floor() as i64;
    let end = (max / minor_step).ceil() as i64;

    (start..=end)
        .map(|i| i as f64 * minor_step)
        .filter(|val| *val >= min && *val <= max)
        .map(|val| {
            let is_major = ((val / nice_step).round() * nice_step - val).abs() < nice_step * 0.01;
            (val, is_major)
        })
        .collect()
}

/// Format a number the way a `%g` conversion with six significant digits does:
/// fixed notation for moderate exponents, scientific otherwise, trailing zeros trimmed.
pub fn format_general(val: f64) -> String {
    if val == 0.0 {
        return "0".to_string();
    }
    if !val.is_finite() {
        return format!("{val}");
    }

    const PRECISION: i32 = 6;
    let exponent = val.abs().log10().floor() as i32;
    // Rounding can carry into the next decade (e.g. 999999.5).
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, val);
    let exponent = sci
        .split_once('e')
        .and_then(|(_, e)| e.parse::<i32>().ok())
        .unwrap_or(exponent);

    if exponent < -4 || exponent >= PRECISION {
        let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
        let mantissa = trim_fraction(mantissa);
        let exp: i32 = exp.parse().unwrap_or(0);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{val:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
