/// Drawing constants for the lot canvas. Sizes are in canvas pixels.
pub const MARGIN_PX: f64 = 28.0;
/// Upper bound on a cell's edge so small lots don't balloon.
pub const MAX_CELL_PX: f64 = 48.0;
pub const CELL_GAP_PX: f64 = 2.0;

pub const COLOR_EMPTY: &str = "#ecf0f1";
pub const COLOR_OCCUPIED: &str = "#3498db";
pub const COLOR_OBSTACLE: &str = "#2c3e50";
pub const COLOR_PATH: &str = "#bdc3c7";
pub const COLOR_START: &str = "#27ae60";
pub const COLOR_BUSY: &str = "rgba(241, 196, 15, 0.55)";
pub const COLOR_AXIS: &str = "#555";
pub const COLOR_LABEL: &str = "#fff";

/// How long an alert stays on screen.
pub const ALERT_MS: i32 = 5_000;
