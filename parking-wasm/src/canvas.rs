use std::collections::HashSet;

use parking_core::{CellState, Grid, Position, column_label};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement};

use crate::constants::*;

// Non-deprecated helpers to set canvas styles via property assignment.
pub fn set_fill_style(ctx: &CanvasRenderingContext2d, color: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("fillStyle"),
        &JsValue::from_str(color),
    );
}

pub fn set_stroke_style(ctx: &CanvasRenderingContext2d, color: &str) {
    let _ = js_sys::Reflect::set(
        ctx.as_ref(),
        &JsValue::from_str("strokeStyle"),
        &JsValue::from_str(color),
    );
}

pub fn init_canvas(
    document: &Document,
) -> Result<(HtmlCanvasElement, CanvasRenderingContext2d), JsValue> {
    let cv = document
        .get_element_by_id("grid")
        .ok_or_else(|| JsValue::from_str("canvas #grid not found"))?
        .dyn_into::<HtmlCanvasElement>()?;
    let ctx = cv
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2D context not available"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    Ok((cv, ctx))
}

/// Screen placement of the lot: square cells centred in the canvas with a
/// margin on the top and left for the axis labels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridGeometry {
    pub rows: usize,
    pub cols: usize,
    pub cell: f64,
    pub origin: (f64, f64),
}

impl GridGeometry {
    pub fn fit(rows: usize, cols: usize, width: f64, height: f64) -> Self {
        let rows_f = rows.max(1) as f64;
        let cols_f = cols.max(1) as f64;
        let cell = ((width - 2.0 * MARGIN_PX) / cols_f)
            .min((height - 2.0 * MARGIN_PX) / rows_f)
            .clamp(1.0, MAX_CELL_PX);
        let ox = MARGIN_PX + ((width - 2.0 * MARGIN_PX) - cell * cols_f).max(0.0) / 2.0;
        let oy = MARGIN_PX + ((height - 2.0 * MARGIN_PX) - cell * rows_f).max(0.0) / 2.0;
        GridGeometry {
            rows,
            cols,
            cell,
            origin: (ox, oy),
        }
    }

    /// Top-left corner of a cell.
    pub fn cell_origin(&self, pos: Position) -> (f64, f64) {
        (
            self.origin.0 + pos.col as f64 * self.cell,
            self.origin.1 + pos.row as f64 * self.cell,
        )
    }

    /// Cell under a canvas-space point, if any.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<Position> {
        if self.cell <= 0.0 {
            return None;
        }
        let cx = (x - self.origin.0) / self.cell;
        let cy = (y - self.origin.1) / self.cell;
        if cx < 0.0 || cy < 0.0 {
            return None;
        }
        let (col, row) = (cx.floor() as usize, cy.floor() as usize);
        (row < self.rows && col < self.cols).then(|| Position::new(row, col))
    }
}

fn cell_color(state: CellState) -> &'static str {
    match state {
        CellState::Start => COLOR_START,
        CellState::Obstacle => COLOR_OBSTACLE,
        CellState::Path => COLOR_PATH,
        CellState::Empty => COLOR_EMPTY,
        CellState::Occupied => COLOR_OCCUPIED,
    }
}

pub fn draw_grid(
    ctx: &CanvasRenderingContext2d,
    geom: &GridGeometry,
    grid: &Grid,
    busy: &HashSet<Position>,
) {
    let canvas = ctx.canvas();
    if let Some(cv) = canvas {
        ctx.clear_rect(0.0, 0.0, cv.width() as f64, cv.height() as f64);
    }
    draw_axes(ctx, geom);

    let inner = (geom.cell - CELL_GAP_PX).max(1.0);
    let font = (geom.cell * 0.3).clamp(8.0, 14.0);
    for (pos, cell) in grid.cells() {
        let (x, y) = geom.cell_origin(pos);
        set_fill_style(ctx, cell_color(cell.state));
        ctx.fill_rect(x, y, inner, inner);

        if busy.contains(&pos) {
            set_fill_style(ctx, COLOR_BUSY);
            ctx.fill_rect(x, y, inner, inner);
        }

        let text = match cell.state {
            CellState::Start => Some("S"),
            CellState::Occupied => cell.plate.as_deref(),
            _ => None,
        };
        if let Some(text) = text {
            ctx.set_font(&format!("bold {font}px sans-serif"));
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            set_fill_style(ctx, COLOR_LABEL);
            let _ = ctx.fill_text_with_max_width(text, x + inner / 2.0, y + inner / 2.0, inner);
        }
    }
}

// Column letters along the top, row numbers down the left.
fn draw_axes(ctx: &CanvasRenderingContext2d, geom: &GridGeometry) {
    ctx.set_font("12px sans-serif");
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    set_fill_style(ctx, COLOR_AXIS);
    let half = geom.cell / 2.0;
    for c in 0..geom.cols {
        let (x, _) = geom.cell_origin(Position::new(0, c));
        let _ = ctx.fill_text(&column_label(c), x + half, geom.origin.1 - MARGIN_PX / 2.0);
    }
    for r in 0..geom.rows {
        let (_, y) = geom.cell_origin(Position::new(r, 0));
        let _ = ctx.fill_text(&r.to_string(), geom.origin.0 - MARGIN_PX / 2.0, y + half);
    }
    set_stroke_style(ctx, COLOR_AXIS);
    ctx.set_line_width(1.0);
    ctx.stroke_rect(
        geom.origin.0 - 1.0,
        geom.origin.1 - 1.0,
        geom.cell * geom.cols as f64 + 1.0,
        geom.cell * geom.rows as f64 + 1.0,
    );
}
