use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use parking_core::{
    CellState, ConnectivityMode, Grid, LotStatus, Notice, Observer, Position,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{
    CanvasRenderingContext2d, Document, HtmlButtonElement, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, MouseEvent, Window,
};

use crate::canvas::{GridGeometry, draw_grid};
use crate::constants::ALERT_MS;
use crate::utils::{event_canvas_coords, log, sync_canvas_size};

const DETECT_IDLE: &str = "Detect & Allocate Parking";
const DETECT_BUSY: &str = "Processing...";

/// Browser presentation: the lot canvas, the status panel and alerts.
pub struct DomView {
    window: Window,
    document: Document,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    geometry: Cell<GridGeometry>,
    // Last grid painted, so busy overlays can be redrawn without the controller.
    shown: RefCell<Option<Grid>>,
    busy: RefCell<HashSet<Position>>,
}

impl DomView {
    pub fn new(
        window: Window,
        document: Document,
        canvas: HtmlCanvasElement,
        ctx: CanvasRenderingContext2d,
    ) -> Self {
        DomView {
            window,
            document,
            canvas,
            ctx,
            geometry: Cell::new(GridGeometry::default()),
            shown: RefCell::new(None),
            busy: RefCell::new(HashSet::new()),
        }
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn cell_at_event(&self, e: &MouseEvent) -> Option<Position> {
        let (x, y) = event_canvas_coords(e, &self.canvas);
        self.geometry.get().cell_at(x, y)
    }

    pub fn redraw(&self) {
        if let Some(grid) = self.shown.borrow().as_ref() {
            self.paint(grid);
        }
    }

    fn paint(&self, grid: &Grid) {
        sync_canvas_size(&self.window, &self.canvas);
        let geom = GridGeometry::fit(
            grid.rows(),
            grid.cols(),
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        );
        self.geometry.set(geom);
        draw_grid(&self.ctx, &geom, grid, &self.busy.borrow());
    }

    fn element<T: JsCast>(&self, id: &str) -> Option<T> {
        self.document.get_element_by_id(id)?.dyn_into::<T>().ok()
    }

    fn set_text(&self, id: &str, text: &str) {
        if let Some(el) = self.element::<HtmlElement>(id) {
            el.set_inner_text(text);
        }
    }

    fn set_display(el: &HtmlElement, visible: bool) {
        let _ = el
            .style()
            .set_property("display", if visible { "block" } else { "none" });
    }

    /// Shows the picked file next to the upload control and hides the last result.
    pub fn show_preview(&self, url: &str) {
        if let Some(img) = self.element::<HtmlImageElement>("previewImage") {
            img.set_src(url);
            Self::set_display(&img, true);
        }
        if let Some(img) = self.element::<HtmlImageElement>("output") {
            Self::set_display(&img, false);
        }
    }

    pub fn alert(&self, notice: &Notice) {
        if let Some(old) = self.document.get_element_by_id("alert") {
            old.remove();
        }
        let Some(body) = self.document.body() else {
            return;
        };
        let Ok(el) = self.document.create_element("div") else {
            return;
        };
        el.set_id("alert");
        el.set_class_name(&format!("alert alert-{}", notice.level.as_str()));
        let (Ok(text), Ok(close)) = (
            self.document.create_element("span"),
            self.document.create_element("button"),
        ) else {
            log(&notice.message);
            return;
        };
        text.set_class_name("alert-message");
        text.set_text_content(Some(notice.message.as_str()));
        close.set_class_name("alert-close");
        close.set_text_content(Some("×"));
        if el.append_child(&text).is_err()
            || el.append_child(&close).is_err()
            || body.append_child(&el).is_err()
        {
            log(&notice.message);
            return;
        }
        let target = el.clone();
        let on_close = Closure::<dyn FnMut()>::wrap(Box::new(move || target.remove()));
        let _ = close.add_event_listener_with_callback("click", on_close.as_ref().unchecked_ref());
        on_close.forget();
        let dismiss = Closure::once_into_js(move || el.remove());
        let _ = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(dismiss.unchecked_ref(), ALERT_MS);
    }
}

impl Observer for DomView {
    fn render_grid(&self, grid: &Grid) {
        self.paint(grid);
        *self.shown.borrow_mut() = Some(grid.clone());
    }

    fn cell_toggled(&self, pos: Position, state: CellState) {
        log(&format!("cell {pos} is now {}", state.as_str()));
    }

    fn status_changed(&self, status: &LotStatus) {
        self.set_text("total", &status.total.to_string());
        self.set_text("occupied", &status.occupied.to_string());
        self.set_text("available", &status.available.to_string());
        self.set_text("obstacles", &status.obstacles.to_string());
        if let Some(el) = self.element::<HtmlElement>("occupancy") {
            el.set_inner_text(&format!("{}%", status.occupancy_rate));
            let _ = el.style().set_property("color", status.level().color());
        }
    }

    fn connectivity_changed(&self, mode: ConnectivityMode) {
        if let Some(el) = self.element::<HtmlElement>("offlineIndicator") {
            Self::set_display(&el, mode == ConnectivityMode::Offline);
        }
    }

    fn in_flight_changed(&self, pos: Position, busy: bool) {
        {
            let mut set = self.busy.borrow_mut();
            if busy {
                set.insert(pos);
            } else {
                set.remove(&pos);
            }
        }
        self.redraw();
    }

    fn detection_changed(&self, running: bool) {
        if let Some(btn) = self.element::<HtmlButtonElement>("detectBtn") {
            btn.set_disabled(running);
            btn.set_inner_text(if running { DETECT_BUSY } else { DETECT_IDLE });
        }
    }

    fn detection_result(&self, image: &str) {
        if let Some(img) = self.element::<HtmlImageElement>("output") {
            img.set_src(image);
            Self::set_display(&img, true);
        }
    }

    fn notify(&self, notice: &Notice) {
        self.alert(notice);
    }
}
