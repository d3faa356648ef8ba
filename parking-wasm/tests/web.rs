#![cfg(target_arch = "wasm32")]

use parking_core::{
    ConnectivityMode, Grid, Layout, Notice, NoticeLevel, Observer, compute_status,
};
use parking_wasm::canvas::init_canvas;
use parking_wasm::view::DomView;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Document, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn page() -> (web_sys::Window, Document) {
    let window = web_sys::window().unwrap();
    let document = window.document().unwrap();
    let body = document.body().unwrap();
    body.set_inner_html(
        r#"<canvas id="grid" style="width:600px;height:800px"></canvas>
        <span id="total"></span><span id="occupied"></span>
        <span id="available"></span><span id="obstacles"></span>
        <span id="occupancy"></span>
        <div id="offlineIndicator" style="display:none"></div>"#,
    );
    (window, document)
}

fn view() -> (DomView, Document) {
    let (window, document) = page();
    let (canvas, ctx) = init_canvas(&document).unwrap();
    (DomView::new(window, document.clone(), canvas, ctx), document)
}

fn text(document: &Document, id: &str) -> String {
    document
        .get_element_by_id(id)
        .unwrap()
        .dyn_into::<HtmlElement>()
        .unwrap()
        .inner_text()
}

#[wasm_bindgen_test]
fn status_panel_shows_counts() {
    let (view, document) = view();
    let mut grid = Grid::new(&Layout::standard());
    grid.set_occupied((5, 5).into(), "XYZ111").unwrap();
    view.status_changed(&compute_status(&grid));

    assert_eq!(text(&document, "total"), "269");
    assert_eq!(text(&document, "occupied"), "1");
    assert_eq!(text(&document, "available"), "203");
    assert_eq!(text(&document, "obstacles"), "30");
    assert_eq!(text(&document, "occupancy"), "0%");
}

#[wasm_bindgen_test]
fn offline_indicator_toggles() {
    let (view, document) = view();
    let indicator = document
        .get_element_by_id("offlineIndicator")
        .unwrap()
        .dyn_into::<HtmlElement>()
        .unwrap();
    view.connectivity_changed(ConnectivityMode::Offline);
    assert_eq!(indicator.style().get_property_value("display").unwrap(), "block");
    view.connectivity_changed(ConnectivityMode::Online);
    assert_eq!(indicator.style().get_property_value("display").unwrap(), "none");
}

#[wasm_bindgen_test]
fn notices_replace_each_other() {
    let (view, document) = view();
    view.notify(&Notice::new(NoticeLevel::Info, "first"));
    view.notify(&Notice::new(NoticeLevel::Error, "second"));
    let alert = document.get_element_by_id("alert").unwrap();
    assert_eq!(alert.class_name(), "alert alert-error");
    let message = alert.query_selector(".alert-message").unwrap().unwrap();
    assert_eq!(message.text_content().as_deref(), Some("second"));
}

#[wasm_bindgen_test]
fn notice_can_be_closed_by_hand() {
    let (view, document) = view();
    view.notify(&Notice::new(NoticeLevel::Warning, "lot is filling up"));
    let close = document
        .query_selector("#alert .alert-close")
        .unwrap()
        .unwrap()
        .dyn_into::<HtmlElement>()
        .unwrap();
    assert_eq!(close.text_content().as_deref(), Some("×"));
    close.click();
    assert!(document.get_element_by_id("alert").is_none());
}

#[wasm_bindgen_test]
fn painting_sizes_the_canvas() {
    let (view, _document) = view();
    view.render_grid(&Grid::new(&Layout::standard()));
    assert!(view.canvas().width() > 1);
}
