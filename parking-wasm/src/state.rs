use std::cell::RefCell;
use std::rc::Rc;

use parking_core::{Controller, UploadedImage};
use web_sys::{Document, Window};

use crate::transport::FetchTransport;
use crate::view::DomView;

pub type ParkingController = Controller<FetchTransport, Rc<DomView>>;

/// Global application state stored behind an `Rc<RefCell<_>>` so it can be
/// shared across the WASM callbacks. The grid itself lives in the controller.
pub struct State {
    pub window: Window,
    pub document: Document,
    pub controller: Rc<ParkingController>,
    pub view: Rc<DomView>,
    /// Last image picked in the upload control, sent on "detect".
    pub pending_image: Option<UploadedImage>,
}

/// Thread local storage for the single runtime state instance.
thread_local! {
    pub static STATE: RefCell<Option<Rc<RefCell<State>>>> = const { RefCell::new(None) };
}
