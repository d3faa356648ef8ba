//! Browser front-end for the smart parking lot.
//!
//! Paints the lot on a canvas, keeps the status panel current and turns
//! clicks and uploads into [`Command`]s for the core controller.

use std::cell::RefCell;
use std::rc::Rc;

use parking_core::{CellState, Command, Controller, Layout, position_label};
use tracing_subscriber::filter::LevelFilter;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlElement, MouseEvent};

pub mod canvas;
pub mod console_log;
pub mod constants;
pub mod state;
pub mod transport;
pub mod upload;
pub mod utils;
pub mod view;

use canvas::init_canvas;
use state::{ParkingController, STATE, State};
use transport::FetchTransport;
pub use utils::log;
use utils::{get_query_param, install_panic_hook, load_config};
use view::DomView;

/// Runs one command on the controller without blocking the event loop.
/// The controller reports the outcome to the view itself.
pub fn spawn_command(controller: Rc<ParkingController>, command: Command) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = controller.dispatch(command).await {
            log(&format!("command failed: {e}"));
        }
    });
}

// Empty cell: ask for a plate. Occupied cell: confirm removal. Anything else
// is not clickable.
fn command_for_click(s: &State, e: &MouseEvent) -> Option<Command> {
    let pos = s.view.cell_at_event(e)?;
    let state = s.controller.grid().state_at(pos).ok()?;
    match state {
        CellState::Empty => {
            let plate = s
                .window
                .prompt_with_message("Enter number plate:")
                .ok()
                .flatten()?;
            Some(Command::CellClicked {
                pos,
                plate: Some(plate),
            })
        }
        CellState::Occupied => {
            let plate = s
                .controller
                .grid()
                .plate_at(pos)
                .ok()
                .flatten()
                .unwrap_or_default()
                .to_string();
            let question = format!("Remove vehicle {plate} from {}?", position_label(pos));
            s.window
                .confirm_with_message(&question)
                .unwrap_or(false)
                .then_some(Command::RemoveRequested { pos })
        }
        _ => None,
    }
}

fn attach_ui(state: Rc<RefCell<State>>) -> Result<(), JsValue> {
    let doc = state.borrow().document.clone();
    upload::attach_file_input(state.clone())?;
    upload::attach_detect_button(state.clone())?;

    // Reconnect button
    if let Some(btn) = doc.get_element_by_id("probeBtn") {
        let btn: HtmlElement = btn.dyn_into()?;
        let onclick = Closure::<dyn FnMut()>::wrap(Box::new(probe_backend));
        btn.set_onclick(Some(onclick.as_ref().unchecked_ref()));
        onclick.forget();
    }

    // Cell clicks
    {
        let st = state.clone();
        let mousedown = Closure::<dyn FnMut(MouseEvent)>::wrap(Box::new(move |e: MouseEvent| {
            let (controller, command) = {
                let s = st.borrow();
                match command_for_click(&s, &e) {
                    Some(command) => (s.controller.clone(), command),
                    None => return,
                }
            };
            spawn_command(controller, command);
        }));
        state
            .borrow()
            .view
            .canvas()
            .add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
        mousedown.forget();
    }

    // Repaint on resize so hit testing follows the layout.
    {
        let st = state.clone();
        let onresize = Closure::<dyn FnMut()>::wrap(Box::new(move || {
            st.borrow().view.redraw();
        }));
        state
            .borrow()
            .window
            .add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
        onresize.forget();
    }
    Ok(())
}

fn current_controller() -> Option<Rc<ParkingController>> {
    STATE.with(|st| {
        st.borrow()
            .as_ref()
            .map(|state| state.borrow().controller.clone())
    })
}

/// Re-checks the backend; exposed for the page's reconnect link.
#[wasm_bindgen(js_name = probeBackend)]
pub fn probe_backend() {
    if let Some(controller) = current_controller() {
        spawn_command(controller, Command::ProbeBackend);
    }
}

/// Current lot counters as JSON.
#[wasm_bindgen(js_name = lotStatus)]
pub fn lot_status() -> Option<String> {
    let controller = current_controller()?;
    serde_json::to_string(&controller.status()).ok()
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    install_panic_hook();
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    let search = window.location().search().unwrap_or_default();
    console_log::init(if get_query_param(&search, "debug").is_some() {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    });

    let config = load_config(&window);
    let probe = !config.start_offline;
    let (canvas, ctx) = init_canvas(&document)?;
    let view = Rc::new(DomView::new(
        window.clone(),
        document.clone(),
        canvas,
        ctx,
    ));
    let transport = FetchTransport::new(window.clone(), &config);
    let controller = Rc::new(Controller::new(
        config,
        &Layout::standard(),
        transport,
        view.clone(),
    ));

    let state = Rc::new(RefCell::new(State {
        window,
        document,
        controller: controller.clone(),
        view,
        pending_image: None,
    }));
    STATE.with(|st| st.replace(Some(state.clone())));
    attach_ui(state)?;

    if probe {
        spawn_command(controller, Command::ProbeBackend);
    }
    Ok(())
}
