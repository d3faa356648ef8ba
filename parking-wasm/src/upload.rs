use std::cell::RefCell;
use std::rc::Rc;

use parking_core::{Command, Notice, NoticeLevel, UploadedImage};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{Event, FileReader, HtmlElement, HtmlInputElement, Url};

use crate::state::State;
use crate::{log, spawn_command};

// Wires up the plate image input: read the file, keep it, show a preview.
pub fn attach_file_input(state: Rc<RefCell<State>>) -> Result<(), JsValue> {
    let doc = state.borrow().document.clone();
    let Some(input) = doc.get_element_by_id("plateImage") else {
        return Ok(());
    };
    let input: HtmlInputElement = input.dyn_into()?;
    let st = state.clone();
    let input_for_closure = input.clone();
    let onchange = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_e: Event| {
        let Some(file) = input_for_closure.files().and_then(|f| f.item(0)) else {
            log("No file selected");
            st.borrow_mut().pending_image = None;
            return;
        };
        let reader = match FileReader::new() {
            Ok(r) => r,
            Err(e) => {
                log(&format!("FileReader unavailable: {e:?}"));
                return;
            }
        };
        if let Ok(url) = Url::create_object_url_with_blob(&file) {
            st.borrow().view.show_preview(&url);
        }
        let st2 = st.clone();
        let mime = file.type_();
        // Clone the FileReader for use inside the onload closure
        let reader_for_closure = reader.clone();
        let onload = Closure::<dyn FnMut(Event)>::wrap(Box::new(move |_ev: Event| {
            let bytes = match reader_for_closure.result() {
                Ok(buf) => js_sys::Uint8Array::new(&buf).to_vec(),
                Err(e) => {
                    log(&format!("Failed to read image: {e:?}"));
                    return;
                }
            };
            st2.borrow_mut().pending_image = Some(UploadedImage::new(bytes, mime.clone()));
        }));
        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        if let Err(e) = reader.read_as_array_buffer(&file) {
            log(&format!("Failed to read file: {:?}", e));
        }
        onload.forget();
    }));
    input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
    onchange.forget();
    Ok(())
}

pub fn attach_detect_button(state: Rc<RefCell<State>>) -> Result<(), JsValue> {
    let doc = state.borrow().document.clone();
    let Some(btn) = doc.get_element_by_id("detectBtn") else {
        return Ok(());
    };
    let btn: HtmlElement = btn.dyn_into()?;
    let st = state.clone();
    let onclick = Closure::<dyn FnMut()>::wrap(Box::new(move || {
        let s = st.borrow();
        match s.pending_image.clone() {
            Some(image) => spawn_command(s.controller.clone(), Command::ImageUploaded(image)),
            None => s.view.alert(&Notice::new(
                NoticeLevel::Warning,
                "Please upload an image first.",
            )),
        }
    }));
    btn.set_onclick(Some(onclick.as_ref().unchecked_ref()));
    onclick.forget();
    Ok(())
}
