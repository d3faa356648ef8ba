//! `fetch`-backed [`Transport`] with a per-request deadline.

use parking_core::{GatewayError, HttpReply, HttpRequest, ParkingConfig, Transport};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, Headers, Request, RequestInit, Response, Window};

pub struct FetchTransport {
    window: Window,
    config: ParkingConfig,
}

impl FetchTransport {
    pub fn new(window: Window, config: &ParkingConfig) -> Self {
        FetchTransport {
            window,
            config: config.clone(),
        }
    }

    fn build(&self, request: &HttpRequest, abort: &AbortController) -> Result<Request, JsValue> {
        let opts = RequestInit::new();
        opts.set_method(request.method.as_str());
        opts.set_signal(Some(&abort.signal()));
        if let Some(body) = &request.body {
            let headers = Headers::new()?;
            headers.set("Content-Type", "application/json")?;
            opts.set_headers(&headers);
            opts.set_body(&JsValue::from_str(body));
        }
        Request::new_with_str_and_init(&self.config.endpoint_url(request.path), &opts)
    }

    async fn exchange(&self, request: Request) -> Result<HttpReply, JsValue> {
        let value = JsFuture::from(self.window.fetch_with_request(&request)).await?;
        let resp: Response = value.dyn_into()?;
        let status = resp.status();
        let body = JsFuture::from(resp.text()?)
            .await?
            .as_string()
            .unwrap_or_default();
        Ok(HttpReply { status, body })
    }
}

/// Aborts the request when the deadline passes; clears the timer when dropped.
struct Deadline {
    window: Window,
    handle: i32,
    _on_timeout: Closure<dyn FnMut()>,
}

impl Deadline {
    fn arm(window: &Window, abort: &AbortController, ms: u32) -> Result<Self, JsValue> {
        let abort = abort.clone();
        let on_timeout = Closure::<dyn FnMut()>::wrap(Box::new(move || abort.abort()));
        let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            on_timeout.as_ref().unchecked_ref(),
            i32::try_from(ms).unwrap_or(i32::MAX),
        )?;
        Ok(Deadline {
            window: window.clone(),
            handle,
            _on_timeout: on_timeout,
        })
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.window.clear_timeout_with_handle(self.handle);
    }
}

fn unreachable(e: JsValue) -> GatewayError {
    GatewayError::Unreachable(
        e.as_string()
            .or_else(|| {
                js_sys::Reflect::get(&e, &JsValue::from_str("message"))
                    .ok()
                    .and_then(|m| m.as_string())
            })
            .unwrap_or_else(|| format!("{e:?}")),
    )
}

impl Transport for FetchTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpReply, GatewayError> {
        let abort = AbortController::new().map_err(unreachable)?;
        let req = self.build(&request, &abort).map_err(unreachable)?;
        let timeout_ms = self.config.request_timeout_ms;
        let _deadline = Deadline::arm(&self.window, &abort, timeout_ms).map_err(unreachable)?;
        tracing::debug!(method = request.method.as_str(), path = request.path, "fetch");
        match self.exchange(req).await {
            Ok(reply) => Ok(reply),
            Err(_) if abort.signal().aborted() => Err(GatewayError::Timeout(timeout_ms)),
            Err(e) => Err(unreachable(e)),
        }
    }
}
