use parking_core::{HistoryPolicy, ParkingConfig};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlCanvasElement, MouseEvent, Window};

/// Log a message to the browser console.
pub fn log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

/// Route panics to `console.error` instead of a bare `unreachable` trap.
pub fn install_panic_hook() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            web_sys::console::error_1(&JsValue::from_str(&format!("{info}")));
        }));
    });
}

/// Ensure the canvas backing store matches the CSS size and device pixel ratio
/// to prevent non-uniform stretching.
pub fn sync_canvas_size(window: &Window, canvas: &HtmlCanvasElement) {
    let dpr = window.device_pixel_ratio();
    let (css_w, css_h) = if let Some(el) = canvas.dyn_ref::<web_sys::Element>() {
        let rect = el.get_bounding_client_rect();
        (rect.width().max(1.0), rect.height().max(1.0))
    } else {
        (canvas.client_width() as f64, canvas.client_height() as f64)
    };
    let target_w = (css_w * dpr).round().clamp(1.0, 10000.0) as u32;
    let target_h = (css_h * dpr).round().clamp(1.0, 10000.0) as u32;
    if canvas.width() != target_w {
        canvas.set_width(target_w);
    }
    if canvas.height() != target_h {
        canvas.set_height(target_h);
    }
}

pub fn event_canvas_coords(e: &MouseEvent, cv: &HtmlCanvasElement) -> (f64, f64) {
    // Client coordinates into canvas pixels, so hit testing survives CSS scaling.
    if let Some(el) = cv.dyn_ref::<web_sys::Element>() {
        let rect = el.get_bounding_client_rect();
        let x = (e.client_x() as f64 - rect.left()) * (cv.width() as f64) / rect.width().max(1.0);
        let y = (e.client_y() as f64 - rect.top()) * (cv.height() as f64) / rect.height().max(1.0);
        (x, y)
    } else {
        (e.offset_x() as f64, e.offset_y() as f64)
    }
}

/// Simple query string parser used at start-up.
pub fn get_query_param(search: &str, key: &str) -> Option<String> {
    let s = search.trim_start_matches('?');
    for pair in s.split('&') {
        let mut it = pair.splitn(2, '=');
        let k = it.next()?;
        let v = it.next().unwrap_or("");
        if k == key {
            return Some(url_decode(v));
        }
    }
    None
}

fn url_decode(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_encoding::percent_decode_str(&s)
        .decode_utf8_lossy()
        .to_string()
}

/// Reads `window.__PARKING_CONFIG` (a JSON string or a plain object) and
/// applies the `api`, `history`, `offline` and `timeout` query overrides.
pub fn load_config(window: &Window) -> ParkingConfig {
    let raw = js_sys::Reflect::get(window, &JsValue::from_str("__PARKING_CONFIG"))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
        .and_then(|v| {
            v.as_string()
                .or_else(|| js_sys::JSON::stringify(&v).ok().and_then(|s| s.as_string()))
        });
    let base = match raw {
        Some(text) => ParkingConfig::from_json(&text).unwrap_or_else(|e| {
            log(&format!("Ignoring window.__PARKING_CONFIG: {e}"));
            ParkingConfig::default()
        }),
        None => ParkingConfig::default(),
    };
    let search = window.location().search().unwrap_or_default();
    apply_query_overrides(base, &search)
}

pub fn apply_query_overrides(mut cfg: ParkingConfig, search: &str) -> ParkingConfig {
    if let Some(api) = get_query_param(search, "api") {
        let api = api.trim().trim_end_matches('/');
        if !api.is_empty() {
            cfg.api_base = api.to_string();
        }
    }
    if let Some(policy) = get_query_param(search, "history").and_then(|p| HistoryPolicy::parse(&p)) {
        cfg.history_policy = policy;
    }
    if let Some(flag) = get_query_param(search, "offline") {
        cfg.start_offline = matches!(flag.as_str(), "" | "1" | "true" | "yes");
    }
    if let Some(ms) = get_query_param(search, "timeout").and_then(|t| t.parse::<u32>().ok())
        && ms > 0
    {
        cfg.request_timeout_ms = ms;
    }
    cfg
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn query_params() {
        let q = "?api=http%3A%2F%2Flot.local%3A9000&offline&x=a+b";
        assert_eq!(
            get_query_param(q, "api").as_deref(),
            Some("http://lot.local:9000")
        );
        assert_eq!(get_query_param(q, "offline").as_deref(), Some(""));
        assert_eq!(get_query_param(q, "x").as_deref(), Some("a b"));
        assert_eq!(get_query_param(q, "missing"), None);
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let cfg = apply_query_overrides(
            ParkingConfig::default(),
            "?api=https://p.example/&history=required&offline=1&timeout=2500",
        );
        assert_eq!(cfg.api_base, "https://p.example");
        assert_eq!(cfg.history_policy, HistoryPolicy::Required);
        assert!(cfg.start_offline);
        assert_eq!(cfg.request_timeout_ms, 2500);
    }

    #[test]
    fn bad_overrides_are_ignored() {
        let cfg = apply_query_overrides(
            ParkingConfig::default(),
            "?history=sometimes&timeout=0&offline=no",
        );
        assert_eq!(cfg, ParkingConfig::default());
    }
}
