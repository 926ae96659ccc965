//! Browser host: wires the viewer to WebXR, WebGL2 and the page DOM.

mod assets;
mod dom;
mod renderer;
mod xr;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Reflect;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{window, HtmlCanvasElement, XrSessionMode};

use crate::config::ViewerConfig;
use crate::session::ToggleOutcome;
use crate::viewer::ArViewer;

use dom::DomUi;
use renderer::WebGlRenderer;
use xr::WebXrSession;

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
    dom::register_service_worker_on_load();
}

/// State shared by every browser callback.
pub(crate) struct AppState {
    pub(crate) viewer: ArViewer<WebXrSession>,
    pub(crate) renderer: WebGlRenderer,
}

type SharedApp = Rc<RefCell<AppState>>;
type WeakApp = Weak<RefCell<AppState>>;

#[wasm_bindgen]
pub struct WebApp {
    inner: SharedApp,
    _ui: DomUi,
}

#[wasm_bindgen]
impl WebApp {
    /// Builds the viewer on `canvas_id`. `config_xml` overrides the built-in
    /// furniture catalog.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: String, config_xml: Option<String>) -> Result<WebApp, JsValue> {
        let config = match config_xml {
            Some(xml) => ViewerConfig::from_xml(&xml)
                .map_err(|err| JsValue::from_str(&format!("invalid viewer config: {err:#}")))?,
            None => ViewerConfig::default(),
        };

        let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("document not available"))?;
        let canvas = document
            .get_element_by_id(&canvas_id)
            .ok_or_else(|| JsValue::from_str("canvas element not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str("element is not a canvas"))?;

        let renderer =
            WebGlRenderer::new(canvas).map_err(|err| JsValue::from_str(&format!("{err:#}")))?;
        let mut viewer = ArViewer::new(config);
        let (width, height) = dom::window_size(&window);
        viewer.resize(width, height);

        let mut state = AppState { viewer, renderer };
        state.renderer.resize(width, height);
        let inner = Rc::new(RefCell::new(state));

        let ui = DomUi::attach(&inner).map_err(|err| JsValue::from_str(&format!("{err:#}")))?;
        dom::sync(&inner.borrow());

        spawn_local(check_support(Rc::downgrade(&inner)));
        assets::load_models(&inner);

        info!("furniture viewer ready");
        Ok(Self { inner, _ui: ui })
    }

    /// Same as clicking the session button.
    pub fn toggle(&self) {
        toggle_session(&self.inner);
    }

    /// Same as clicking thumbnail `index`.
    pub fn select(&self, index: usize) -> Result<(), JsValue> {
        self.inner
            .borrow_mut()
            .viewer
            .select_model(index)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        dom::sync(&self.inner.borrow());
        Ok(())
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.inner.borrow().viewer.state().to_string()
    }
}

pub(crate) fn toggle_session(app: &SharedApp) {
    let outcome = app.borrow_mut().viewer.toggle_session();
    match outcome {
        ToggleOutcome::Start(init) => spawn_local(xr::start_session(Rc::downgrade(app), init)),
        ToggleOutcome::Ending => info!("ending AR session"),
        ToggleOutcome::Busy => info!("session transition already in progress"),
        ToggleOutcome::Unavailable => warn!("immersive AR is not available"),
    }
    dom::sync(&app.borrow());
}

async fn check_support(app: WeakApp) {
    let supported = match query_support().await {
        Ok(supported) => supported,
        Err(err) => {
            warn!("AR support query failed: {}", js_error(&err));
            false
        }
    };
    info!("immersive-ar supported: {supported}");
    if let Some(app) = app.upgrade() {
        app.borrow_mut().viewer.set_platform_support(supported);
        dom::sync(&app.borrow());
    }
}

async fn query_support() -> Result<bool, JsValue> {
    let window = window().ok_or_else(|| JsValue::from_str("window not available"))?;
    let navigator = window.navigator();
    let xr = Reflect::get(&navigator, &JsValue::from_str("xr"))?;
    if xr.is_undefined() || xr.is_null() {
        return Ok(false);
    }
    let result = JsFuture::from(
        navigator
            .xr()
            .is_session_supported(XrSessionMode::ImmersiveAr),
    )
    .await?;
    Ok(result.as_bool().unwrap_or(false))
}

/// Best-effort message for a rejected promise or thrown value.
pub(crate) fn js_error(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        return message;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    format!("{value:?}")
}
