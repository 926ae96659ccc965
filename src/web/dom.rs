use std::rc::Rc;

use anyhow::{anyhow, Result};
use gloo_events::{EventListener, EventListenerOptions};
use js_sys::{Object, Reflect};
use log::{debug, info, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    window, Document, Element, HtmlElement, HtmlVideoElement, MediaStream,
    MediaStreamConstraints, MediaStreamTrack, Window,
};

use super::{js_error, toggle_session, AppState, SharedApp};
use crate::error::ViewerError;
use crate::session::MediaTrack;
use crate::ui::HIGHLIGHT_CLASS;

const BUTTON_ID: &str = "xr-button";
const CAMERA_FEED_ID: &str = "camera-feed";
const SERVICE_WORKER: &str = "./sw.js";

/// DOM listeners owned by the page for the lifetime of the app.
pub(crate) struct DomUi {
    _listeners: Vec<EventListener>,
}

impl DomUi {
    pub(crate) fn attach(app: &SharedApp) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow!("document not available"))?;
        let mut listeners = Vec::new();

        let button = session_button(&document)?;
        {
            let app = Rc::downgrade(app);
            listeners.push(EventListener::new(&button, "click", move |_| {
                if let Some(app) = app.upgrade() {
                    toggle_session(&app);
                }
            }));
        }

        let entries = app.borrow().viewer.catalog().entries().to_vec();
        for (index, entry) in entries.iter().enumerate() {
            let Some(thumbnail) = document.get_element_by_id(&thumbnail_id(index)) else {
                warn!("no thumbnail element for model #{index}");
                continue;
            };
            if let Some(image) = &entry.thumbnail {
                if let Err(err) = thumbnail.set_attribute("src", image) {
                    debug!("failed to set thumbnail for {}: {}", entry.name, js_error(&err));
                }
            }
            let app = Rc::downgrade(app);
            listeners.push(EventListener::new_with_options(
                &thumbnail,
                "click",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    // Keep the tap from reaching the session as a `select`.
                    event.prevent_default();
                    event.stop_propagation();
                    let Some(app) = app.upgrade() else {
                        return;
                    };
                    if let Err(err) = app.borrow_mut().viewer.select_model(index) {
                        warn!("{err}");
                    }
                    sync(&app.borrow());
                },
            ));
            listeners.push(EventListener::new_with_options(
                &thumbnail,
                "beforexrselect",
                EventListenerOptions::enable_prevent_default(),
                |event| {
                    event.prevent_default();
                    event.stop_propagation();
                },
            ));
        }

        {
            let app = Rc::downgrade(app);
            listeners.push(EventListener::new(&window, "resize", move |_| {
                let Some(app) = app.upgrade() else {
                    return;
                };
                let Some(window) = web_sys::window() else {
                    return;
                };
                let (width, height) = window_size(&window);
                let mut state = app.borrow_mut();
                if state.viewer.resize(width, height) {
                    state.renderer.resize(width, height);
                }
            }));
        }

        Ok(Self {
            _listeners: listeners,
        })
    }
}

/// Pushes the viewer state into the session button and thumbnails.
pub(crate) fn sync(state: &AppState) {
    let Some(document) = window().and_then(|window| window.document()) else {
        return;
    };
    if let Some(button) = document.get_element_by_id(BUTTON_ID) {
        let view = state.viewer.button();
        button.set_text_content(Some(view.label));
        let result = if view.enabled {
            button.remove_attribute("disabled")
        } else {
            button.set_attribute("disabled", "")
        };
        if let Err(err) = result {
            debug!("failed to update button: {}", js_error(&err));
        }
    }

    let picker = state.viewer.picker();
    for index in 0..state.viewer.catalog().len() {
        if let Some(thumbnail) = document.get_element_by_id(&thumbnail_id(index)) {
            let _ = thumbnail
                .class_list()
                .toggle_with_force(HIGHLIGHT_CLASS, picker.is_highlighted(index));
        }
    }
}

pub(crate) fn window_size(window: &Window) -> (u32, u32) {
    let width = window
        .inner_width()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(1.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(1.0);
    (width.max(1.0) as u32, height.max(1.0) as u32)
}

/// Registers the offline service worker once the page has loaded.
pub(crate) fn register_service_worker_on_load() {
    let Some(window) = window() else {
        return;
    };
    let loaded = window
        .document()
        .and_then(|document| Reflect::get(&document, &JsValue::from_str("readyState")).ok())
        .and_then(|state| state.as_string())
        .is_some_and(|state| state == "complete");
    if loaded {
        register_service_worker();
        return;
    }
    EventListener::once(&window, "load", |_| register_service_worker()).forget();
}

/// Failures are only logged.
fn register_service_worker() {
    let Some(window) = window() else {
        return;
    };
    let navigator = window.navigator();
    let available = Reflect::get(&navigator, &JsValue::from_str("serviceWorker"))
        .map(|value| !value.is_undefined())
        .unwrap_or(false);
    if !available {
        debug!("service workers unavailable");
        return;
    }
    let promise = navigator.service_worker().register(SERVICE_WORKER);
    spawn_local(async move {
        match JsFuture::from(promise).await {
            Ok(_) => info!("service worker registered"),
            Err(err) => warn!("service worker registration failed: {}", js_error(&err)),
        }
    });
}

fn thumbnail_id(index: usize) -> String {
    format!("item{index}")
}

/// Finds the session button, creating one at the end of the body when the
/// page does not provide it.
fn session_button(document: &Document) -> Result<Element> {
    if let Some(button) = document.get_element_by_id(BUTTON_ID) {
        return Ok(button);
    }
    let body = document
        .body()
        .ok_or_else(|| anyhow!("document has no body element"))?;
    let button = document
        .create_element("button")
        .map_err(|err| anyhow!("failed to create button: {}", js_error(&err)))?;
    button.set_id(BUTTON_ID);
    body.append_child(&button)
        .map_err(|err| anyhow!("failed to append button: {}", js_error(&err)))?;
    Ok(button)
}

/// Rear camera feed shown behind the canvas on platforms without
/// passthrough video.
pub(crate) struct WebCameraStream {
    stream: MediaStream,
    video: HtmlVideoElement,
}

impl WebCameraStream {
    pub(crate) async fn acquire() -> Result<Self, ViewerError> {
        let window = window().ok_or_else(|| ViewerError::Platform("window not available".into()))?;
        let document = window
            .document()
            .ok_or_else(|| ViewerError::Platform("document not available".into()))?;
        let devices = window
            .navigator()
            .media_devices()
            .map_err(|err| ViewerError::Platform(format!("no media devices: {}", js_error(&err))))?;

        let video_constraints = Object::new();
        Reflect::set(
            &video_constraints,
            &JsValue::from_str("facingMode"),
            &JsValue::from_str("environment"),
        )
        .map_err(|err| ViewerError::Platform(js_error(&err)))?;
        let constraints = MediaStreamConstraints::new();
        constraints.set_audio(&JsValue::FALSE);
        constraints.set_video(&video_constraints);

        let request = devices
            .get_user_media_with_constraints(&constraints)
            .map_err(|err| ViewerError::SessionRejected(format!("camera: {}", js_error(&err))))?;
        let stream: MediaStream = JsFuture::from(request)
            .await
            .map_err(|err| ViewerError::SessionRejected(format!("camera: {}", js_error(&err))))?
            .dyn_into()
            .map_err(|_| ViewerError::Platform("getUserMedia did not return a stream".into()))?;

        let video = camera_element(&document)?;
        video.set_src_object(Some(&stream));
        if let Err(err) = video.play() {
            warn!("camera preview did not start: {}", js_error(&err));
        }
        info!("camera stream attached");
        Ok(Self { stream, video })
    }
}

impl MediaTrack for WebCameraStream {
    fn stop(&mut self) {
        for track in self.stream.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
        self.video.set_src_object(None);
        debug!("camera stream stopped");
    }
}

fn camera_element(document: &Document) -> Result<HtmlVideoElement, ViewerError> {
    if let Some(existing) = document.get_element_by_id(CAMERA_FEED_ID) {
        return existing
            .dyn_into::<HtmlVideoElement>()
            .map_err(|_| ViewerError::Platform(format!("#{CAMERA_FEED_ID} is not a video")));
    }
    let body = document
        .body()
        .ok_or_else(|| ViewerError::Platform("document has no body element".into()))?;
    let video = document
        .create_element("video")
        .map_err(|err| ViewerError::Platform(js_error(&err)))?
        .dyn_into::<HtmlVideoElement>()
        .map_err(|_| ViewerError::Platform("created element is not a video".into()))?;
    video.set_id(CAMERA_FEED_ID);
    video.set_autoplay(true);
    video.set_muted(true);
    let _ = video.set_attribute("playsinline", "");

    let style = HtmlElement::style(&video);
    for (property, value) in [
        ("position", "fixed"),
        ("inset", "0"),
        ("width", "100%"),
        ("height", "100%"),
        ("object-fit", "cover"),
        ("z-index", "-1"),
    ] {
        let _ = style.set_property(property, value);
    }

    body.insert_before(&video, body.first_child().as_ref())
        .map_err(|err| ViewerError::Platform(js_error(&err)))?;
    Ok(video)
}
