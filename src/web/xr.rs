use std::cell::Cell;

use glam::{Mat4, Vec3};
use gloo_events::EventListener;
use js_sys::{Array, Function, Object, Promise, Reflect};
use log::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    window, Document, Element, XrFrame, XrHitTestOptionsInit, XrHitTestResult, XrHitTestSource,
    XrReferenceSpace, XrReferenceSpaceType, XrRenderStateInit, XrSessionInit, XrSessionMode,
    XrView, XrViewerPose, XrWebGlLayer,
};

use super::dom::{self, WebCameraStream};
use super::{js_error, WeakApp};
use crate::config::VideoMode;
use crate::error::{Result, ViewerError};
use crate::frame::{FrameSnapshot, LightEstimate, LightUpdate, ViewerPose};
use crate::scene::{CameraView, ViewRect};
use crate::session::{
    FrameHandle, MediaTrack, SessionInit, SessionState, XrSession, FEATURE_DOM_OVERLAY,
    FEATURE_HIT_TEST, FEATURE_LIGHT_ESTIMATION,
};
use crate::transform::Transform;

/// A granted `immersive-ar` session together with the per-session platform
/// objects the frame loop reads from.
pub(crate) struct WebXrSession {
    session: web_sys::XrSession,
    reference_space: XrReferenceSpace,
    layer: XrWebGlLayer,
    hit_test_source: Option<XrHitTestSource>,
    light_probe: Option<JsValue>,
    estimating: Cell<bool>,
    app: WeakApp,
    frame_callback: Closure<dyn FnMut(f64, XrFrame)>,
    _listeners: Vec<EventListener>,
}

impl WebXrSession {
    fn new(
        app: WeakApp,
        session: web_sys::XrSession,
        reference_space: XrReferenceSpace,
        layer: XrWebGlLayer,
        hit_test_source: Option<XrHitTestSource>,
        light_probe: Option<JsValue>,
    ) -> Self {
        let frame_callback = {
            let app = app.clone();
            Closure::wrap(Box::new(move |time: f64, frame: XrFrame| {
                let Some(app) = app.upgrade() else {
                    return;
                };
                let mut guard = app.borrow_mut();
                let state = &mut *guard;
                let Some(snapshot) = state
                    .viewer
                    .session()
                    .map(|session| session.snapshot(time, &frame))
                else {
                    return;
                };
                state.viewer.on_frame(&snapshot, &mut state.renderer);
            }) as Box<dyn FnMut(f64, XrFrame)>)
        };

        let mut listeners = Vec::new();
        {
            let app = app.clone();
            listeners.push(EventListener::new(&session, "select", move |_| {
                let Some(app) = app.upgrade() else {
                    return;
                };
                let placed = app.borrow_mut().viewer.place_selected();
                match placed {
                    Some(id) => debug!("placed object #{}", id.0),
                    None => debug!("select ignored"),
                };
            }));
        }
        {
            let app = app.clone();
            // The viewer owns this listener; tear it down outside the dispatch.
            listeners.push(EventListener::new(&session, "end", move |_| {
                let app = app.clone();
                spawn_local(async move { finish_session(&app) });
            }));
        }

        Self {
            session,
            reference_space,
            layer,
            hit_test_source,
            light_probe,
            estimating: Cell::new(false),
            app,
            frame_callback,
            _listeners: listeners,
        }
    }

    fn snapshot(&self, time: f64, frame: &XrFrame) -> FrameSnapshot {
        let viewer_pose = frame
            .get_viewer_pose(&self.reference_space)
            .and_then(|pose| self.viewer_pose(&pose));
        let hits = match &self.hit_test_source {
            Some(source) => frame
                .get_hit_test_results(source)
                .iter()
                .filter_map(|result| result.dyn_into::<XrHitTestResult>().ok())
                .filter_map(|result| result.get_pose(&self.reference_space))
                .filter_map(|pose| Transform::from_column_major(&pose.transform().matrix()))
                .collect(),
            None => Vec::new(),
        };
        FrameSnapshot {
            time_ms: time,
            viewer_pose,
            hits,
            light: self.light_update(frame),
        }
    }

    fn viewer_pose(&self, pose: &XrViewerPose) -> Option<ViewerPose> {
        let transform = Transform::from_column_major(&pose.transform().matrix())?;
        let views = pose
            .views()
            .iter()
            .filter_map(|view| view.dyn_into::<XrView>().ok())
            .filter_map(|view| self.camera_view(&view))
            .collect();
        Some(ViewerPose { transform, views })
    }

    fn camera_view(&self, view: &XrView) -> Option<CameraView> {
        let viewport = self.layer.get_viewport(view)?;
        Some(CameraView {
            view: mat4(view.transform().inverse().matrix())?,
            projection: mat4(view.projection_matrix())?,
            viewport: ViewRect {
                x: viewport.x(),
                y: viewport.y(),
                width: viewport.width(),
                height: viewport.height(),
            },
        })
    }

    fn light_update(&self, frame: &XrFrame) -> LightUpdate {
        let Some(probe) = &self.light_probe else {
            return LightUpdate::Unchanged;
        };
        match read_light_estimate(frame, probe) {
            Some(estimate) => {
                self.estimating.set(true);
                LightUpdate::Estimate(estimate)
            }
            None if self.estimating.replace(false) => LightUpdate::Lost,
            None => LightUpdate::Unchanged,
        }
    }
}

impl XrSession for WebXrSession {
    fn request_animation_frame(&mut self) -> Result<FrameHandle> {
        Ok(self
            .session
            .request_animation_frame(self.frame_callback.as_ref().unchecked_ref()))
    }

    fn cancel_animation_frame(&mut self, handle: FrameHandle) {
        self.session.cancel_animation_frame(handle);
    }

    fn end(&mut self) -> Result<()> {
        let promise = self.session.end();
        let app = self.app.clone();
        spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                warn!("session end failed: {}", js_error(&err));
                // No `end` event follows a failed end.
                let ending = app
                    .upgrade()
                    .map(|app| app.borrow().viewer.state() == SessionState::Ending)
                    .unwrap_or(false);
                if ending {
                    finish_session(&app);
                }
            }
        });
        Ok(())
    }
}

/// Requests and configures a session, then hands it to the viewer. Any
/// failure returns the viewer to `Inactive` with the error shown.
pub(crate) async fn start_session(app: WeakApp, init: SessionInit) {
    let result = open_session(&app, &init).await;
    let Some(app) = app.upgrade() else {
        return;
    };
    let mut state = app.borrow_mut();
    match result {
        Ok(opened) => {
            state.renderer.attach_layer(opened.layer);
            let camera = opened
                .camera
                .map(|camera| Box::new(camera) as Box<dyn MediaTrack>);
            match state
                .viewer
                .session_started(opened.session, camera, opened.hit_test)
            {
                Ok(()) => info!("AR session started"),
                Err(err) => {
                    state.renderer.detach_layer();
                    warn!("{err}");
                }
            }
        }
        Err(err) => {
            warn!("{err}");
            state.viewer.session_rejected(err);
        }
    }
    dom::sync(&state);
}

fn finish_session(app: &WeakApp) {
    let Some(app) = app.upgrade() else {
        return;
    };
    let mut state = app.borrow_mut();
    state.viewer.on_session_end();
    state.renderer.detach_layer();
    info!("AR session ended");
    // Resize events were ignored while presenting.
    if let Some(window) = window() {
        let (width, height) = dom::window_size(&window);
        if state.viewer.resize(width, height) {
            state.renderer.resize(width, height);
        }
    }
    dom::sync(&state);
}

struct OpenedSession {
    session: WebXrSession,
    layer: XrWebGlLayer,
    camera: Option<WebCameraStream>,
    hit_test: bool,
}

async fn open_session(app: &WeakApp, init: &SessionInit) -> Result<OpenedSession> {
    let window = window().ok_or_else(|| ViewerError::Platform("window not available".into()))?;
    let document = window
        .document()
        .ok_or_else(|| ViewerError::Platform("document not available".into()))?;
    let options = session_options(&document, init)?;
    info!(
        "requesting immersive-ar (required: {:?}, optional: {:?})",
        init.required_features, init.optional_features
    );
    let session: web_sys::XrSession = JsFuture::from(
        window
            .navigator()
            .xr()
            .request_session_with_options(XrSessionMode::ImmersiveAr, &options),
    )
    .await
    .map_err(|err| ViewerError::SessionRejected(js_error(&err)))?
    .dyn_into()
    .map_err(|_| ViewerError::Platform("requestSession did not return an XRSession".into()))?;

    match configure(app, session.clone(), init).await {
        Ok(opened) => Ok(opened),
        Err(err) => {
            let promise = session.end();
            spawn_local(async move {
                if let Err(end_err) = JsFuture::from(promise).await {
                    warn!("failed to end half-configured session: {}", js_error(&end_err));
                }
            });
            Err(err)
        }
    }
}

async fn configure(
    app: &WeakApp,
    session: web_sys::XrSession,
    init: &SessionInit,
) -> Result<OpenedSession> {
    let gl = app
        .upgrade()
        .map(|app| app.borrow().renderer.context().clone())
        .ok_or_else(|| ViewerError::Platform("viewer was dropped".into()))?;
    let layer = XrWebGlLayer::new_with_web_gl2_rendering_context(&session, &gl)
        .map_err(|err| ViewerError::GraphicsContext(js_error(&err)))?;
    let render_state = XrRenderStateInit::new();
    render_state.set_base_layer(Some(&layer));
    session.update_render_state_with_state(&render_state);

    let reference_space = request_space(&session, XrReferenceSpaceType::Local).await?;

    let hit_test_source = if init.wants(FEATURE_HIT_TEST) {
        match request_hit_test_source(&session).await {
            Ok(source) => Some(source),
            Err(err) => {
                warn!("{err}");
                None
            }
        }
    } else {
        None
    };

    let light_probe = if init.wants(FEATURE_LIGHT_ESTIMATION) {
        request_light_probe(&session).await
    } else {
        None
    };

    let camera = match init.video {
        VideoMode::CameraStream => Some(WebCameraStream::acquire().await?),
        VideoMode::Passthrough => None,
    };

    let hit_test = hit_test_source.is_some();
    let session = WebXrSession::new(
        app.clone(),
        session,
        reference_space,
        layer.clone(),
        hit_test_source,
        light_probe,
    );
    Ok(OpenedSession {
        session,
        layer,
        camera,
        hit_test,
    })
}

fn session_options(document: &Document, init: &SessionInit) -> Result<XrSessionInit> {
    let options = Object::new();
    set_property(&options, "requiredFeatures", &features(&init.required_features))?;
    set_property(&options, "optionalFeatures", &features(&init.optional_features))?;
    if init.wants(FEATURE_DOM_OVERLAY) {
        let root: Option<Element> = match &init.overlay_root {
            Some(id) => document.get_element_by_id(id),
            None => document.body().map(Element::from),
        };
        match root {
            Some(root) => {
                let overlay = Object::new();
                set_property(&overlay, "root", &root)?;
                set_property(&options, "domOverlay", &overlay)?;
            }
            None => warn!("DOM overlay root not found, continuing without overlay"),
        }
    }
    Ok(options.unchecked_into())
}

fn features(names: &[&str]) -> Array {
    names.iter().map(|name| JsValue::from_str(name)).collect()
}

fn set_property(target: &Object, key: &str, value: &JsValue) -> Result<()> {
    Reflect::set(target, &JsValue::from_str(key), value)
        .map(|_| ())
        .map_err(|err| ViewerError::Platform(js_error(&err)))
}

async fn request_space(
    session: &web_sys::XrSession,
    kind: XrReferenceSpaceType,
) -> Result<XrReferenceSpace> {
    JsFuture::from(session.request_reference_space(kind))
        .await
        .map_err(|err| ViewerError::Platform(format!("{kind:?} space: {}", js_error(&err))))?
        .dyn_into()
        .map_err(|_| ViewerError::Platform(format!("{kind:?} space has the wrong type")))
}

async fn request_hit_test_source(session: &web_sys::XrSession) -> Result<XrHitTestSource> {
    let viewer_space = request_space(session, XrReferenceSpaceType::Viewer)
        .await
        .map_err(|err| ViewerError::HitTestSource(err.to_string()))?;
    let options = XrHitTestOptionsInit::new(&viewer_space);
    JsFuture::from(session.request_hit_test_source(&options))
        .await
        .map_err(|err| ViewerError::HitTestSource(js_error(&err)))?
        .dyn_into()
        .map_err(|_| ViewerError::HitTestSource("unexpected hit-test source type".into()))
}

/// Light estimation is looked up dynamically; browsers without the module
/// simply get no probe.
async fn request_light_probe(session: &web_sys::XrSession) -> Option<JsValue> {
    let request = Reflect::get(session, &JsValue::from_str("requestLightProbe"))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    let promise = request.call0(session).ok()?.dyn_into::<Promise>().ok()?;
    match JsFuture::from(promise).await {
        Ok(probe) => Some(probe),
        Err(err) => {
            debug!("light probe unavailable: {}", js_error(&err));
            None
        }
    }
}

fn read_light_estimate(frame: &XrFrame, probe: &JsValue) -> Option<LightEstimate> {
    let get = Reflect::get(frame, &JsValue::from_str("getLightEstimate"))
        .ok()?
        .dyn_into::<Function>()
        .ok()?;
    let estimate = get.call1(frame, probe).ok()?;
    if estimate.is_null() || estimate.is_undefined() {
        return None;
    }
    Some(LightEstimate {
        direction: read_point(&estimate, "primaryLightDirection")?,
        intensity: read_point(&estimate, "primaryLightIntensity")?,
    })
}

fn read_point(object: &JsValue, key: &str) -> Option<Vec3> {
    let point = Reflect::get(object, &JsValue::from_str(key)).ok()?;
    let component = |name: &str| Reflect::get(&point, &JsValue::from_str(name)).ok()?.as_f64();
    Some(Vec3::new(
        component("x")? as f32,
        component("y")? as f32,
        component("z")? as f32,
    ))
}

fn mat4(values: Vec<f32>) -> Option<Mat4> {
    let array: [f32; 16] = values.try_into().ok()?;
    Some(Mat4::from_cols_array(&array))
}
