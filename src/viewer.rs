use log::{debug, error, info, warn};

use crate::catalog::{ModelAsset, ModelCatalog};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::frame::{apply_frame, FrameSnapshot, SceneRenderer};
use crate::placement::place_at_reticle;
use crate::scene::{ObjectId, Scene};
use crate::selection::ModelPicker;
use crate::session::{
    MediaTrack, SessionInit, SessionLifecycle, SessionState, ToggleOutcome,
    XrSession,
};
use crate::ui::ButtonView;

/// Whether a delivered frame was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// Delivered outside an active session; nothing was drawn or re-armed.
    Skipped,
}

/// Coordinates one AR session: lifecycle, frame loop, model picker and
/// placement.
///
/// The viewer never awaits anything. Hosts perform platform requests and
/// report the results back, which keeps all mutation on the event-loop thread.
pub struct ArViewer<S> {
    config: ViewerConfig,
    lifecycle: SessionLifecycle<S>,
    scene: Scene,
    catalog: ModelCatalog,
    picker: ModelPicker,
    frames_rendered: u64,
}

impl<S: XrSession> ArViewer<S> {
    pub fn new(config: ViewerConfig) -> Self {
        let init = SessionInit::from_config(&config.session);
        let catalog = ModelCatalog::new(config.models.clone());
        let picker = ModelPicker::new(catalog.len());
        Self {
            config,
            lifecycle: SessionLifecycle::new(init),
            scene: Scene::new(),
            catalog,
            picker,
            frames_rendered: 0,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn picker(&self) -> &ModelPicker {
        &self.picker
    }

    pub fn lifecycle(&self) -> &SessionLifecycle<S> {
        &self.lifecycle
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.state()
    }

    pub fn session(&self) -> Option<&S> {
        self.lifecycle.session()
    }

    pub fn session_mut(&mut self) -> Option<&mut S> {
        self.lifecycle.session_mut()
    }

    /// Number of frames processed across all sessions.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn button(&self) -> ButtonView {
        ButtonView::for_state(
            self.lifecycle.state(),
            self.lifecycle.support(),
            self.lifecycle.last_error(),
        )
    }

    pub fn set_platform_support(&mut self, supported: bool) {
        self.lifecycle.set_support(supported);
    }

    pub fn toggle_session(&mut self) -> ToggleOutcome {
        self.lifecycle.toggle()
    }

    pub fn session_started(
        &mut self,
        session: S,
        camera: Option<Box<dyn MediaTrack>>,
        hit_test_available: bool,
    ) -> Result<()> {
        self.lifecycle.started(session, camera, hit_test_available)
    }

    pub fn session_rejected(&mut self, error: ViewerError) {
        self.lifecycle.rejected(error);
    }

    /// Handles the platform `end` event and discards the session's scene.
    pub fn on_session_end(&mut self) {
        self.lifecycle.ended();
        self.scene.reset();
    }

    /// Runs one iteration of the frame loop.
    ///
    /// The next frame is requested before anything else so a slow render
    /// never stalls the loop. Render errors are logged and the loop continues.
    pub fn on_frame<R: SceneRenderer>(
        &mut self,
        frame: &FrameSnapshot,
        renderer: &mut R,
    ) -> FrameOutcome {
        if !self.lifecycle.is_active() {
            debug!("dropping frame delivered while {}", self.lifecycle.state());
            return FrameOutcome::Skipped;
        }
        self.lifecycle.frame_delivered();
        if let Err(err) = self.lifecycle.rearm() {
            warn!("failed to request next frame: {err}");
        }

        self.frames_rendered += 1;
        apply_frame(&mut self.scene, frame);
        if let Err(err) = renderer.render(&self.scene) {
            error!("render failed: {err:#}");
        }
        FrameOutcome::Rendered
    }

    /// Thumbnail click handler.
    pub fn select_model(&mut self, index: usize) -> Result<()> {
        self.picker.select(index)?;
        if let Some(entry) = self.catalog.entry(index) {
            info!("selected model #{index} ({})", entry.name);
        }
        Ok(())
    }

    /// Platform `select` handler.
    pub fn place_selected(&mut self) -> Option<ObjectId> {
        place_at_reticle(&mut self.scene, &self.catalog, self.picker.selected())
    }

    pub fn model_loaded(&mut self, index: usize, asset: ModelAsset) -> Result<()> {
        self.catalog.mark_loaded(index, asset)
    }

    pub fn model_failed(&mut self, index: usize, reason: impl Into<String>) -> Result<()> {
        self.catalog.mark_failed(index, reason)
    }

    /// Window resize handler. Returns `true` when the drawing surface should
    /// follow the window; sizes are owned by the platform while a session runs.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if self.lifecycle.state() != SessionState::Inactive {
            return false;
        }
        self.scene.camera.set_aspect(width, height);
        true
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::config::ModelEntry;
    use crate::headless::{HeadlessSession, SummaryRenderer};
    use crate::transform::Transform;

    fn config() -> ViewerConfig {
        ViewerConfig {
            models: vec![
                ModelEntry::new("Chair", "chair.glb", 0.01),
                ModelEntry::new("Table", "table.glb", 0.005),
            ],
            ..ViewerConfig::default()
        }
    }

    fn active_viewer() -> ArViewer<HeadlessSession> {
        let mut viewer = ArViewer::new(config());
        viewer.set_platform_support(true);
        viewer.model_loaded(0, ModelAsset::empty("Chair")).unwrap();
        viewer.model_loaded(1, ModelAsset::empty("Table")).unwrap();
        assert!(matches!(viewer.toggle_session(), ToggleOutcome::Start(_)));
        viewer
            .session_started(HeadlessSession::new(), None, true)
            .unwrap();
        viewer
    }

    /// Delivers the pending frame the way the display would; returns whether
    /// a callback fired.
    fn tick(
        viewer: &mut ArViewer<HeadlessSession>,
        renderer: &mut SummaryRenderer,
        frame: &FrameSnapshot,
    ) -> bool {
        let delivered = viewer
            .session_mut()
            .and_then(HeadlessSession::take_frame)
            .is_some();
        if delivered {
            viewer.on_frame(frame, renderer);
        }
        delivered
    }

    fn floor_hit() -> Transform {
        Transform::from_translation(Vec3::new(0.0, -1.4, -1.0))
    }

    #[test]
    fn end_stops_frame_callbacks() {
        let mut viewer = active_viewer();
        let mut renderer = SummaryRenderer::default();
        let frame = FrameSnapshot::default().with_hit(floor_hit());
        for _ in 0..3 {
            assert!(tick(&mut viewer, &mut renderer, &frame));
        }
        assert_eq!(viewer.frames_rendered(), 3);

        viewer.toggle_session();
        viewer.on_session_end();
        assert_eq!(viewer.state(), SessionState::Inactive);

        assert!(!tick(&mut viewer, &mut renderer, &frame));
        assert_eq!(viewer.frames_rendered(), 3);
        assert_eq!(renderer.frames, 3);
    }

    #[test]
    fn stale_frame_after_end_is_skipped() {
        let mut viewer = active_viewer();
        let mut renderer = SummaryRenderer::default();
        viewer.toggle_session();
        let outcome = viewer.on_frame(&FrameSnapshot::default(), &mut renderer);
        assert_eq!(outcome, FrameOutcome::Skipped);
        assert_eq!(viewer.frames_rendered(), 0);
        assert!(viewer.session().unwrap().pending_frame().is_none());
    }

    #[test]
    fn select_places_selected_model_at_reticle() {
        let mut viewer = active_viewer();
        let mut renderer = SummaryRenderer::default();
        viewer.select_model(1).unwrap();

        tick(&mut viewer, &mut renderer, &FrameSnapshot::default());
        assert!(viewer.place_selected().is_none());

        tick(
            &mut viewer,
            &mut renderer,
            &FrameSnapshot::default().with_hit(floor_hit()),
        );
        let id = viewer.place_selected().unwrap();
        let object = viewer.scene().object(id).unwrap();
        assert_eq!(object.model_index, 1);
        assert_eq!(object.transform.translation, floor_hit().translation);
        assert_eq!(object.transform.scale, Vec3::splat(0.005));
        assert_eq!(viewer.scene().objects.len(), 1);
    }

    #[test]
    fn session_end_discards_placed_objects() {
        let mut viewer = active_viewer();
        let mut renderer = SummaryRenderer::default();
        tick(
            &mut viewer,
            &mut renderer,
            &FrameSnapshot::default().with_hit(floor_hit()),
        );
        viewer.place_selected();
        viewer.on_session_end();
        assert!(viewer.scene().objects.is_empty());
    }

    #[test]
    fn unsupported_platform_reports_unavailable() {
        let mut viewer: ArViewer<HeadlessSession> = ArViewer::new(config());
        viewer.set_platform_support(false);
        assert_eq!(viewer.toggle_session(), ToggleOutcome::Unavailable);
        assert!(viewer.session().is_none());
        assert!(!viewer.button().enabled);
        assert_eq!(viewer.button().label, crate::ui::LABEL_UNSUPPORTED);
    }

    #[test]
    fn resize_is_ignored_while_presenting() {
        let mut viewer = active_viewer();
        assert!(!viewer.resize(800, 600));
        viewer.toggle_session();
        viewer.on_session_end();
        assert!(viewer.resize(800, 400));
        assert!((viewer.scene().camera.aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn size_changed_during_session_applies_after_end() {
        let mut viewer = active_viewer();
        let aspect = viewer.scene().camera.aspect;
        assert!(!viewer.resize(1200, 400));
        assert_eq!(viewer.scene().camera.aspect, aspect);

        viewer.toggle_session();
        viewer.on_session_end();
        assert!(viewer.resize(1200, 400));
        assert!((viewer.scene().camera.aspect - 3.0).abs() < 1e-6);
        assert_eq!(viewer.scene().camera.viewport.width, 1200);
    }

    #[test]
    fn toggle_before_support_is_known_does_not_start() {
        let mut viewer: ArViewer<HeadlessSession> = ArViewer::new(config());
        assert_eq!(viewer.toggle_session(), ToggleOutcome::Unavailable);
        assert_eq!(viewer.state(), SessionState::Inactive);
        assert!(!viewer.button().enabled);
    }
}
