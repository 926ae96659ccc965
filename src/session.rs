use std::fmt;

use log::{info, warn};

use crate::config::{SessionConfig, VideoMode};
use crate::error::{Result, ViewerError};

pub const FEATURE_HIT_TEST: &str = "hit-test";
pub const FEATURE_DOM_OVERLAY: &str = "dom-overlay";
pub const FEATURE_LIGHT_ESTIMATION: &str = "light-estimation";

/// Lifecycle of the AR session owned by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Starting,
    Active,
    Ending,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Inactive => "inactive",
            SessionState::Starting => "starting",
            SessionState::Active => "active",
            SessionState::Ending => "ending",
        };
        f.write_str(name)
    }
}

/// Result of the platform capability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformSupport {
    Unknown,
    Supported,
    Unsupported,
}

/// Parameters of the `requestSession("immersive-ar", ...)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInit {
    pub required_features: Vec<&'static str>,
    pub optional_features: Vec<&'static str>,
    /// DOM overlay root element id, `None` for `document.body`.
    pub overlay_root: Option<String>,
    pub video: VideoMode,
}

impl SessionInit {
    pub fn from_config(config: &SessionConfig) -> Self {
        let mut required_features = Vec::new();
        let mut optional_features = Vec::new();
        if config.require_hit_test {
            required_features.push(FEATURE_HIT_TEST);
        } else {
            optional_features.push(FEATURE_HIT_TEST);
        }
        if config.dom_overlay {
            optional_features.push(FEATURE_DOM_OVERLAY);
        }
        if config.light_estimation {
            optional_features.push(FEATURE_LIGHT_ESTIMATION);
        }
        Self {
            required_features,
            optional_features,
            overlay_root: config.overlay_root.clone(),
            video: config.video,
        }
    }

    pub fn wants(&self, feature: &str) -> bool {
        self.required_features.contains(&feature) || self.optional_features.contains(&feature)
    }
}

/// Handle returned by the platform for a requested animation frame.
pub type FrameHandle = u32;

/// A live platform AR session.
///
/// Implementations wrap the browser `XRSession`; the headless build provides
/// a scripted one.
pub trait XrSession {
    /// Asks the platform for the next frame callback.
    fn request_animation_frame(&mut self) -> Result<FrameHandle>;

    fn cancel_animation_frame(&mut self, handle: FrameHandle);

    /// Asks the platform to end the session. Completion is signalled by the
    /// platform's `end` event.
    fn end(&mut self) -> Result<()>;
}

/// A camera track acquired by the viewer itself.
pub trait MediaTrack {
    fn stop(&mut self);
}

/// What the caller must do after [`SessionLifecycle::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Request a session with the given parameters and report back.
    Start(SessionInit),
    /// The session is shutting down; wait for the platform `end` event.
    Ending,
    /// A transition is already in flight.
    Busy,
    /// The platform cannot run AR sessions, or has not said yet.
    Unavailable,
}

/// Session state machine.
///
/// The platform work (promises, permission prompts) happens outside; callers
/// report the results through [`started`](Self::started),
/// [`rejected`](Self::rejected) and [`ended`](Self::ended).
pub struct SessionLifecycle<S> {
    init: SessionInit,
    state: SessionState,
    support: PlatformSupport,
    session: Option<S>,
    camera: Option<Box<dyn MediaTrack>>,
    pending_frame: Option<FrameHandle>,
    last_error: Option<ViewerError>,
}

impl<S: XrSession> SessionLifecycle<S> {
    pub fn new(init: SessionInit) -> Self {
        Self {
            init,
            state: SessionState::Inactive,
            support: PlatformSupport::Unknown,
            session: None,
            camera: None,
            pending_frame: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn support(&self) -> PlatformSupport {
        self.support
    }

    pub fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut S> {
        self.session.as_mut()
    }

    pub fn has_camera_track(&self) -> bool {
        self.camera.is_some()
    }

    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending_frame
    }

    /// Error from the most recent failed start, cleared by the next start.
    pub fn last_error(&self) -> Option<&ViewerError> {
        self.last_error.as_ref()
    }

    pub fn set_support(&mut self, supported: bool) {
        self.support = if supported {
            PlatformSupport::Supported
        } else {
            PlatformSupport::Unsupported
        };
        if supported {
            info!("immersive-ar sessions are supported");
        } else {
            warn!("{}", ViewerError::Unsupported);
        }
    }

    pub fn toggle(&mut self) -> ToggleOutcome {
        match self.state {
            SessionState::Inactive => {
                match self.support {
                    PlatformSupport::Supported => {}
                    PlatformSupport::Unsupported => {
                        warn!("ignoring AR start: {}", ViewerError::Unsupported);
                        return ToggleOutcome::Unavailable;
                    }
                    PlatformSupport::Unknown => {
                        warn!("ignoring AR start: support query has not finished");
                        return ToggleOutcome::Unavailable;
                    }
                }
                self.state = SessionState::Starting;
                self.last_error = None;
                info!("requesting immersive-ar session");
                ToggleOutcome::Start(self.init.clone())
            }
            SessionState::Active => {
                self.begin_end();
                ToggleOutcome::Ending
            }
            SessionState::Starting | SessionState::Ending => ToggleOutcome::Busy,
        }
    }

    /// Stores the granted session and arms the first frame.
    ///
    /// Fails when no start was in flight; the session is ended in that case.
    pub fn started(
        &mut self,
        mut session: S,
        camera: Option<Box<dyn MediaTrack>>,
        hit_test_available: bool,
    ) -> Result<()> {
        if self.state != SessionState::Starting {
            let message = format!("session granted while {}", self.state);
            if let Err(err) = session.end() {
                warn!("failed to end unexpected session: {err}");
            }
            if let Some(mut camera) = camera {
                camera.stop();
            }
            return Err(ViewerError::Platform(message));
        }

        if !hit_test_available {
            warn!("session started without a hit-test source; placement is disabled");
        }
        self.session = Some(session);
        self.camera = camera;
        self.state = SessionState::Active;
        info!("AR session active");
        if let Err(err) = self.rearm() {
            warn!("failed to request first frame: {err}");
        }
        Ok(())
    }

    /// Records a failed start and returns to *Inactive*.
    pub fn rejected(&mut self, error: ViewerError) {
        warn!("AR session start failed: {error}");
        if let Some(mut camera) = self.camera.take() {
            camera.stop();
        }
        self.state = SessionState::Inactive;
        self.last_error = Some(error);
    }

    /// Handles the platform `end` event. Returns `false` when no session was
    /// held.
    pub fn ended(&mut self) -> bool {
        if let Some(mut camera) = self.camera.take() {
            camera.stop();
        }
        self.pending_frame = None;
        let had_session = self.session.take().is_some();
        if had_session || self.state != SessionState::Inactive {
            info!("AR session ended");
        }
        self.state = SessionState::Inactive;
        had_session
    }

    /// Marks the outstanding frame request as consumed.
    pub fn frame_delivered(&mut self) {
        self.pending_frame = None;
    }

    /// Requests the next frame while the session is active.
    pub fn rearm(&mut self) -> Result<()> {
        if self.state != SessionState::Active {
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let handle = session.request_animation_frame()?;
        self.pending_frame = Some(handle);
        Ok(())
    }

    fn begin_end(&mut self) {
        self.state = SessionState::Ending;
        if let Some(mut camera) = self.camera.take() {
            camera.stop();
        }
        let Some(session) = self.session.as_mut() else {
            self.ended();
            return;
        };
        if let Some(handle) = self.pending_frame.take() {
            session.cancel_animation_frame(handle);
        }
        info!("ending AR session");
        if let Err(err) = session.end() {
            // No `end` event will follow a failed end request.
            warn!("session end request failed: {err}");
            self.ended();
        }
    }
}
