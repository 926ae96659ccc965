//! Augmented-reality furniture viewer built on WebXR.
//!
//! The crate keeps the session coordinator platform-free: the lifecycle, the
//! per-frame update, placement and the model picker are plain state machines
//! that the browser host (the `web` module, wasm only) and the headless
//! simulator drive with platform results. Rendering, pose tracking and hit
//! testing stay with the platform.

pub mod catalog;
pub mod config;
pub mod error;
pub mod frame;
pub mod headless;
pub mod placement;
pub mod scene;
pub mod selection;
pub mod session;
pub mod transform;
pub mod ui;
pub mod viewer;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use catalog::{Aabb, ModelAsset, ModelCatalog};
pub use config::{ModelEntry, SessionConfig, VideoMode, ViewerConfig};
pub use error::ViewerError;
pub use frame::{FrameSnapshot, LightEstimate, LightUpdate, SceneRenderer, ViewerPose};
pub use headless::{HeadlessSession, SummaryRenderer};
pub use scene::{Camera, CameraView, ObjectId, PlacedObject, Reticle, Scene};
pub use selection::ModelPicker;
pub use session::{
    MediaTrack, PlatformSupport, SessionInit, SessionState, ToggleOutcome, XrSession,
};
pub use transform::Transform;
pub use ui::ButtonView;
pub use viewer::{ArViewer, FrameOutcome};
