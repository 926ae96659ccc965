use anyhow::Result;
use glam::Vec3;
use log::debug;

use crate::scene::{CameraView, EstimatedLight, Scene};
use crate::transform::Transform;

/// Device pose for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerPose {
    pub transform: Transform,
    pub views: Vec<CameraView>,
}

/// Light estimate delivered with a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightEstimate {
    pub direction: Vec3,
    pub intensity: Vec3,
}

/// Change in light estimation reported with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LightUpdate {
    /// Estimation state unchanged.
    #[default]
    Unchanged,
    Estimate(LightEstimate),
    /// The platform stopped estimating.
    Lost,
}

/// What the platform reported for one animation frame.
///
/// `hits` holds hit-test poses ordered by the platform, nearest first. It is
/// empty when there was no hit or no hit-test source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameSnapshot {
    pub time_ms: f64,
    pub viewer_pose: Option<ViewerPose>,
    pub hits: Vec<Transform>,
    pub light: LightUpdate,
}

impl FrameSnapshot {
    pub fn with_hit(mut self, hit: Transform) -> Self {
        self.hits.push(hit);
        self
    }

    pub fn with_pose(mut self, pose: ViewerPose) -> Self {
        self.viewer_pose = Some(pose);
        self
    }
}

/// Draws the scene for the current frame.
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene) -> Result<()>;
}

/// Copies the platform results of one frame onto the scene.
///
/// A frame without a pose keeps the previous camera; a pose without views
/// falls back to the camera's own projection. A frame without hits hides the
/// reticle and leaves its transform alone.
pub fn apply_frame(scene: &mut Scene, frame: &FrameSnapshot) {
    if let Some(pose) = &frame.viewer_pose {
        scene.camera.transform = pose.transform;
        if pose.views.is_empty() {
            scene.camera.views = vec![scene.camera.mono_view()];
        } else {
            scene.camera.views.clone_from(&pose.views);
        }
    } else {
        debug!("no viewer pose at t={:.1}ms", frame.time_ms);
    }

    match frame.hits.first() {
        Some(hit) => scene.reticle.show_at(*hit),
        None => scene.reticle.hide(),
    }

    match frame.light {
        LightUpdate::Unchanged => {}
        LightUpdate::Estimate(estimate) => {
            scene.lighting.estimated = Some(EstimatedLight {
                direction: estimate.direction,
                intensity: estimate.intensity,
            });
        }
        LightUpdate::Lost => scene.lighting.estimated = None,
    }
}
