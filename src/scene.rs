use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::catalog::Aabb;
use crate::transform::Transform;

/// Identifier handed out for every placed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// A model copy dropped into the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedObject {
    pub id: ObjectId,
    pub model_index: usize,
    pub name: String,
    pub transform: Transform,
    /// Model-space bounds of the source asset.
    pub bounds: Aabb,
}

/// Placement indicator. There is exactly one per scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Reticle {
    pub transform: Transform,
    pub visible: bool,
}

impl Reticle {
    pub const INNER_RADIUS: f32 = 0.15;
    pub const OUTER_RADIUS: f32 = 0.2;

    pub fn show_at(&mut self, transform: Transform) {
        self.transform = transform;
        self.visible = true;
    }

    /// Hides the reticle and keeps its last transform.
    pub fn hide(&mut self) {
        self.visible = false;
    }
}

/// Pixel rectangle of one view inside the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ViewRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One eye (or the single handheld view) of the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    /// World to eye matrix.
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: ViewRect,
}

/// Perspective camera driven by the device pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub transform: Transform,
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Drawing surface size, tracked while not presenting.
    pub viewport: ViewRect,
    /// Per-view matrices reported by the platform for the latest posed frame.
    pub views: Vec<CameraView>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            fov_degrees: 70.0,
            aspect: 1.0,
            near: 0.01,
            far: 20.0,
            viewport: ViewRect::default(),
            views: Vec::new(),
        }
    }
}

impl Camera {
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        self.viewport = ViewRect {
            x: 0,
            y: 0,
            width: width as i32,
            height: height as i32,
        };
    }

    /// Projection used outside of a posed XR frame.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            self.fov_degrees.to_radians(),
            self.aspect.max(0.01),
            self.near,
            self.far,
        )
    }

    /// Single view built from the camera's own projection, for poses that
    /// carry no per-eye views.
    pub fn mono_view(&self) -> CameraView {
        CameraView {
            view: self.transform.matrix().inverse(),
            projection: self.projection(),
            viewport: self.viewport,
        }
    }
}

/// Fixed sky/ground light used until the platform provides an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HemisphereLight {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub intensity: f32,
}

impl Default for HemisphereLight {
    fn default() -> Self {
        Self {
            sky_color: Vec3::ONE,
            ground_color: Vec3::new(0xbb as f32 / 255.0, 0xbb as f32 / 255.0, 1.0),
            intensity: 1.0,
        }
    }
}

/// Primary light reported by the platform's light estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatedLight {
    pub direction: Vec3,
    pub intensity: Vec3,
}

/// Which light currently illuminates the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActiveLight {
    Hemisphere(HemisphereLight),
    Estimated(EstimatedLight),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Lighting {
    pub hemisphere: HemisphereLight,
    pub estimated: Option<EstimatedLight>,
}

impl Lighting {
    pub fn active(&self) -> ActiveLight {
        match self.estimated {
            Some(light) => ActiveLight::Estimated(light),
            None => ActiveLight::Hemisphere(self.hemisphere),
        }
    }
}

/// Everything drawn during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Scene {
    pub objects: Vec<PlacedObject>,
    pub reticle: Reticle,
    pub camera: Camera,
    pub lighting: Lighting,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a placed copy of a model and returns its id.
    pub fn add_object(
        &mut self,
        model_index: usize,
        name: impl Into<String>,
        transform: Transform,
        bounds: Aabb,
    ) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(PlacedObject {
            id,
            model_index,
            name: name.into(),
            transform,
            bounds,
        });
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    /// Drops every per-session object; the camera surface size survives.
    pub fn reset(&mut self) {
        let aspect = self.camera.aspect;
        let viewport = self.camera.viewport;
        *self = Self::default();
        self.camera.aspect = aspect;
        self.camera.viewport = viewport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_are_sequential() {
        let mut scene = Scene::new();
        let bounds = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let a = scene.add_object(0, "Chair", Transform::IDENTITY, bounds);
        let b = scene.add_object(0, "Chair", Transform::IDENTITY, bounds);
        assert_ne!(a, b);
        assert_eq!(scene.objects.len(), 2);
        assert_eq!(scene.object(b).map(|o| o.name.as_str()), Some("Chair"));
    }

    #[test]
    fn hide_keeps_last_transform() {
        let mut reticle = Reticle::default();
        let at = Transform::from_translation(Vec3::new(0.0, 0.0, -1.0));
        reticle.show_at(at);
        reticle.hide();
        assert!(!reticle.visible);
        assert_eq!(reticle.transform, at);
    }

    #[test]
    fn estimated_light_overrides_hemisphere() {
        let mut lighting = Lighting::default();
        assert!(matches!(lighting.active(), ActiveLight::Hemisphere(_)));
        lighting.estimated = Some(EstimatedLight {
            direction: Vec3::NEG_Y,
            intensity: Vec3::splat(2.0),
        });
        assert!(matches!(lighting.active(), ActiveLight::Estimated(_)));
    }

    #[test]
    fn reset_clears_objects_but_keeps_aspect() {
        let mut scene = Scene::new();
        scene.camera.set_aspect(1920, 1080);
        scene.add_object(0, "Chair", Transform::IDENTITY, Aabb::new(Vec3::ZERO, Vec3::ONE));
        scene.reticle.show_at(Transform::IDENTITY);
        scene.reset();
        assert!(scene.objects.is_empty());
        assert!(!scene.reticle.visible);
        assert!((scene.camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        assert_eq!(scene.camera.viewport.width, 1920);
    }

    #[test]
    fn mono_view_uses_camera_projection() {
        let mut camera = Camera::default();
        camera.set_aspect(800, 400);
        camera.transform = Transform::from_translation(Vec3::new(0.0, 1.6, 0.0));
        let view = camera.mono_view();
        assert_eq!(view.projection, camera.projection());
        assert_eq!(view.viewport.width, 800);
        assert_eq!(view.viewport.height, 400);
        let eye = view.view.transform_point3(Vec3::new(0.0, 1.6, 0.0));
        assert!(eye.abs_diff_eq(Vec3::ZERO, 1e-6));
    }
}
