use anyhow::{anyhow, Context, Result};
use glam::{Mat4, Vec3};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::ModelEntry;
use crate::error::ViewerError;

/// Axis-aligned bounds in model space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(point1: Vec3, point2: Vec3) -> Self {
        Self {
            min: point1.min(point2),
            max: point1.max(point2),
        }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self.corners().map(|corner| matrix.transform_point3(corner));
        let mut bounds = Self::new(corners[0], corners[0]);
        for corner in &corners[1..] {
            bounds.min = bounds.min.min(*corner);
            bounds.max = bounds.max.max(*corner);
        }
        bounds
    }
}

/// A parsed glTF model ready to be cloned into the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAsset {
    pub name: String,
    pub mesh_count: usize,
    pub node_count: usize,
    pub bounds: Aabb,
}

impl ModelAsset {
    /// Asset with no geometry, used when the mesh data is irrelevant.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mesh_count: 0,
            node_count: 0,
            bounds: Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
        }
    }

    /// Parses a binary (`.glb`) or JSON glTF document.
    ///
    /// Bounds come from the primitive accessors' min/max, pushed through the
    /// node hierarchy of the default scene.
    pub fn from_gltf_slice(name: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        let gltf = gltf::Gltf::from_slice(bytes).context("invalid glTF document")?;
        let scene = gltf
            .default_scene()
            .or_else(|| gltf.scenes().next())
            .ok_or_else(|| anyhow!("glTF document has no scenes"))?;

        let mut bounds: Option<Aabb> = None;
        for node in scene.nodes() {
            accumulate_bounds(&node, Mat4::IDENTITY, &mut bounds);
        }

        Ok(Self {
            name: name.into(),
            mesh_count: gltf.meshes().count(),
            node_count: gltf.nodes().count(),
            bounds: bounds.ok_or_else(|| anyhow!("glTF scene contains no meshes"))?,
        })
    }
}

fn accumulate_bounds(node: &gltf::Node<'_>, parent: Mat4, bounds: &mut Option<Aabb>) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            // bounding_box() panics on primitives without POSITION min/max.
            let Some(positions) = primitive.get(&gltf::Semantic::Positions) else {
                continue;
            };
            if positions.min().is_none() || positions.max().is_none() {
                continue;
            }
            let bbox = primitive.bounding_box();
            let local = Aabb::new(Vec3::from(bbox.min), Vec3::from(bbox.max)).transformed(&world);
            *bounds = Some(match bounds.take() {
                Some(existing) => existing.union(local),
                None => local,
            });
        }
    }
    for child in node.children() {
        accumulate_bounds(&child, world, bounds);
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Pending,
    Loaded(ModelAsset),
    Failed(String),
}

/// Fixed list of placeable models and their load state.
///
/// The list is sized once from configuration; entries only move from pending
/// to loaded or failed.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
    slots: Vec<Slot>,
}

impl ModelCatalog {
    pub fn new(entries: Vec<ModelEntry>) -> Self {
        let slots = vec![Slot::Pending; entries.len()];
        Self { entries, slots }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ModelEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&ModelEntry> {
        self.entries.get(index)
    }

    pub fn asset(&self, index: usize) -> Option<&ModelAsset> {
        match self.slots.get(index)? {
            Slot::Loaded(asset) => Some(asset),
            _ => None,
        }
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.asset(index).is_some()
    }

    pub fn loaded_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Loaded(_)))
            .count()
    }

    pub fn failure(&self, index: usize) -> Option<&str> {
        match self.slots.get(index)? {
            Slot::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn mark_loaded(&mut self, index: usize, asset: ModelAsset) -> Result<(), ViewerError> {
        let slot = self.slot_mut(index)?;
        info!("Loaded model #{index} ({})", asset.name);
        *slot = Slot::Loaded(asset);
        Ok(())
    }

    /// Records a load failure. The slot stays unusable for placement.
    pub fn mark_failed(
        &mut self,
        index: usize,
        reason: impl Into<String>,
    ) -> Result<(), ViewerError> {
        let reason = reason.into();
        let path = self
            .entries
            .get(index)
            .map(|entry| entry.path.clone())
            .unwrap_or_default();
        let slot = self.slot_mut(index)?;
        warn!(
            "{}",
            ViewerError::AssetLoad {
                path,
                reason: reason.clone()
            }
        );
        *slot = Slot::Failed(reason);
        Ok(())
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Slot, ViewerError> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(ViewerError::InvalidSelection { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ModelCatalog {
        ModelCatalog::new(vec![
            ModelEntry::new("Chair", "chair.glb", 0.01),
            ModelEntry::new("Table", "table.glb", 0.005),
        ])
    }

    #[test]
    fn slots_start_pending() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.loaded_count(), 0);
        assert!(catalog.asset(0).is_none());
    }

    #[test]
    fn mark_loaded_and_failed() {
        let mut catalog = catalog();
        catalog.mark_loaded(0, ModelAsset::empty("Chair")).unwrap();
        catalog.mark_failed(1, "404").unwrap();
        assert!(catalog.is_loaded(0));
        assert!(!catalog.is_loaded(1));
        assert_eq!(catalog.failure(1), Some("404"));
        assert_eq!(catalog.loaded_count(), 1);
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let mut catalog = catalog();
        assert_eq!(
            catalog.mark_loaded(5, ModelAsset::empty("Ghost")),
            Err(ViewerError::InvalidSelection { index: 5, len: 2 })
        );
    }

    #[test]
    fn garbage_bytes_are_not_a_model() {
        assert!(ModelAsset::from_gltf_slice("junk", b"not a gltf").is_err());
    }

    #[test]
    fn gltf_bounds_follow_node_transforms() {
        let json = r#"{
            "asset": {"version": "2.0"},
            "scene": 0,
            "scenes": [{"nodes": [0]}],
            "nodes": [{"mesh": 0, "translation": [0.0, 1.0, 0.0]}],
            "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
            "buffers": [{
                "byteLength": 36,
                "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
            }],
            "bufferViews": [{"buffer": 0, "byteLength": 36}],
            "accessors": [{
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [-1.0, 0.0, -1.0],
                "max": [1.0, 2.0, 1.0]
            }]
        }"#;
        let asset = ModelAsset::from_gltf_slice("tri", json.as_bytes()).unwrap();
        assert_eq!(asset.mesh_count, 1);
        assert_eq!(asset.node_count, 1);
        assert!(asset.bounds.min.abs_diff_eq(Vec3::new(-1.0, 1.0, -1.0), 1e-6));
        assert!(asset.bounds.max.abs_diff_eq(Vec3::new(1.0, 3.0, 1.0), 1e-6));
    }
}
