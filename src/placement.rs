use log::{debug, info};

use crate::catalog::ModelCatalog;
use crate::scene::{ObjectId, Scene};

/// Drops a copy of model `index` at the reticle.
///
/// Nothing happens while the reticle is hidden or when the model has not
/// loaded. The copy takes the reticle's translation and rotation and the
/// model's configured uniform scale.
pub fn place_at_reticle(scene: &mut Scene, catalog: &ModelCatalog, index: usize) -> Option<ObjectId> {
    if !scene.reticle.visible {
        debug!("select ignored: no surface under the reticle");
        return None;
    }
    let (Some(entry), Some(asset)) = (catalog.entry(index), catalog.asset(index)) else {
        debug!("select ignored: model #{index} is not loaded");
        return None;
    };

    let transform = scene.reticle.transform.with_uniform_scale(entry.scale);
    let id = scene.add_object(index, asset.name.clone(), transform, asset.bounds);
    info!(
        "placed {} at ({:.2}, {:.2}, {:.2})",
        asset.name, transform.translation.x, transform.translation.y, transform.translation.z
    );
    Some(id)
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;
    use crate::catalog::ModelAsset;
    use crate::config::ModelEntry;
    use crate::transform::Transform;

    fn loaded_catalog() -> ModelCatalog {
        let mut catalog = ModelCatalog::new(vec![
            ModelEntry::new("Chair", "chair.glb", 0.01),
            ModelEntry::new("Table", "table.glb", 0.005),
        ]);
        catalog.mark_loaded(0, ModelAsset::empty("Chair")).unwrap();
        catalog.mark_loaded(1, ModelAsset::empty("Table")).unwrap();
        catalog
    }

    fn reticle_transform() -> Transform {
        Transform {
            translation: Vec3::new(0.4, -1.2, -2.0),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::ONE,
        }
    }

    #[test]
    fn hidden_reticle_places_nothing() {
        let mut scene = Scene::new();
        assert!(place_at_reticle(&mut scene, &loaded_catalog(), 0).is_none());
        assert!(scene.objects.is_empty());
    }

    #[test]
    fn visible_reticle_places_one_scaled_copy() {
        let mut scene = Scene::new();
        scene.reticle.show_at(reticle_transform());

        let id = place_at_reticle(&mut scene, &loaded_catalog(), 1).unwrap();
        assert_eq!(scene.objects.len(), 1);
        let object = scene.object(id).unwrap();
        assert_eq!(object.model_index, 1);
        assert_eq!(object.transform.translation, reticle_transform().translation);
        assert_eq!(object.transform.rotation, reticle_transform().rotation);
        assert_eq!(object.transform.scale, Vec3::splat(0.005));
    }

    #[test]
    fn unloaded_model_places_nothing() {
        let mut catalog = ModelCatalog::new(vec![ModelEntry::new("Chair", "chair.glb", 0.01)]);
        catalog.mark_failed(0, "network error").unwrap();
        let mut scene = Scene::new();
        scene.reticle.show_at(reticle_transform());
        assert!(place_at_reticle(&mut scene, &catalog, 0).is_none());
        assert!(scene.objects.is_empty());
    }

    #[test]
    fn repeated_selects_stack_objects() {
        let mut scene = Scene::new();
        scene.reticle.show_at(reticle_transform());
        let catalog = loaded_catalog();
        place_at_reticle(&mut scene, &catalog, 0);
        place_at_reticle(&mut scene, &catalog, 0);
        assert_eq!(scene.objects.len(), 2);
    }
}
