use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use js_sys::Uint8Array;
use log::{info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{window, Response};

use super::{js_error, SharedApp, WeakApp};
use crate::catalog::ModelAsset;
use crate::config::ModelEntry;

/// Starts one download per catalog entry. Each result is reported back to
/// the catalog as it arrives.
pub(crate) fn load_models(app: &SharedApp) {
    let entries = app.borrow().viewer.catalog().entries().to_vec();
    for (index, entry) in entries.into_iter().enumerate() {
        spawn_local(load_model(Rc::downgrade(app), index, entry));
    }
}

async fn load_model(app: WeakApp, index: usize, entry: ModelEntry) {
    let result = fetch_model(&entry).await;
    let Some(app) = app.upgrade() else {
        return;
    };
    let mut state = app.borrow_mut();
    let reported = match result {
        Ok(asset) => {
            info!(
                "loaded {} ({} meshes, {} nodes)",
                entry.name, asset.mesh_count, asset.node_count
            );
            state.viewer.model_loaded(index, asset)
        }
        Err(err) => state.viewer.model_failed(index, format!("{err:#}")),
    };
    if let Err(err) = reported {
        warn!("{err}");
    }
}

async fn fetch_model(entry: &ModelEntry) -> Result<ModelAsset> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let response: Response = JsFuture::from(window.fetch_with_str(&entry.path))
        .await
        .map_err(|err| anyhow!("fetch failed: {}", js_error(&err)))?
        .dyn_into()
        .map_err(|_| anyhow!("fetch did not return a Response"))?;
    if !response.ok() {
        return Err(anyhow!("HTTP {} {}", response.status(), response.status_text()));
    }
    let body = response
        .array_buffer()
        .map_err(|err| anyhow!("failed to read body: {}", js_error(&err)))?;
    let buffer = JsFuture::from(body)
        .await
        .map_err(|err| anyhow!("failed to read body: {}", js_error(&err)))?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    ModelAsset::from_gltf_slice(entry.name.clone(), &bytes)
        .with_context(|| format!("failed to parse {}", entry.path))
}
