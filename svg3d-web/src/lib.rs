//! svg3d Web - WASM bindings for JavaScript hosts
//!
//! Exposes a synchronous `renderScene(sceneJson, optionsJson)` returning the
//! SVG document as a string. Meshes are read from `data:` URLs and cached per
//! renderer instance.

use svg3d_core::{render_scene, MeshCache, RenderOptions, Scene};
use wasm_bindgen::prelude::*;

/// Renderer holding a mesh cache across calls
#[wasm_bindgen]
#[derive(Default)]
pub struct SceneRenderer {
    cache: MeshCache,
}

#[wasm_bindgen]
impl SceneRenderer {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SceneRenderer {
        SceneRenderer::default()
    }

    /// Render a scene document; `options_json` may be omitted for defaults
    pub fn render(&self, scene_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
        render_json(&self.cache, scene_json, options_json.as_deref()).map_err(|e| JsValue::from_str(&e))
    }

    /// Number of meshes currently cached
    #[wasm_bindgen(js_name = cachedMeshes)]
    pub fn cached_meshes(&self) -> usize {
        self.cache.len()
    }

    #[wasm_bindgen(js_name = clearCache)]
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

/// One-shot render with a fresh mesh cache
#[wasm_bindgen(js_name = renderScene)]
pub fn render_scene_json(scene_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    render_json(&MeshCache::new(), scene_json, options_json.as_deref()).map_err(|e| JsValue::from_str(&e))
}

fn render_json(cache: &MeshCache, scene_json: &str, options_json: Option<&str>) -> Result<String, String> {
    let scene = Scene::from_json(scene_json).map_err(|e| e.to_string())?;
    let options = match options_json {
        Some(json) if !json.trim().is_empty() => RenderOptions::from_json(json).map_err(|e| e.to_string())?,
        _ => RenderOptions::default(),
    };
    let svg = render_scene(&scene, &options, cache).map_err(|e| e.to_string())?;
    tracing::debug!(bytes = svg.len(), "rendered scene");
    Ok(svg)
}
