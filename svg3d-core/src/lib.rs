//! svg3d core library: declarative 3D box scenes rendered to SVG
//!
//! A [`Scene`] of boxes (optionally standing in for external STL, OBJ or 3MF
//! meshes) is projected through a pinhole camera, ordered with a BSP tree and
//! written out as a self-contained SVG document. External meshes are resolved
//! through a host-owned [`MeshCache`].

pub mod affine;
pub mod bsp;
pub mod cache;
pub mod color;
pub mod elements;
pub mod error;
pub mod geometry;
pub mod loaders;
pub mod math;
pub mod overlay;
pub mod placement;
pub mod projection;
pub mod scene;
pub mod svg;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// Re-export commonly used types
pub use cache::MeshCache;
pub use color::{parse_color, Color, Rgba};
pub use elements::{build_render_elements, RenderElement, RenderOutput};
pub use error::{LoadError, RenderError, Result};
pub use geometry::{Mesh, Triangle};
pub use loaders::{DefaultFetcher, MeshFormat, MeshSource, SourceFetcher};
pub use projection::Camera;
pub use scene::{FaceImages, GridOptions, GridPlane, Point3, RenderOptions, Scene, SceneBox};
pub use svg::to_svg;

/// Load every external mesh the scene refers to.
///
/// Each distinct source is loaded once. Sources that fail to load are
/// reported as warnings and left out, so their boxes render as nothing.
pub fn resolve_meshes(scene: &Scene, cache: &MeshCache) -> HashMap<MeshSource, Arc<Mesh>> {
    let mut meshes = HashMap::new();
    let mut seen = HashSet::new();
    for (index, scene_box) in scene.boxes.iter().enumerate() {
        let Some(mesh_ref) = scene_box.mesh_ref() else {
            continue;
        };
        if !seen.insert(mesh_ref.source.clone()) {
            continue;
        }
        match cache.load(&mesh_ref.source) {
            Ok(mesh) => {
                meshes.insert(mesh_ref.source, mesh);
            }
            Err(e) => {
                tracing::warn!(box_index = index, source = %mesh_ref.source, error = %e, "failed to load mesh");
            }
        }
    }
    meshes
}

/// Render a scene to an SVG document
pub fn render_scene(scene: &Scene, options: &RenderOptions, cache: &MeshCache) -> Result<String> {
    scene.validate()?;
    let meshes = resolve_meshes(scene, cache);
    let output = build_render_elements(scene, options, &meshes)?;
    Ok(to_svg(&output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_scene_smoke() {
        let mut scene = Scene::new(Camera::new(Point3::new(5.0, 5.0, 5.0), Point3::default()));
        scene
            .boxes
            .push(SceneBox::new(Point3::default(), Point3::new(2.0, 2.0, 2.0)));
        let svg = render_scene(&scene, &RenderOptions::default(), &MeshCache::new()).unwrap();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polygon").count(), 3);
    }

    #[test]
    fn test_failed_source_is_left_out() {
        let mut scene = Scene::new(Camera::new(Point3::new(5.0, 5.0, 5.0), Point3::default()));
        let mut b = SceneBox::new(Point3::default(), Point3::new(1.0, 1.0, 1.0));
        b.stl_url = Some("/nonexistent/svg3d/model.stl".into());
        scene.boxes.push(b.clone());
        scene.boxes.push(b);
        let cache = MeshCache::new();
        assert!(resolve_meshes(&scene, &cache).is_empty());
        assert!(cache.is_empty());
    }
}
