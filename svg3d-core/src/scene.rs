//! Scene description and render options as read from JSON documents
use serde::{Deserialize, Serialize};

use crate::color::{Color, Rgba};
use crate::error::{RenderError, Result};
use crate::loaders::{MeshFormat, MeshSource};
use crate::math::Vec3;
use crate::projection::Camera;

/// Subdivisions per side of a textured top face when a box does not specify one
pub const DEFAULT_PROJECTION_SUBDIVISION: u32 = 2;

/// Finer subdivisions are clamped to this; the grid grows as its square
pub const MAX_PROJECTION_SUBDIVISION: u32 = 64;

/// `{x, y, z}` point as written in scene documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Point3> for Vec3 {
    fn from(p: Point3) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

impl From<Vec3> for Point3 {
    fn from(v: Vec3) -> Self {
        Point3::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceImages {
    /// Image reference (URL or data URL) projected onto the top face
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<String>,
}

/// One box of the scene: drawn procedurally, or as the frame an external mesh is fitted into
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneBox {
    pub center: Point3,
    pub size: Point3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Point3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_label_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_images: Option<FaceImages>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection_subdivision: Option<u32>,
    #[serde(default)]
    pub draw_bounding_box: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stl_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stl_rotation: Option<Point3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stl_position: Option<Point3>,
    #[serde(default)]
    pub scale_stl_to_box: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_rotation: Option<Point3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_position: Option<Point3>,
    #[serde(default)]
    pub scale_obj_to_box: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub three_mf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub three_mf_rotation: Option<Point3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub three_mf_position: Option<Point3>,
    #[serde(default)]
    pub scale_three_mf_to_box: bool,

    /// Re-center an external mesh on the box center (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_model: Option<bool>,
}

/// The external mesh a box refers to, with its format-specific offsets
#[derive(Debug, Clone, PartialEq)]
pub struct MeshRef {
    pub source: MeshSource,
    pub rotation: Vec3,
    pub position: Vec3,
    pub scale_to_box: bool,
}

impl SceneBox {
    pub fn new(center: Point3, size: Point3) -> Self {
        Self {
            center,
            size,
            ..Default::default()
        }
    }

    pub fn center(&self) -> Vec3 {
        self.center.into()
    }

    pub fn size(&self) -> Vec3 {
        self.size.into()
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation.map(Vec3::from).unwrap_or_else(Vec3::zeros)
    }

    /// Fill color of procedural faces and the fallback for mesh triangles
    pub fn color(&self) -> Rgba {
        self.color.as_ref().map(Color::to_rgba).unwrap_or(Rgba::GRAY)
    }

    pub fn top_label_color(&self) -> Rgba {
        self.top_label_color
            .as_ref()
            .map(Color::to_rgba)
            .unwrap_or(Rgba::BLACK)
    }

    pub fn top_image(&self) -> Option<&str> {
        self.face_images.as_ref()?.top.as_deref()
    }

    pub fn projection_subdivision(&self) -> u32 {
        self.projection_subdivision
            .unwrap_or(DEFAULT_PROJECTION_SUBDIVISION)
            .clamp(1, MAX_PROJECTION_SUBDIVISION)
    }

    pub fn center_model(&self) -> bool {
        self.center_model.unwrap_or(true)
    }

    /// The external mesh reference, checked in STL, OBJ, 3MF order
    pub fn mesh_ref(&self) -> Option<MeshRef> {
        let offset = |p: Option<Point3>| p.map(Vec3::from).unwrap_or_else(Vec3::zeros);
        let candidates = [
            (
                MeshFormat::Stl,
                &self.stl_url,
                self.stl_rotation,
                self.stl_position,
                self.scale_stl_to_box,
            ),
            (
                MeshFormat::Obj,
                &self.obj_url,
                self.obj_rotation,
                self.obj_position,
                self.scale_obj_to_box,
            ),
            (
                MeshFormat::ThreeMf,
                &self.three_mf_url,
                self.three_mf_rotation,
                self.three_mf_position,
                self.scale_three_mf_to_box,
            ),
        ];
        candidates
            .into_iter()
            .find_map(|(format, url, rotation, position, scale_to_box)| {
                url.as_ref().map(|url| MeshRef {
                    source: MeshSource::new(format, url.clone()),
                    rotation: offset(rotation),
                    position: offset(position),
                    scale_to_box,
                })
            })
    }

    fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: String| RenderError::InvalidBox { index, reason };
        if !self.center.is_finite() {
            return Err(invalid("center must be finite".into()));
        }
        let s = self.size;
        if !s.is_finite() || s.x < 0.0 || s.y < 0.0 || s.z < 0.0 {
            return Err(invalid(format!(
                "size must be finite and non-negative, got ({}, {}, {})",
                s.x, s.y, s.z
            )));
        }
        if self.rotation.is_some_and(|r| !r.is_finite()) {
            return Err(invalid("rotation must be finite".into()));
        }
        if self.projection_subdivision == Some(0) {
            return Err(invalid("projectionSubdivision must be at least 1".into()));
        }
        Ok(())
    }
}

/// Boxes plus the camera looking at them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub boxes: Vec<SceneBox>,
    pub camera: Camera,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            boxes: Vec::new(),
            camera,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject scenes that cannot be interpreted at all
    pub fn validate(&self) -> Result<()> {
        self.camera.validate()?;
        self.boxes
            .iter()
            .enumerate()
            .try_for_each(|(i, b)| b.validate(i))
    }
}

/// Axis plane the grid overlay lies in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridPlane {
    Xy,
    Yz,
    #[default]
    Xz,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridOptions {
    pub cell_size: f64,
    pub plane: GridPlane,
    /// Number of cells drawn on each side of the origin
    pub extent: u32,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            plane: GridPlane::Xz,
            extent: 10,
        }
    }
}

/// Output configuration of a render call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    pub show_grid: bool,
    pub grid: GridOptions,
    pub show_axes: bool,
    pub show_origin: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            background_color: None,
            show_grid: false,
            grid: GridOptions::default(),
            show_axes: false,
            show_origin: false,
        }
    }
}

impl RenderOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::InvalidOptions(format!(
                "image size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let cell = self.grid.cell_size;
        if self.show_grid && !(cell.is_finite() && cell > 0.0) {
            return Err(RenderError::InvalidOptions(format!(
                "grid cell size must be positive, got {cell}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene_document() {
        let json = r##"{
            "boxes": [
                {
                    "center": {"x": 0, "y": 0, "z": 0},
                    "size": {"x": 2, "y": 2, "z": 2},
                    "color": "rgba(255,0,0,0.5)",
                    "topLabel": "A",
                    "faceImages": {"top": "data:image/png;base64,AAAA"},
                    "drawBoundingBox": true
                },
                {
                    "center": {"x": 3, "y": 0, "z": 0},
                    "size": {"x": 1, "y": 1, "z": 1},
                    "objUrl": "model.obj",
                    "objRotation": {"x": 1.5, "y": 0, "z": 0},
                    "scaleObjToBox": true,
                    "centerModel": false
                }
            ],
            "camera": {"position": {"x": 5, "y": 5, "z": 5}, "lookAt": {"x": 0, "y": 0, "z": 0}}
        }"##;
        let scene = Scene::from_json(json).unwrap();
        assert_eq!(scene.boxes.len(), 2);
        let first = &scene.boxes[0];
        assert_eq!(first.color(), Rgba::new(255.0, 0.0, 0.0, 0.5));
        assert_eq!(first.top_image(), Some("data:image/png;base64,AAAA"));
        assert!(first.draw_bounding_box);
        assert!(first.mesh_ref().is_none());
        assert_eq!(first.projection_subdivision(), DEFAULT_PROJECTION_SUBDIVISION);

        let second = &scene.boxes[1];
        let mesh = second.mesh_ref().unwrap();
        assert_eq!(mesh.source.format, MeshFormat::Obj);
        assert_eq!(mesh.rotation, Vec3::new(1.5, 0.0, 0.0));
        assert!(mesh.scale_to_box);
        assert!(!second.center_model());
        assert_eq!(second.color(), Rgba::GRAY);
        assert_eq!(scene.camera.focal_length(), 2.0);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_missing_camera_is_an_error() {
        assert!(matches!(
            Scene::from_json(r#"{"boxes": []}"#),
            Err(RenderError::Json(_))
        ));
    }

    #[test]
    fn test_mesh_ref_precedence() {
        let mut b = SceneBox::new(Point3::default(), Point3::new(1.0, 1.0, 1.0));
        b.three_mf_url = Some("a.3mf".into());
        b.stl_url = Some("a.stl".into());
        b.stl_position = Some(Point3::new(0.0, 1.0, 0.0));
        let mesh = b.mesh_ref().unwrap();
        assert_eq!(mesh.source.format, MeshFormat::Stl);
        assert_eq!(mesh.position, Vec3::new(0.0, 1.0, 0.0));
        assert!(!mesh.scale_to_box);
    }

    #[test]
    fn test_validate_rejects_bad_boxes() {
        let camera = Camera::new(Point3::new(0.0, 0.0, 5.0), Point3::default());
        let mut scene = Scene::new(camera);
        scene
            .boxes
            .push(SceneBox::new(Point3::default(), Point3::new(1.0, -1.0, 1.0)));
        assert!(matches!(
            scene.validate(),
            Err(RenderError::InvalidBox { index: 0, .. })
        ));

        scene.boxes[0].size = Point3::new(1.0, 1.0, 1.0);
        scene.boxes[0].projection_subdivision = Some(0);
        assert!(scene.validate().is_err());

        scene.boxes[0].projection_subdivision = Some(3);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn test_projection_subdivision_clamped() {
        let mut b = SceneBox::new(Point3::default(), Point3::new(1.0, 1.0, 1.0));
        b.projection_subdivision = Some(70_000);
        assert_eq!(b.projection_subdivision(), MAX_PROJECTION_SUBDIVISION);
        b.projection_subdivision = Some(u32::MAX);
        assert_eq!(b.projection_subdivision(), MAX_PROJECTION_SUBDIVISION);
        b.projection_subdivision = Some(5);
        assert_eq!(b.projection_subdivision(), 5);
    }

    #[test]
    fn test_options_defaults_and_validation() {
        let options = RenderOptions::from_json(r#"{"showGrid": true, "grid": {"plane": "xy"}}"#).unwrap();
        assert_eq!(options.width, 400);
        assert_eq!(options.height, 400);
        assert_eq!(options.grid.plane, GridPlane::Xy);
        assert_eq!(options.grid.cell_size, 1.0);
        assert!(options.validate().is_ok());

        let zero = RenderOptions {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(RenderError::InvalidOptions(_))));
    }
}
