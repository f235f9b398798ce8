//! Scene element builder: turns boxes and meshes into ordered render elements
use std::collections::HashMap;
use std::sync::Arc;

use nalgebra::{Point2, Vector2};

use crate::affine::Affine2;
use crate::bsp::{BspTree, Polygon};
use crate::color::{shade_by_normal, Rgba};
use crate::error::Result;
use crate::geometry::{box_vertices, Mesh, Triangle, BOX_EDGES, BOX_FACES, TOP_FACE};
use crate::loaders::MeshSource;
use crate::math::{lerp, Vec3};
use crate::overlay::{build_overlays, Overlay};
use crate::placement::place_mesh;
use crate::projection::{CameraBasis, Projector};
use crate::scene::{RenderOptions, Scene, SceneBox};

/// Stroke of bounding-box wireframe edges
pub const EDGE_STROKE: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.5);

/// A filled polygon in screen space
#[derive(Debug, Clone, PartialEq)]
pub struct FaceElement {
    pub points: Vec<Point2<f64>>,
    pub fill: Rgba,
    pub stroke: bool,
}

/// One triangle of a texture projected onto a top face.
///
/// `transform` maps texture space (the unit square) to the screen;
/// `clip` is the visible part of the triangle in texture space.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageElement {
    pub texture: usize,
    pub transform: Affine2,
    pub clip: Vec<Point2<f64>>,
}

/// Text laid flush with a box's top face
#[derive(Debug, Clone, PartialEq)]
pub struct LabelElement {
    pub text: String,
    pub fill: Rgba,
    pub transform: Affine2,
    pub depth: f64,
}

/// A wireframe edge of a box's bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeElement {
    pub points: [Point2<f64>; 2],
    pub stroke: Rgba,
    pub depth: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderElement {
    Face(FaceElement),
    Image(ImageElement),
    Label(LabelElement),
    Edge(EdgeElement),
}

/// Everything the serializer needs, in drawing order
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub width: u32,
    pub height: u32,
    pub background: Option<Rgba>,
    pub elements: Vec<RenderElement>,
    /// Unique texture references; `ImageElement::texture` indexes this list
    pub textures: Vec<String>,
    pub overlays: Vec<Overlay>,
}

/// What a polygon in the visibility tree stands for
#[derive(Debug, Clone, Copy, PartialEq)]
enum FaceKind {
    Solid {
        fill: Rgba,
        stroke: bool,
    },
    Texture {
        texture: usize,
        transform: Affine2,
        uv: [Point2<f64>; 3],
    },
}

/// Per-render mutable state; nothing here outlives one call
struct Builder<'a> {
    basis: CameraBasis,
    projector: Projector,
    meshes: &'a HashMap<MeshSource, Arc<Mesh>>,
    polygons: Vec<Polygon<FaceKind>>,
    labels: Vec<LabelElement>,
    edges: Vec<EdgeElement>,
    textures: Vec<String>,
    texture_ids: HashMap<String, usize>,
}

/// Box corners in world space, camera space and on screen
struct Corners {
    world: [Vec3; 8],
    camera: [Vec3; 8],
    screen: [Option<Point2<f64>>; 8],
}

impl Corners {
    fn screen_of<const N: usize>(&self, indices: &[usize; N]) -> Option<[Point2<f64>; N]> {
        let mut out = [Point2::origin(); N];
        for (slot, &i) in out.iter_mut().zip(indices) {
            *slot = self.screen[i]?;
        }
        Some(out)
    }

    fn max_depth(&self, indices: &[usize]) -> f64 {
        indices
            .iter()
            .map(|&i| self.camera[i].z)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Build the ordered render elements of a scene.
///
/// `meshes` holds the already resolved external meshes; a box whose mesh
/// is missing from it renders nothing.
pub fn build_render_elements(
    scene: &Scene,
    options: &RenderOptions,
    meshes: &HashMap<MeshSource, Arc<Mesh>>,
) -> Result<RenderOutput> {
    scene.validate()?;
    options.validate()?;

    let basis = scene.camera.basis()?;
    let projector = Projector::new(options.width, options.height, scene.camera.focal_length());
    let mut builder = Builder {
        basis,
        projector,
        meshes,
        polygons: Vec::new(),
        labels: Vec::new(),
        edges: Vec::new(),
        textures: Vec::new(),
        texture_ids: HashMap::new(),
    };

    for (index, scene_box) in scene.boxes.iter().enumerate() {
        builder.add_box(index, scene_box);
    }

    let Builder {
        polygons,
        mut labels,
        mut edges,
        textures,
        ..
    } = builder;

    let submitted = polygons.len();
    let tree = BspTree::build(polygons, &projector);
    tracing::debug!(
        faces = submitted,
        splits = tree.splits(),
        total = tree.len(),
        labels = labels.len(),
        edges = edges.len(),
        textures = textures.len(),
        "resolved visibility"
    );

    let mut elements: Vec<RenderElement> = tree
        .into_draw_order()
        .into_iter()
        .map(polygon_element)
        .collect();

    labels.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    edges.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    elements.extend(labels.into_iter().map(RenderElement::Label));
    elements.extend(edges.into_iter().map(RenderElement::Edge));

    Ok(RenderOutput {
        width: options.width,
        height: options.height,
        background: options.background_color.as_ref().map(|c| c.to_rgba()),
        elements,
        textures,
        overlays: build_overlays(&basis, &projector, options),
    })
}

fn polygon_element(polygon: Polygon<FaceKind>) -> RenderElement {
    match polygon.payload {
        FaceKind::Solid { fill, stroke } => RenderElement::Face(FaceElement {
            fill,
            // split lines are not outlined
            stroke: stroke && !polygon.is_fragment,
            points: polygon.screen,
        }),
        FaceKind::Texture {
            texture,
            transform,
            uv,
        } => {
            let clip = match (polygon.is_fragment, transform.inverse()) {
                (true, Some(inverse)) => polygon.screen.iter().map(|p| inverse.apply(p)).collect(),
                _ => uv.to_vec(),
            };
            RenderElement::Image(ImageElement {
                texture,
                transform,
                clip,
            })
        }
    }
}

/// Facing normal of a camera-space polygon: the outward normal for
/// counter-clockwise winding, expressed in camera space. The polygon faces
/// the viewer when its z is negative.
fn facing_normal(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    // camera space is left-handed, so the edge cross product points inward
    -(b - a).cross(&(c - a))
}

impl Builder<'_> {
    fn add_box(&mut self, index: usize, scene_box: &SceneBox) {
        let mesh_ref = scene_box.mesh_ref();
        let mesh = match &mesh_ref {
            Some(r) => match self.meshes.get(&r.source) {
                Some(mesh) => Some(Arc::clone(mesh)),
                None => {
                    tracing::trace!(index, source = %r.source, "mesh unavailable, box skipped");
                    return;
                }
            },
            None => None,
        };

        let corners = self.corners(scene_box);

        if scene_box.draw_bounding_box {
            self.add_edges(&corners);
        }

        match (mesh, &mesh_ref) {
            (Some(mesh), Some(r)) => {
                let before = self.polygons.len();
                self.add_mesh_triangles(scene_box, &place_mesh(&mesh, scene_box, r));
                tracing::trace!(
                    index,
                    triangles = mesh.triangles.len(),
                    visible = self.polygons.len() - before,
                    "mesh box"
                );
            }
            _ => {
                let visible = self.add_box_faces(scene_box, &corners);
                tracing::trace!(index, visible, "procedural box");
            }
        }

        if let Some(href) = scene_box.top_image() {
            self.add_top_texture(scene_box, href, &corners);
        }
        if let Some(text) = &scene_box.top_label {
            self.add_top_label(scene_box, text, &corners);
        }
    }

    fn corners(&self, scene_box: &SceneBox) -> Corners {
        let world = box_vertices(&scene_box.center(), &scene_box.size(), &scene_box.rotation());
        let camera = world.map(|v| self.basis.to_camera_space(&v));
        let screen = camera.map(|c| self.projector.project(&c));
        Corners {
            world,
            camera,
            screen,
        }
    }

    fn add_edges(&mut self, corners: &Corners) {
        for edge in &BOX_EDGES {
            if let Some(points) = corners.screen_of(edge) {
                self.edges.push(EdgeElement {
                    points,
                    stroke: EDGE_STROKE,
                    depth: corners.max_depth(edge),
                });
            }
        }
    }

    /// Returns the number of faces kept
    fn add_box_faces(&mut self, scene_box: &SceneBox, corners: &Corners) -> usize {
        let fill = scene_box.color();
        let mut kept = 0;
        for face in &BOX_FACES {
            let Some(screen) = corners.screen_of(face) else {
                continue;
            };
            let camera = face.map(|i| corners.camera[i]);
            if facing_normal(&camera[0], &camera[1], &camera[2]).z >= 0.0 {
                continue;
            }
            self.polygons.push(Polygon::new(
                camera.to_vec(),
                screen.to_vec(),
                FaceKind::Solid { fill, stroke: true },
            ));
            kept += 1;
        }
        kept
    }

    fn add_mesh_triangles(&mut self, scene_box: &SceneBox, triangles: &[Triangle]) {
        let box_color = scene_box.color();
        for triangle in triangles {
            let camera = triangle.vertices.map(|v| self.basis.to_camera_space(&v));
            let Some(screen) = camera
                .iter()
                .map(|c| self.projector.project(c))
                .collect::<Option<Vec<_>>>()
            else {
                continue;
            };
            let normal = facing_normal(&camera[0], &camera[1], &camera[2]);
            // back-facing or zero-area
            if normal.z >= 0.0 {
                continue;
            }
            let base = triangle.color.unwrap_or(box_color);
            self.polygons.push(Polygon::new(
                camera.to_vec(),
                screen,
                FaceKind::Solid {
                    fill: shade_by_normal(&base, &-normal),
                    stroke: false,
                },
            ));
        }
    }

    fn texture_id(&mut self, href: &str) -> usize {
        if let Some(&id) = self.texture_ids.get(href) {
            return id;
        }
        let id = self.textures.len();
        self.textures.push(href.to_string());
        self.texture_ids.insert(href.to_string(), id);
        id
    }

    /// Subdivide the top face into an n x n grid of textured triangle pairs
    fn add_top_texture(&mut self, scene_box: &SceneBox, href: &str, corners: &Corners) {
        if corners.screen_of(&TOP_FACE).is_none() {
            tracing::trace!("top face behind camera, texture skipped");
            return;
        }
        let texture = self.texture_id(href);
        let [d0, d1, d2, d3] = TOP_FACE.map(|i| corners.world[i]);
        let n = scene_box.projection_subdivision();
        let step = 1.0 / f64::from(n);

        let point = |u: f64, v: f64| -> Option<(Point2<f64>, Vec3, Point2<f64>)> {
            let world = lerp(&lerp(&d0, &d1, u), &lerp(&d3, &d2, u), v);
            let camera = self.basis.to_camera_space(&world);
            let screen = self.projector.project(&camera)?;
            Some((Point2::new(u, v), camera, screen))
        };

        let mut triangles = Vec::new();
        for row in 0..n {
            for col in 0..n {
                let (u0, u1) = (f64::from(col) * step, f64::from(col + 1) * step);
                let (v0, v1) = (f64::from(row) * step, f64::from(row + 1) * step);
                let (Some(p00), Some(p10), Some(p01), Some(p11)) =
                    (point(u0, v0), point(u1, v0), point(u0, v1), point(u1, v1))
                else {
                    continue;
                };
                triangles.push([p00, p10, p11]);
                triangles.push([p00, p11, p01]);
            }
        }

        for tri in triangles {
            let uv = tri.map(|(uv, _, _)| uv);
            let screen = tri.map(|(_, _, s)| s);
            let camera = tri.map(|(_, c, _)| c);
            self.polygons.push(Polygon::new(
                camera.to_vec(),
                screen.to_vec(),
                FaceKind::Texture {
                    texture,
                    transform: Affine2::solve(&uv, &screen),
                    uv,
                },
            ));
        }
    }

    /// Anchor the label at the top face's screen centroid, aligned with its edges
    fn add_top_label(&mut self, scene_box: &SceneBox, text: &str, corners: &Corners) {
        let Some(top) = corners.screen_of(&TOP_FACE) else {
            return;
        };
        let u = top[1] - top[0];
        let v = top[3] - top[0];
        let (lu, lv) = (u.norm(), v.norm());
        if lu == 0.0 || lv == 0.0 {
            return;
        }
        let (u, v) = (u / lu, v / lv);
        let centroid = top.iter().map(|p| p.coords).sum::<Vector2<f64>>() / 4.0;

        self.labels.push(LabelElement {
            text: text.to_string(),
            fill: scene_box.top_label_color(),
            transform: Affine2::from_coefficients(u.x, u.y, v.x, v.y, centroid.x, centroid.y),
            depth: corners.max_depth(&TOP_FACE),
        });
    }
}
