//! Geometry primitives: triangle meshes and the canonical box tables
use crate::color::Rgba;
use crate::math::{normalize_or_zero, rotate_local, Vec3};

/// Vertex indices of the six box faces: front, back, bottom, top, right, left.
///
/// Each quad is wound counter-clockwise when seen from outside the box, so the
/// right-hand normal of its first three vertices points outward.
pub const BOX_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [3, 7, 6, 2],
    [1, 2, 6, 5],
    [0, 4, 7, 3],
];

/// Corners of the top face in texture order: `(0,0)`, `(1,0)`, `(1,1)`, `(0,1)`
pub const TOP_FACE: [usize; 4] = [3, 2, 6, 7];

/// The twelve box edges as vertex index pairs
pub const BOX_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// The eight world-space corners of a box.
///
/// Corners 0-3 lie on the `-z` side and 4-7 on the `+z` side; within each
/// side the order is `(-x,-y)`, `(+x,-y)`, `(+x,+y)`, `(-x,+y)`.
pub fn box_vertices(center: &Vec3, size: &Vec3, rotation: &Vec3) -> [Vec3; 8] {
    let h = size / 2.0;
    let offsets = [
        Vec3::new(-h.x, -h.y, -h.z),
        Vec3::new(h.x, -h.y, -h.z),
        Vec3::new(h.x, h.y, -h.z),
        Vec3::new(-h.x, h.y, -h.z),
        Vec3::new(-h.x, -h.y, h.z),
        Vec3::new(h.x, -h.y, h.z),
        Vec3::new(h.x, h.y, h.z),
        Vec3::new(-h.x, h.y, h.z),
    ];
    offsets.map(|o| center + rotate_local(&o, rotation))
}

/// A triangle face with its normal and an optional color from the source file
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub normal: Vec3,
    pub color: Option<Rgba>,
}

impl Triangle {
    /// Create a triangle whose normal comes from its winding
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let mut triangle = Self {
            vertices: [v0, v1, v2],
            normal: Vec3::zeros(),
            color: None,
        };
        triangle.normal = triangle.calculate_normal();
        triangle
    }

    pub fn with_normal(mut self, normal: Vec3) -> Self {
        self.normal = normal;
        self
    }

    pub fn with_color(mut self, color: Option<Rgba>) -> Self {
        self.color = color;
        self
    }

    /// Calculate the face normal from the triangle's vertices
    pub fn calculate_normal(&self) -> Vec3 {
        let [v0, v1, v2] = self.vertices;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        normalize_or_zero(&edge1.cross(&edge2))
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Bounding box of a point cloud; the zero box when there are no points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self {
                min: Vec3::zeros(),
                max: Vec3::zeros(),
            };
        };
        iter.fold(
            Self {
                min: *first,
                max: *first,
            },
            |acc, p| Self {
                min: acc.min.inf(p),
                max: acc.max.sup(p),
            },
        )
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// A 3D mesh composed of triangles, immutable once loaded
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
    pub bounding_box: BoundingBox,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let bounding_box = BoundingBox::from_points(triangles.iter().flat_map(|t| t.vertices.iter()));
        Self {
            triangles,
            bounding_box,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Map every vertex and normal through the linear map `f`, recomputing the bounding box
    pub fn map_vertices(self, f: impl Fn(&Vec3) -> Vec3) -> Self {
        let triangles = self
            .triangles
            .into_iter()
            .map(|t| Triangle {
                vertices: t.vertices.map(|v| f(&v)),
                normal: f(&t.normal),
                color: t.color,
            })
            .collect();
        Self::new(triangles)
    }

    /// Create a simple cube mesh, wound counter-clockwise from outside
    #[cfg(test)]
    pub fn cube(size: f64) -> Self {
        let corners = box_vertices(&Vec3::zeros(), &Vec3::repeat(size), &Vec3::zeros());
        let triangles = BOX_FACES
            .iter()
            .flat_map(|[a, b, c, d]| {
                [
                    Triangle::new(corners[*a], corners[*b], corners[*c]),
                    Triangle::new(corners[*a], corners[*c], corners[*d]),
                ]
            })
            .collect();
        Self::new(triangles)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
