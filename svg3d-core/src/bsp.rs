//! [BSP](https://en.wikipedia.org/wiki/Binary_space_partitioning) visibility ordering of camera-space polygons
//!
//! Builds a tree with the first remaining polygon as splitter at every level,
//! splitting polygons that straddle a splitter, then walks it back to front
//! relative to the camera at the origin. Intersecting geometry comes out in
//! a correct painter's order, which plain depth sorting cannot guarantee.

use nalgebra::Point2;

use crate::math::{lerp, normalize_or_zero, Vec3};
use crate::projection::Projector;

/// Signed distances within this band count as on the plane
pub const EPSILON: f64 = 1e-6;

/// A convex polygon in camera space with its projected outline and a payload
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon<T> {
    pub camera: Vec<Vec3>,
    pub screen: Vec<Point2<f64>>,
    pub payload: T,
    /// Produced by splitting a larger polygon
    pub is_fragment: bool,
}

impl<T: Clone> Polygon<T> {
    pub fn new(camera: Vec<Vec3>, screen: Vec<Point2<f64>>, payload: T) -> Self {
        debug_assert_eq!(camera.len(), screen.len());
        Self {
            camera,
            screen,
            payload,
            is_fragment: false,
        }
    }

    /// Supporting plane from the summed edge cross products, so collinear
    /// leading vertices do not matter. None for polygons without area.
    fn plane(&self) -> Option<Plane> {
        let n = self.camera.len();
        let area: Vec3 = (0..n)
            .map(|i| self.camera[i].cross(&self.camera[(i + 1) % n]))
            .sum();
        (area.norm() > EPSILON).then(|| Plane {
            normal: normalize_or_zero(&area),
            point: self.camera[0],
        })
    }

    /// Split by the signed plane `distances` of the vertices; parts with fewer than 3 points are dropped
    fn split(&self, distances: &[f64], projector: &Projector) -> (Option<Self>, Option<Self>) {
        let n = self.camera.len();
        let mut front = (Vec::with_capacity(n + 1), Vec::with_capacity(n + 1));
        let mut back = (Vec::with_capacity(n + 1), Vec::with_capacity(n + 1));

        for i in 0..n {
            let j = (i + 1) % n;
            let (a, b) = (self.camera[i], self.camera[j]);
            let (da, db) = (distances[i], distances[j]);

            if da >= -EPSILON {
                front.0.push(a);
                front.1.push(self.screen[i]);
            }
            if da <= EPSILON {
                back.0.push(a);
                back.1.push(self.screen[i]);
            }

            if (da > EPSILON && db < -EPSILON) || (da < -EPSILON && db > EPSILON) {
                let t = da / (da - db);
                let cut = lerp(&a, &b, t);
                let cut_screen = projector.project(&cut).unwrap_or_else(|| {
                    let (sa, sb) = (self.screen[i], self.screen[j]);
                    Point2::from(sa.coords + (sb.coords - sa.coords) * t)
                });
                front.0.push(cut);
                front.1.push(cut_screen);
                back.0.push(cut);
                back.1.push(cut_screen);
            }
        }

        let make = |(camera, screen): (Vec<Vec3>, Vec<Point2<f64>>)| {
            (camera.len() >= 3).then(|| Self {
                camera,
                screen,
                payload: self.payload.clone(),
                is_fragment: true,
            })
        };
        (make(front), make(back))
    }
}

#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vec3,
    point: Vec3,
}

impl Plane {
    fn distance(&self, p: &Vec3) -> f64 {
        self.normal.dot(&(p - self.point))
    }

    /// The camera sits at the camera-space origin
    fn camera_in_front(&self) -> bool {
        self.normal.dot(&-self.point) >= 0.0
    }
}

#[derive(Debug)]
struct Node {
    plane: Plane,
    polygon: usize,
    /// Polygons in the splitter's plane, drawn right after it in insertion order
    coplanar: Vec<usize>,
    front: Option<Box<Node>>,
    back: Option<Box<Node>>,
}

/// BSP tree over an arena of polygons; split fragments are appended to the arena
#[derive(Debug)]
pub struct BspTree<T> {
    polygons: Vec<Polygon<T>>,
    root: Option<Box<Node>>,
    splits: usize,
}

impl<T: Clone> BspTree<T> {
    /// Build the tree. `projector` re-projects the points created by splits.
    pub fn build(polygons: Vec<Polygon<T>>, projector: &Projector) -> Self {
        let mut tree = Self {
            root: None,
            splits: 0,
            polygons: Vec::with_capacity(polygons.len()),
        };
        tree.polygons
            .extend(polygons.into_iter().filter(|p| p.camera.len() >= 3 && p.plane().is_some()));
        let all = (0..tree.polygons.len()).collect();
        tree.root = tree.build_node(all, projector);
        tree
    }

    fn build_node(&mut self, list: Vec<usize>, projector: &Projector) -> Option<Box<Node>> {
        let (&splitter, rest) = list.split_first()?;
        // every polygon in the arena has area
        let plane = self.polygons[splitter].plane()?;
        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar = Vec::new();

        for &index in rest {
            let distances: Vec<f64> = self.polygons[index]
                .camera
                .iter()
                .map(|p| plane.distance(p))
                .collect();
            let has_front = distances.iter().any(|d| *d > EPSILON);
            let has_back = distances.iter().any(|d| *d < -EPSILON);

            match (has_front, has_back) {
                (false, false) => coplanar.push(index),
                (true, false) => front.push(index),
                (false, true) => back.push(index),
                (true, true) => {
                    let (f, b) = self.polygons[index].split(&distances, projector);
                    self.splits += 1;
                    if let Some(f) = f.filter(|f| f.plane().is_some()) {
                        front.push(self.polygons.len());
                        self.polygons.push(f);
                    }
                    if let Some(b) = b.filter(|b| b.plane().is_some()) {
                        back.push(self.polygons.len());
                        self.polygons.push(b);
                    }
                }
            }
        }

        Some(Box::new(Node {
            plane,
            polygon: splitter,
            coplanar,
            front: self.build_node(front, projector),
            back: self.build_node(back, projector),
        }))
    }

    /// Number of polygons that had to be split
    pub fn splits(&self) -> usize {
        self.splits
    }

    /// Polygons in the tree, split fragments included
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Consume the tree, yielding polygons back to front.
    ///
    /// Split polygons are replaced by their fragments.
    pub fn into_draw_order(self) -> Vec<Polygon<T>> {
        let mut order = Vec::with_capacity(self.polygons.len());
        if let Some(root) = &self.root {
            collect(root, &mut order);
        }
        let mut slots: Vec<Option<Polygon<T>>> = self.polygons.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect()
    }
}

fn collect(node: &Node, out: &mut Vec<usize>) {
    let (first, last) = if node.plane.camera_in_front() {
        (&node.back, &node.front)
    } else {
        (&node.front, &node.back)
    };
    if let Some(n) = first {
        collect(n, out);
    }
    out.push(node.polygon);
    out.extend_from_slice(&node.coplanar);
    if let Some(n) = last {
        collect(n, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projector() -> Projector {
        Projector::new(400, 400, 2.0)
    }

    fn quad(points: [Vec3; 4], id: &'static str) -> Polygon<&'static str> {
        let p = projector();
        let screen = points.iter().map(|c| p.project(c).unwrap()).collect();
        Polygon::new(points.to_vec(), screen, id)
    }

    /// Square facing the camera at depth `z`, spanning x and y in [-s, s]
    fn facing(z: f64, s: f64, id: &'static str) -> Polygon<&'static str> {
        quad(
            [
                Vec3::new(-s, -s, z),
                Vec3::new(-s, s, z),
                Vec3::new(s, s, z),
                Vec3::new(s, -s, z),
            ],
            id,
        )
    }

    fn order(polys: Vec<Polygon<&'static str>>) -> Vec<&'static str> {
        BspTree::build(polys, &projector())
            .into_draw_order()
            .into_iter()
            .map(|p| p.payload)
            .collect()
    }

    #[test]
    fn test_farther_drawn_first_either_input_order() {
        assert_eq!(order(vec![facing(5.0, 1.0, "near"), facing(9.0, 1.0, "far")]), ["far", "near"]);
        assert_eq!(order(vec![facing(9.0, 1.0, "far"), facing(5.0, 1.0, "near")]), ["far", "near"]);
    }

    #[test]
    fn test_winding_does_not_change_order() {
        let mut near = facing(5.0, 1.0, "near");
        near.camera.reverse();
        near.screen.reverse();
        assert_eq!(order(vec![near, facing(9.0, 1.0, "far")]), ["far", "near"]);
    }

    #[test]
    fn test_coplanar_drawn_after_splitter() {
        assert_eq!(order(vec![facing(5.0, 1.0, "a"), facing(5.0, 0.5, "b")]), ["a", "b"]);
        // whichever way the splitter is wound
        let mut a = facing(5.0, 1.0, "a");
        a.camera.reverse();
        a.screen.reverse();
        assert_eq!(order(vec![a, facing(5.0, 0.5, "b"), facing(9.0, 1.0, "far")]), ["far", "a", "b"]);
    }

    #[test]
    fn test_zero_area_polygon_dropped() {
        let sliver = quad(
            [
                Vec3::new(0.0, 0.0, 3.0),
                Vec3::new(0.0, 0.0, 3.0),
                Vec3::new(1.0, 0.0, 3.0),
                Vec3::new(2.0, 0.0, 3.0),
            ],
            "sliver",
        );
        assert_eq!(
            order(vec![sliver, facing(5.0, 1.0, "near"), facing(9.0, 1.0, "far")]),
            ["far", "near"]
        );
    }

    #[test]
    fn test_collinear_leading_vertices_keep_plane() {
        // the first three points lie on one line; the fourth gives the quad its area
        let triangle = quad(
            [
                Vec3::new(-1.0, -1.0, 5.0),
                Vec3::new(0.0, -1.0, 5.0),
                Vec3::new(1.0, -1.0, 5.0),
                Vec3::new(0.0, 1.0, 5.0),
            ],
            "near",
        );
        assert_eq!(order(vec![triangle, facing(9.0, 1.0, "far")]), ["far", "near"]);
    }

    #[test]
    fn test_intersecting_polygon_is_split() {
        // A wall at x = 0 reaching from z = 3 to z = 11 pierces a square at z = 7
        let wall = quad(
            [
                Vec3::new(0.0, -1.0, 3.0),
                Vec3::new(0.0, 1.0, 3.0),
                Vec3::new(0.0, 1.0, 11.0),
                Vec3::new(0.0, -1.0, 11.0),
            ],
            "wall",
        );
        let tree = BspTree::build(vec![facing(7.0, 2.0, "square"), wall], &projector());
        assert_eq!(tree.splits(), 1);
        assert_eq!(tree.len(), 4);

        let drawn = tree.into_draw_order();
        let ids: Vec<_> = drawn.iter().map(|p| p.payload).collect();
        assert_eq!(ids, ["wall", "square", "wall"]);

        // the far half of the wall comes first, the near half last
        let max_z = |p: &Polygon<&str>| p.camera.iter().map(|c| c.z).fold(f64::MIN, f64::max);
        assert!((max_z(&drawn[0]) - 11.0).abs() < 1e-9);
        assert!((max_z(&drawn[2]) - 7.0).abs() < 1e-9);
        assert!(drawn[0].is_fragment && drawn[2].is_fragment);
        assert!(!drawn[1].is_fragment);
    }

    #[test]
    fn test_split_points_are_reprojected() {
        let wall = quad(
            [
                Vec3::new(1.0, -1.0, 3.0),
                Vec3::new(1.0, 1.0, 3.0),
                Vec3::new(1.0, 1.0, 11.0),
                Vec3::new(1.0, -1.0, 11.0),
            ],
            "wall",
        );
        let drawn = BspTree::build(vec![facing(7.0, 2.0, "square"), wall], &projector()).into_draw_order();
        let p = projector();
        for poly in &drawn {
            for (c, s) in poly.camera.iter().zip(&poly.screen) {
                let expected = p.project(c).unwrap();
                assert!((expected - *s).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn test_degenerate_input_is_ignored() {
        let sliver = Polygon::new(
            vec![Vec3::new(0.0, 0.0, 5.0), Vec3::new(1.0, 0.0, 5.0)],
            vec![Point2::origin(), Point2::origin()],
            "sliver",
        );
        assert_eq!(order(vec![sliver, facing(5.0, 1.0, "a")]), ["a"]);
        assert!(BspTree::<u8>::build(Vec::new(), &projector()).is_empty());
    }
}
