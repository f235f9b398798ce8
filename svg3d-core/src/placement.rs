//! Fitting an external mesh into the frame of its box
use crate::geometry::{BoundingBox, Mesh, Triangle};
use crate::math::{rotate_local, Vec3};
use crate::scene::{MeshRef, SceneBox};

/// Transform a loaded mesh into world space for `scene_box`.
///
/// The mesh is rotated about its bounding-box center by the format-specific
/// rotation. With `centerModel` it stays centered on the origin, otherwise it
/// returns to its original position. `scaleToBox` then applies the largest
/// uniform scale that fits the rotated cloud inside the box, about the
/// cloud's own center. Last come the format-specific position offset, the
/// box rotation and the box center.
pub fn place_mesh(mesh: &Mesh, scene_box: &SceneBox, mesh_ref: &MeshRef) -> Vec<Triangle> {
    let mesh_center = mesh.bounding_box.center();
    let center_model = scene_box.center_model();

    let rotated: Vec<[Vec3; 3]> = mesh
        .triangles
        .iter()
        .map(|t| {
            t.vertices.map(|v| {
                let p = rotate_local(&(v - mesh_center), &mesh_ref.rotation);
                if center_model {
                    p
                } else {
                    p + mesh_center
                }
            })
        })
        .collect();

    let fit = mesh_ref
        .scale_to_box
        .then(|| fit_to_box(&rotated, &scene_box.size()));

    let box_rotation = scene_box.rotation();
    let box_center = scene_box.center();
    let finish = |p: Vec3| -> Vec3 {
        let p = match fit {
            Some((scale, pivot)) if center_model => (p - pivot) * scale,
            Some((scale, pivot)) => pivot + (p - pivot) * scale,
            None => p,
        };
        box_center + rotate_local(&(p + mesh_ref.position), &box_rotation)
    };

    mesh.triangles
        .iter()
        .zip(rotated)
        .map(|(source, [a, b, c])| {
            let normal = rotate_local(&rotate_local(&source.normal, &mesh_ref.rotation), &box_rotation);
            Triangle::new(finish(a), finish(b), finish(c))
                .with_normal(normal)
                .with_color(source.color)
        })
        .collect()
}

/// Uniform scale and pivot fitting the point cloud into `box_size`.
///
/// Axes along which the cloud is flat do not constrain the scale; a cloud
/// flat in every direction is left unscaled.
fn fit_to_box(triangles: &[[Vec3; 3]], box_size: &Vec3) -> (f64, Vec3) {
    let bounds = BoundingBox::from_points(triangles.iter().flatten());
    let size = bounds.size();
    let scale = (0..3)
        .filter(|&axis| size[axis] > 0.0)
        .map(|axis| box_size[axis] / size[axis])
        .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.min(s))))
        .unwrap_or(1.0);
    (scale, bounds.center())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::{MeshFormat, MeshSource};
    use crate::scene::Point3;
    use std::f64::consts::FRAC_PI_2;

    /// A 4x2x2 slab spanning x in [10, 14]
    fn slab() -> Mesh {
        let a = Triangle::new(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(14.0, 0.0, 0.0),
            Vec3::new(14.0, 2.0, 0.0),
        );
        let b = Triangle::new(
            Vec3::new(10.0, 0.0, 2.0),
            Vec3::new(14.0, 2.0, 2.0),
            Vec3::new(10.0, 2.0, 2.0),
        );
        Mesh::new(vec![a, b])
    }

    fn mesh_ref(rotation: Vec3, position: Vec3, scale_to_box: bool) -> MeshRef {
        MeshRef {
            source: MeshSource::new(MeshFormat::Stl, "slab.stl"),
            rotation,
            position,
            scale_to_box,
        }
    }

    fn bounds(triangles: &[Triangle]) -> BoundingBox {
        BoundingBox::from_points(triangles.iter().flat_map(|t| t.vertices.iter()))
    }

    fn assert_close(a: &Vec3, b: &Vec3) {
        assert!((a - b).norm() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_center_model_moves_mesh_to_box_center() {
        let b = SceneBox::new(Point3::new(1.0, 2.0, 3.0), Point3::new(1.0, 1.0, 1.0));
        let placed = place_mesh(&slab(), &b, &mesh_ref(Vec3::zeros(), Vec3::zeros(), false));
        let bb = bounds(&placed);
        assert_close(&bb.center(), &Vec3::new(1.0, 2.0, 3.0));
        assert_close(&bb.size(), &Vec3::new(4.0, 2.0, 2.0));
    }

    #[test]
    fn test_without_center_model_keeps_original_position() {
        let mut b = SceneBox::new(Point3::new(1.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        b.center_model = Some(false);
        let placed = place_mesh(&slab(), &b, &mesh_ref(Vec3::zeros(), Vec3::zeros(), false));
        assert_close(&bounds(&placed).center(), &Vec3::new(13.0, 1.0, 1.0));
    }

    #[test]
    fn test_scale_to_box_uses_smallest_axis_factor() {
        let b = SceneBox::new(Point3::default(), Point3::new(2.0, 2.0, 2.0));
        let placed = place_mesh(&slab(), &b, &mesh_ref(Vec3::zeros(), Vec3::zeros(), true));
        let bb = bounds(&placed);
        // x limits the fit: 2 / 4 = 0.5 on every axis
        assert_close(&bb.size(), &Vec3::new(2.0, 1.0, 1.0));
        assert_close(&bb.center(), &Vec3::zeros());
    }

    #[test]
    fn test_scale_without_center_model_pivots_on_cloud_center() {
        let mut b = SceneBox::new(Point3::default(), Point3::new(2.0, 2.0, 2.0));
        b.center_model = Some(false);
        let placed = place_mesh(&slab(), &b, &mesh_ref(Vec3::zeros(), Vec3::zeros(), true));
        let bb = bounds(&placed);
        assert_close(&bb.size(), &Vec3::new(2.0, 1.0, 1.0));
        assert_close(&bb.center(), &Vec3::new(12.0, 1.0, 1.0));
    }

    #[test]
    fn test_kind_rotation_happens_before_fit() {
        let b = SceneBox::new(Point3::default(), Point3::new(2.0, 2.0, 2.0));
        // a quarter turn about z stands the slab up along y
        let r = mesh_ref(Vec3::new(0.0, 0.0, FRAC_PI_2), Vec3::zeros(), true);
        let bb = bounds(&place_mesh(&slab(), &b, &r));
        assert_close(&bb.size(), &Vec3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_position_offset_then_box_rotation() {
        let mut b = SceneBox::new(Point3::new(0.0, 5.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        b.rotation = Some(Point3::new(0.0, 0.0, FRAC_PI_2));
        let r = mesh_ref(Vec3::zeros(), Vec3::new(3.0, 0.0, 0.0), false);
        let bb = bounds(&place_mesh(&slab(), &b, &r));
        // the +x offset is turned onto +y by the box rotation
        assert_close(&bb.center(), &Vec3::new(0.0, 8.0, 0.0));
    }

    #[test]
    fn test_colors_survive_and_flat_mesh_is_unscaled() {
        let flat = Mesh::new(vec![Triangle::new(Vec3::zeros(), Vec3::zeros(), Vec3::zeros())
            .with_color(Some(crate::color::Rgba::BLACK))]);
        let b = SceneBox::new(Point3::default(), Point3::new(1.0, 1.0, 1.0));
        let placed = place_mesh(&flat, &b, &mesh_ref(Vec3::zeros(), Vec3::zeros(), true));
        assert_eq!(placed[0].color, Some(crate::color::Rgba::BLACK));
        assert_close(&placed[0].vertices[0], &Vec3::zeros());
    }
}
