//! Vector helpers and Euler rotations
use nalgebra::{Matrix3, Rotation3, Vector3};

/// Vector type used for positions, directions and normals
pub type Vec3 = Vector3<f64>;

/// Normalize a vector, leaving a zero vector untouched instead of producing NaN
pub fn normalize_or_zero(v: &Vec3) -> Vec3 {
    let len = v.norm();
    if len == 0.0 {
        *v
    } else {
        v / len
    }
}

/// Component-wise linear interpolation between `a` and `b`
pub fn lerp(a: &Vec3, b: &Vec3, t: f64) -> Vec3 {
    a * (1.0 - t) + b * t
}

/// Rotate `p` by Euler angles `r` (radians), applying X, then Y, then Z.
///
/// Each axis is skipped when its angle is exactly zero.
pub fn rotate_local(p: &Vec3, r: &Vec3) -> Vec3 {
    let mut v = *p;
    if r.x != 0.0 {
        v = Rotation3::from_axis_angle(&Vector3::x_axis(), r.x) * v;
    }
    if r.y != 0.0 {
        v = Rotation3::from_axis_angle(&Vector3::y_axis(), r.y) * v;
    }
    if r.z != 0.0 {
        v = Rotation3::from_axis_angle(&Vector3::z_axis(), r.z) * v;
    }
    v
}

/// Undo [`rotate_local`]: Z, then Y, then X, each by the negated angle
pub fn inverse_rotate_local(p: &Vec3, r: &Vec3) -> Vec3 {
    rotation_matrix(r).transpose() * p
}

/// Rotation matrix equivalent to [`rotate_local`]
pub fn rotation_matrix(r: &Vec3) -> Matrix3<f64> {
    let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), r.x);
    let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), r.y);
    let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), r.z);

    // Apply rotations in order: X, then Y, then Z
    (rz * ry * rx).into_inner()
}
