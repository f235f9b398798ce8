//! Camera basis, camera space and perspective projection
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::{RenderError, Result};
use crate::math::{normalize_or_zero, Vec3};
use crate::scene::Point3;

/// Focal length used when a camera does not specify one
pub const DEFAULT_FOCAL_LENGTH: f64 = 2.0;

/// Camera placement as written in a scene document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub position: Point3,
    pub look_at: Point3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<f64>,
}

impl Camera {
    pub fn new(position: Point3, look_at: Point3) -> Self {
        Self {
            position,
            look_at,
            focal_length: None,
        }
    }

    pub fn focal_length(&self) -> f64 {
        self.focal_length.unwrap_or(DEFAULT_FOCAL_LENGTH)
    }

    /// Orthonormal basis of this camera; fails when position equals look-at
    pub fn basis(&self) -> Result<CameraBasis> {
        CameraBasis::new(self.position.into(), self.look_at.into())
    }

    /// Check the fields that make the camera usable at all
    pub fn validate(&self) -> Result<()> {
        let focal = self.focal_length();
        if !focal.is_finite() || focal <= 0.0 {
            return Err(RenderError::InvalidCamera(format!(
                "focal length must be positive, got {focal}"
            )));
        }
        self.basis().map(|_| ())
    }
}

/// Right/up/forward axes of a camera plus its position.
///
/// Camera space has x along `right`, y along `up` and z along `forward`,
/// so depth grows with distance in front of the camera. The frame is
/// left-handed: `right x up = -forward`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraBasis {
    pub position: Vec3,
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl CameraBasis {
    pub fn new(position: Vec3, look_at: Vec3) -> Result<Self> {
        let view = look_at - position;
        let len = view.norm();
        if len == 0.0 || !len.is_finite() {
            return Err(RenderError::DegenerateCamera);
        }
        let forward = view / len;
        let world_up = Vec3::new(0.0, 1.0, 0.0);

        let mut right = normalize_or_zero(&forward.cross(&world_up));
        // Looking straight up or down
        if right.norm() == 0.0 {
            right = Vec3::new(1.0, 0.0, 0.0);
        }
        let up = right.cross(&forward);

        Ok(Self {
            position,
            right,
            up,
            forward,
        })
    }

    /// Express a world-space point in camera space
    pub fn to_camera_space(&self, p: &Vec3) -> Vec3 {
        self.direction_to_camera_space(&(p - self.position))
    }

    /// Express a world-space direction in camera space (no translation)
    pub fn direction_to_camera_space(&self, d: &Vec3) -> Vec3 {
        Vec3::new(d.dot(&self.right), d.dot(&self.up), d.dot(&self.forward))
    }
}

/// Pinhole projection onto an image centered at the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    pub width: f64,
    pub height: f64,
    pub focal_length: f64,
}

impl Projector {
    pub fn new(width: u32, height: u32, focal_length: f64) -> Self {
        Self {
            width: f64::from(width),
            height: f64::from(height),
            focal_length,
        }
    }

    /// Project a camera-space point to screen space.
    ///
    /// Screen x grows right and y grows down, spanning
    /// `[-w/2, w/2] x [-h/2, h/2]`. Points at or behind the camera plane
    /// (`z <= 0`) do not project.
    pub fn project(&self, c: &Vec3) -> Option<Point2<f64>> {
        if c.z <= 0.0 {
            return None;
        }
        let scale = self.focal_length / c.z;
        Some(Point2::new(
            c.x * scale * self.width / 2.0,
            -c.y * scale * self.height / 2.0,
        ))
    }
}

/// Clip a camera-space segment to the half-space `z >= near`
pub fn clip_segment_to_near(a: &Vec3, b: &Vec3, near: f64) -> Option<(Vec3, Vec3)> {
    match (a.z >= near, b.z >= near) {
        (true, true) => Some((*a, *b)),
        (false, false) => None,
        (a_in, _) => {
            let t = (near - a.z) / (b.z - a.z);
            let cut = a + (b - a) * t;
            if a_in {
                Some((*a, cut))
            } else {
                Some((cut, *b))
            }
        }
    }
}
