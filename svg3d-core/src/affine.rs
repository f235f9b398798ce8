//! 2D affine transforms solved from three point correspondences
use nalgebra::{Matrix3, Point2};

/// 2D affine transform stored as a homogeneous 3x3 matrix.
///
/// The SVG `matrix(a b c d e f)` form maps `x' = a*x + c*y + e` and
/// `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine2 {
    matrix: Matrix3<f64>,
}

impl Affine2 {
    /// The all-zero transform produced by a degenerate solve
    pub fn zero() -> Self {
        Self {
            matrix: Matrix3::zeros(),
        }
    }

    /// Build from SVG coefficients `a b c d e f`
    pub fn from_coefficients(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self {
            matrix: Matrix3::new(a, c, e, b, d, f, 0.0, 0.0, 1.0),
        }
    }

    /// Solve the transform taking each `src[i]` to `dst[i]`.
    ///
    /// Collinear source points have no solution; the result is then
    /// [`Affine2::zero`], which renders as a zero-area shape.
    pub fn solve(src: &[Point2<f64>; 3], dst: &[Point2<f64>; 3]) -> Self {
        let s = homogeneous_columns(src);
        let d = homogeneous_columns(dst);
        match s.try_inverse() {
            Some(s_inv) => Self { matrix: d * s_inv },
            None => Self::zero(),
        }
    }

    pub fn apply(&self, p: &Point2<f64>) -> Point2<f64> {
        let m = &self.matrix;
        Point2::new(
            m[(0, 0)] * p.x + m[(0, 1)] * p.y + m[(0, 2)],
            m[(1, 0)] * p.x + m[(1, 1)] * p.y + m[(1, 2)],
        )
    }

    pub fn inverse(&self) -> Option<Self> {
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    /// SVG coefficients `[a, b, c, d, e, f]`
    pub fn coefficients(&self) -> [f64; 6] {
        let m = &self.matrix;
        [
            m[(0, 0)],
            m[(1, 0)],
            m[(0, 1)],
            m[(1, 1)],
            m[(0, 2)],
            m[(1, 2)],
        ]
    }

    pub fn is_degenerate(&self) -> bool {
        let [a, b, c, d, _, _] = self.coefficients();
        a * d - b * c == 0.0
    }
}

/// Columns are the points, with a row of ones appended
fn homogeneous_columns(p: &[Point2<f64>; 3]) -> Matrix3<f64> {
    Matrix3::new(
        p[0].x, p[1].x, p[2].x, //
        p[0].y, p[1].y, p[2].y, //
        1.0, 1.0, 1.0,
    )
}
