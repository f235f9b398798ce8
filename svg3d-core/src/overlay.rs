//! Guide overlays drawn on top of the scene: grid, origin crosshair and axes gizmo
use nalgebra::{Point2, Vector2};

use crate::math::Vec3;
use crate::projection::{clip_segment_to_near, CameraBasis, Projector};
use crate::scene::{GridPlane, RenderOptions};

pub const GRID_STROKE: &str = "#ccc";

const AXIS_COLORS: [&str; 3] = ["#e53935", "#43a047", "#1e88e5"];
const AXIS_NAMES: [&str; 3] = ["X", "Y", "Z"];

/// Length of each origin ray in world units
const ORIGIN_RAY_LENGTH: f64 = 10.0;
/// Camera-space depth origin rays are clipped to
const NEAR_PLANE: f64 = 1e-3;

const GIZMO_MARGIN: f64 = 40.0;
const GIZMO_AXIS_LENGTH: f64 = 30.0;
const GIZMO_HEAD_LENGTH: f64 = 6.0;
const GIZMO_HEAD_HALF_WIDTH: f64 = 3.0;
const GIZMO_LABEL_OFFSET: f64 = 8.0;

/// A projected line segment
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLine {
    pub from: Point2<f64>,
    pub to: Point2<f64>,
    pub stroke: &'static str,
    pub dashed: bool,
}

/// One arrow of the axes gizmo
#[derive(Debug, Clone, PartialEq)]
pub struct AxisArrow {
    pub name: &'static str,
    pub line: OverlayLine,
    /// Tip first; empty when the axis points straight at the viewer
    pub head: Vec<Point2<f64>>,
    pub label_at: Point2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Grid(Vec<OverlayLine>),
    Origin(Vec<OverlayLine>),
    Axes(Vec<AxisArrow>),
}

/// Build the overlays enabled in `options`, in drawing order
pub fn build_overlays(basis: &CameraBasis, projector: &Projector, options: &RenderOptions) -> Vec<Overlay> {
    let mut overlays = Vec::new();
    if options.show_grid {
        overlays.push(Overlay::Grid(grid_lines(basis, projector, options)));
    }
    if options.show_origin {
        overlays.push(Overlay::Origin(origin_lines(basis, projector)));
    }
    if options.show_axes {
        overlays.push(Overlay::Axes(axes_gizmo(basis, projector)));
    }
    overlays
}

/// Lines every `cellSize` on the grid plane, `extent` cells each side of the origin.
///
/// A line with an endpoint behind the camera is left out.
pub fn grid_lines(basis: &CameraBasis, projector: &Projector, options: &RenderOptions) -> Vec<OverlayLine> {
    let cell = options.grid.cell_size;
    let extent = i64::from(options.grid.extent);
    let reach = extent as f64 * cell;
    let on_plane = |a: f64, b: f64| match options.grid.plane {
        GridPlane::Xy => Vec3::new(a, b, 0.0),
        GridPlane::Yz => Vec3::new(0.0, a, b),
        GridPlane::Xz => Vec3::new(a, 0.0, b),
    };

    (-extent..=extent)
        .flat_map(|k| {
            let offset = k as f64 * cell;
            [
                (on_plane(-reach, offset), on_plane(reach, offset)),
                (on_plane(offset, -reach), on_plane(offset, reach)),
            ]
        })
        .filter_map(|(a, b)| {
            let from = projector.project(&basis.to_camera_space(&a))?;
            let to = projector.project(&basis.to_camera_space(&b))?;
            Some(OverlayLine {
                from,
                to,
                stroke: GRID_STROKE,
                dashed: false,
            })
        })
        .collect()
}

/// Rays from the world origin along each axis: solid for positive, dashed for negative
pub fn origin_lines(basis: &CameraBasis, projector: &Projector) -> Vec<OverlayLine> {
    let origin = basis.to_camera_space(&Vec3::zeros());
    let mut lines = Vec::new();
    for (axis, stroke) in AXIS_COLORS.into_iter().enumerate() {
        for sign in [1.0, -1.0] {
            let mut end = Vec3::zeros();
            end[axis] = sign * ORIGIN_RAY_LENGTH;
            let end = basis.to_camera_space(&end);
            let Some((a, b)) = clip_segment_to_near(&origin, &end, NEAR_PLANE) else {
                continue;
            };
            if let (Some(from), Some(to)) = (projector.project(&a), projector.project(&b)) {
                lines.push(OverlayLine {
                    from,
                    to,
                    stroke,
                    dashed: sign < 0.0,
                });
            }
        }
    }
    lines
}

/// Fixed-size axes indicator in the bottom-left corner, farthest axis first
pub fn axes_gizmo(basis: &CameraBasis, projector: &Projector) -> Vec<AxisArrow> {
    let anchor = Point2::new(
        -projector.width / 2.0 + GIZMO_MARGIN,
        projector.height / 2.0 - GIZMO_MARGIN,
    );

    let mut axes: Vec<(f64, AxisArrow)> = (0..3)
        .map(|axis| {
            let mut dir = Vec3::zeros();
            dir[axis] = 1.0;
            let view = basis.direction_to_camera_space(&dir);
            // screen y grows downward
            let flat = Vector2::new(view.x, -view.y) * GIZMO_AXIS_LENGTH;
            let tip = anchor + flat;
            let len = flat.norm();

            let (head, label_at) = if len > 1e-9 {
                let u = flat / len;
                let perp = Vector2::new(-u.y, u.x) * GIZMO_HEAD_HALF_WIDTH;
                let base = tip - u * GIZMO_HEAD_LENGTH;
                (vec![tip, base + perp, base - perp], tip + u * GIZMO_LABEL_OFFSET)
            } else {
                (Vec::new(), tip)
            };

            let arrow = AxisArrow {
                name: AXIS_NAMES[axis],
                line: OverlayLine {
                    from: anchor,
                    to: tip,
                    stroke: AXIS_COLORS[axis],
                    dashed: false,
                },
                head,
                label_at,
            };
            (view.z, arrow)
        })
        .collect();

    axes.sort_by(|a, b| b.0.total_cmp(&a.0));
    axes.into_iter().map(|(_, arrow)| arrow).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(position: Vec3) -> (CameraBasis, Projector) {
        (
            CameraBasis::new(position, Vec3::zeros()).unwrap(),
            Projector::new(400, 400, 2.0),
        )
    }

    #[test]
    fn test_grid_line_count() {
        let (basis, projector) = setup(Vec3::new(5.0, 5.0, 5.0));
        let mut options = RenderOptions {
            show_grid: true,
            ..Default::default()
        };
        options.grid.extent = 2;
        // the camera sees the whole 4x4 patch: 5 lines each way
        let lines = grid_lines(&basis, &projector, &options);
        assert_eq!(lines.len(), 10);
        assert!(lines.iter().all(|l| l.stroke == GRID_STROKE && !l.dashed));
    }

    #[test]
    fn test_grid_drops_lines_behind_camera() {
        // camera standing on the grid plane inside the grid
        let basis = CameraBasis::new(Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.0, 0.5, -1.0)).unwrap();
        let projector = Projector::new(400, 400, 2.0);
        let options = RenderOptions::default();
        let lines = grid_lines(&basis, &projector, &options);
        assert!(!lines.is_empty());
        assert!(lines.len() < 42);
    }

    #[test]
    fn test_grid_planes() {
        let (basis, projector) = setup(Vec3::new(0.0, 0.0, 20.0));
        let mut options = RenderOptions::default();
        options.grid.plane = GridPlane::Xy;
        options.grid.extent = 1;
        let lines = grid_lines(&basis, &projector, &options);
        assert_eq!(lines.len(), 6);
        // horizontal and vertical lines face-on
        assert!(lines.iter().all(|l| (l.from.x - l.to.x).abs() < 1e-9 || (l.from.y - l.to.y).abs() < 1e-9));
    }

    #[test]
    fn test_origin_lines_solid_and_dashed() {
        let (basis, projector) = setup(Vec3::new(12.0, 12.0, 12.0));
        let lines = origin_lines(&basis, &projector);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines.iter().filter(|l| l.dashed).count(), 3);
        let center = lines[0].from;
        assert!(center.coords.norm() < 1e-9, "origin projects to the image center");
    }

    #[test]
    fn test_origin_rays_clipped_at_camera() {
        // the +z ray passes through the camera
        let (basis, projector) = setup(Vec3::new(0.0, 0.0, 5.0));
        let lines = origin_lines(&basis, &projector);
        assert!(lines.iter().all(|l| l.from.coords.iter().all(|c| c.is_finite())));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_axes_gizmo() {
        let (basis, projector) = setup(Vec3::new(0.0, 0.0, 5.0));
        let arrows = axes_gizmo(&basis, &projector);
        assert_eq!(arrows.len(), 3);
        let anchor = Point2::new(-160.0, 160.0);
        let x = arrows.iter().find(|a| a.name == "X").unwrap();
        assert!((x.line.to - Point2::new(-130.0, 160.0)).norm() < 1e-9);
        assert_eq!(x.line.from, anchor);
        assert_eq!(x.head.len(), 3);
        let y = arrows.iter().find(|a| a.name == "Y").unwrap();
        assert!((y.line.to - Point2::new(-160.0, 130.0)).norm() < 1e-9);
        // z points straight at the viewer: no arrowhead, drawn last
        assert!(arrows[2].name == "Z" && arrows[2].head.is_empty());
    }

    #[test]
    fn test_build_overlays_follows_options() {
        let (basis, projector) = setup(Vec3::new(5.0, 5.0, 5.0));
        assert!(build_overlays(&basis, &projector, &RenderOptions::default()).is_empty());
        let options = RenderOptions {
            show_grid: true,
            show_axes: true,
            show_origin: true,
            ..Default::default()
        };
        let overlays = build_overlays(&basis, &projector, &options);
        assert!(matches!(
            overlays.as_slice(),
            [Overlay::Grid(_), Overlay::Origin(_), Overlay::Axes(_)]
        ));
    }
}
