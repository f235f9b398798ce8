//! Wavefront OBJ parser
//!
//! Supports `v` (with optional `r g b` vertex colors), `vn`, `f` in all of the
//! `v`, `v/vt`, `v//vn` and `v/vt/vn` forms with negative indices, and inline
//! material blocks (`newmtl` + `Kd`, selected by `usemtl`). Faces with more
//! than three corners are fan-triangulated.
use std::collections::HashMap;

use crate::color::Rgba;
use crate::error::LoadError;
use crate::geometry::{Mesh, Triangle};
use crate::math::Vec3;

/// Parse OBJ text into a mesh
pub fn parse_obj(data: &[u8]) -> Result<Mesh, LoadError> {
    let text =
        std::str::from_utf8(data).map_err(|e| LoadError::Obj(format!("not valid UTF-8: {e}")))?;
    let mut parser = ObjParser::default();
    for (number, line) in text.lines().enumerate() {
        parser
            .line(line)
            .map_err(|reason| LoadError::Obj(format!("line {}: {reason}", number + 1)))?;
    }
    Ok(Mesh::new(parser.triangles))
}

#[derive(Default)]
struct ObjParser {
    positions: Vec<Vec3>,
    vertex_colors: Vec<Option<Rgba>>,
    normals: Vec<Vec3>,
    materials: HashMap<String, Rgba>,
    defining: Option<String>,
    material_color: Option<Rgba>,
    triangles: Vec<Triangle>,
}

#[derive(Clone, Copy)]
struct Corner {
    position: usize,
    normal: Option<usize>,
}

impl ObjParser {
    fn line(&mut self, line: &str) -> Result<(), String> {
        let line = line.split('#').next().unwrap_or_default();
        let mut tokens = line.split_whitespace();
        let Some(keyword) = tokens.next() else {
            return Ok(());
        };
        let args: Vec<&str> = tokens.collect();

        match keyword {
            "v" => {
                let values = parse_floats(&args)?;
                if values.len() < 3 {
                    return Err(format!("vertex needs 3 coordinates, got {}", values.len()));
                }
                self.positions
                    .push(Vec3::new(values[0], values[1], values[2]));
                let color = (values.len() >= 6).then(|| unit_color(&values[3..6]));
                self.vertex_colors.push(color);
            }
            "vn" => {
                let values = parse_floats(&args)?;
                if values.len() < 3 {
                    return Err("normal needs 3 components".into());
                }
                self.normals.push(Vec3::new(values[0], values[1], values[2]));
            }
            "f" => self.face(&args)?,
            "newmtl" => self.defining = args.first().map(|s| s.to_string()),
            "Kd" => {
                let values = parse_floats(&args)?;
                if let (Some(name), true) = (&self.defining, values.len() >= 3) {
                    self.materials.insert(name.clone(), unit_color(&values[..3]));
                }
            }
            "usemtl" => {
                self.material_color = args.first().and_then(|name| self.materials.get(*name)).copied();
            }
            // vt, o, g, s, mtllib, endmtl and friends carry nothing we draw
            _ => {}
        }
        Ok(())
    }

    fn face(&mut self, args: &[&str]) -> Result<(), String> {
        let corners = args
            .iter()
            .map(|token| self.corner(token))
            .collect::<Result<Vec<_>, _>>()?;
        if corners.len() < 3 {
            return Err(format!("face needs 3 vertices, got {}", corners.len()));
        }

        for i in 1..corners.len() - 1 {
            let tri = [corners[0], corners[i], corners[i + 1]];
            let mut triangle = Triangle::new(
                self.positions[tri[0].position],
                self.positions[tri[1].position],
                self.positions[tri[2].position],
            );
            if let Some(n) = tri.iter().find_map(|c| c.normal) {
                let normal = self.normals[n];
                if normal.norm() > 0.0 {
                    triangle = triangle.with_normal(normal.normalize());
                }
            }
            let color = self.material_color.or_else(|| self.average_color(&tri));
            self.triangles.push(triangle.with_color(color));
        }
        Ok(())
    }

    fn corner(&self, token: &str) -> Result<Corner, String> {
        let mut parts = token.split('/');
        let position = resolve_index(parts.next().unwrap_or_default(), self.positions.len())?
            .ok_or_else(|| format!("face corner {token:?} has no vertex index"))?;
        let _texture = parts.next();
        let normal = match parts.next() {
            Some(n) => resolve_index(n, self.normals.len())?,
            None => None,
        };
        Ok(Corner { position, normal })
    }

    fn average_color(&self, tri: &[Corner; 3]) -> Option<Rgba> {
        let colors = tri
            .iter()
            .map(|c| self.vertex_colors[c.position])
            .collect::<Option<Vec<_>>>()?;
        let sum = colors.iter().fold([0.0; 3], |acc, c| {
            [acc[0] + c.r, acc[1] + c.g, acc[2] + c.b]
        });
        Some(Rgba::new(sum[0] / 3.0, sum[1] / 3.0, sum[2] / 3.0, 1.0))
    }
}

/// One-based (or negative, relative) OBJ index to a zero-based one; empty means absent
fn resolve_index(token: &str, len: usize) -> Result<Option<usize>, String> {
    if token.is_empty() {
        return Ok(None);
    }
    let index: i64 = token
        .parse()
        .map_err(|_| format!("invalid index {token:?}"))?;
    let resolved = match index {
        0 => None,
        i if i > 0 => Some(i - 1),
        i => Some(len as i64 + i),
    };
    match resolved {
        Some(i) if (0..len as i64).contains(&i) => Ok(Some(i as usize)),
        _ => Err(format!("index {index} out of range ({len} defined)")),
    }
}

fn parse_floats(args: &[&str]) -> Result<Vec<f64>, String> {
    args.iter()
        .map(|s| s.parse::<f64>().map_err(|_| format!("invalid number {s:?}")))
        .collect()
}

/// OBJ colors are usually `0..1`; values above 1 are taken as `0..255` already
fn unit_color(rgb: &[f64]) -> Rgba {
    let scale = if rgb.iter().all(|c| *c <= 1.0) { 255.0 } else { 1.0 };
    Rgba::new(rgb[0] * scale, rgb[1] * scale, rgb[2] * scale, 1.0)
}
