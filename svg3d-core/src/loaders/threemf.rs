//! 3MF reader: zip container plus the XML model part
use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::color::{parse_color, Rgba};
use crate::error::LoadError;
use crate::geometry::{Mesh, Triangle};
use crate::math::Vec3;

const MODEL_PATH: &str = "3D/3dmodel.model";

/// Parse a 3MF package. Vertices are converted from the format's Z-up frame to Y-up.
pub fn parse_3mf(data: &[u8]) -> Result<Mesh, LoadError> {
    let xml = read_model_xml(data)?;
    let mesh = parse_model_xml(&xml)?;
    Ok(mesh.map_vertices(|v| Vec3::new(v.x, -v.z, v.y)))
}

fn read_model_xml(data: &[u8]) -> Result<String, LoadError> {
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| LoadError::ThreeMf(format!("not a zip package: {e}")))?;

    // Producers disagree on the case of the model part name
    let name = archive
        .file_names()
        .find(|n| n.eq_ignore_ascii_case(MODEL_PATH))
        .or_else(|| archive.file_names().find(|n| n.to_ascii_lowercase().ends_with(".model")))
        .map(str::to_string)
        .ok_or_else(|| LoadError::ThreeMf(format!("package has no {MODEL_PATH}")))?;

    let mut file = archive
        .by_name(&name)
        .map_err(|e| LoadError::ThreeMf(format!("{name}: {e}")))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(xml)
}

#[derive(Default)]
struct ModelReader {
    materials: HashMap<String, Vec<Rgba>>,
    open_materials: Option<String>,
    object_material: Option<(String, usize)>,
    vertices: Vec<Vec3>,
    triangles: Vec<Triangle>,
}

/// Read every mesh object of a model document
pub fn parse_model_xml(xml: &str) -> Result<Mesh, LoadError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut model = ModelReader::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => model.open(&e)?,
            Ok(Event::Empty(e)) => {
                model.open(&e)?;
                model.close(e.local_name().as_ref());
            }
            Ok(Event::End(e)) => model.close(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(LoadError::ThreeMf(format!(
                    "XML error at byte {}: {e}",
                    reader.error_position()
                )))
            }
            _ => {}
        }
    }

    Ok(Mesh::new(model.triangles))
}

impl ModelReader {
    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), LoadError> {
        let attrs = attributes(e)?;
        match e.local_name().as_ref() {
            b"basematerials" => {
                let id = attrs.get("id").cloned().unwrap_or_default();
                self.materials.entry(id.clone()).or_default();
                self.open_materials = Some(id);
            }
            b"base" => {
                if let Some(id) = &self.open_materials {
                    let color = attrs
                        .get("displaycolor")
                        .map(|c| display_color(c))
                        .unwrap_or(Rgba::GRAY);
                    self.materials.entry(id.clone()).or_default().push(color);
                }
            }
            b"object" => {
                self.vertices.clear();
                self.object_material = attrs.get("pid").map(|pid| {
                    let index = attrs.get("pindex").and_then(|i| i.parse().ok()).unwrap_or(0);
                    (pid.clone(), index)
                });
            }
            b"vertex" => {
                let coord = |k: &str| -> Result<f64, LoadError> {
                    attrs
                        .get(k)
                        .ok_or_else(|| LoadError::ThreeMf(format!("vertex without {k}")))?
                        .parse()
                        .map_err(|_| LoadError::ThreeMf(format!("vertex {k} is not a number")))
                };
                self.vertices.push(Vec3::new(coord("x")?, coord("y")?, coord("z")?));
            }
            b"triangle" => {
                let index = |k: &str| -> Result<Vec3, LoadError> {
                    attrs
                        .get(k)
                        .and_then(|v| v.parse::<usize>().ok())
                        .and_then(|i| self.vertices.get(i).copied())
                        .ok_or_else(|| LoadError::ThreeMf(format!("triangle {k} is missing or out of range")))
                };
                let triangle = Triangle::new(index("v1")?, index("v2")?, index("v3")?);
                let color = self.triangle_color(&attrs);
                self.triangles.push(triangle.with_color(color));
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        if name == b"basematerials" {
            self.open_materials = None;
        }
    }

    /// Triangle `pid`/`p1` win over the object's `pid`/`pindex`
    fn triangle_color(&self, attrs: &HashMap<String, String>) -> Option<Rgba> {
        let (pid, index) = match attrs.get("pid") {
            Some(pid) => {
                let index = attrs.get("p1").and_then(|i| i.parse().ok());
                let fallback = self.object_material.as_ref().map(|(_, i)| *i).unwrap_or(0);
                (pid.clone(), index.unwrap_or(fallback))
            }
            None => self.object_material.clone()?,
        };
        self.materials.get(&pid)?.get(index).copied()
    }
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, LoadError> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| LoadError::ThreeMf(format!("bad attribute: {err}")))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| LoadError::ThreeMf(format!("bad attribute value: {err}")))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

/// `#RRGGBB` or `#RRGGBBAA`
fn display_color(s: &str) -> Rgba {
    let s = s.trim();
    match (s.strip_prefix('#').filter(|hex| hex.len() == 8), s.get(..7), s.get(7..)) {
        (Some(_), Some(rgb), Some(alpha)) => {
            let alpha = u8::from_str_radix(alpha, 16).map(f64::from).unwrap_or(255.0);
            let mut rgba = parse_color(rgb);
            rgba.a = alpha / 255.0;
            rgba
        }
        _ => parse_color(s),
    }
}
