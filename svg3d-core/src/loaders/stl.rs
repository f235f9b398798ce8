/// STL file parser for binary and ASCII formats
use nom::{
    bytes::complete::tag_no_case,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::double,
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::LoadError;
use crate::geometry::{Mesh, Triangle};
use crate::math::Vec3;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, LoadError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(LoadError::Stl("file too small to be a valid STL".into()));
    }

    // Triangle count follows the 80-byte header
    let count_bytes = [data[80], data[81], data[82], data[83]];
    let triangle_count = u32::from_le_bytes(count_bytes) as usize;

    let body = &data[HEADER_LEN + 4..];
    let needed = triangle_count.saturating_mul(FACET_LEN);
    if body.len() < needed {
        return Err(LoadError::Stl(format!(
            "unexpected end of file: {triangle_count} facets need {needed} bytes, found {}",
            body.len()
        )));
    }

    let triangles = body
        .chunks_exact(FACET_LEN)
        .take(triangle_count)
        .map(|facet| {
            // normal, three vertices, then a 2-byte attribute count we ignore
            let normal = read_vec3(&facet[0..12]);
            let v0 = read_vec3(&facet[12..24]);
            let v1 = read_vec3(&facet[24..36]);
            let v2 = read_vec3(&facet[36..48]);
            with_file_normal(Triangle::new(v0, v1, v2), normal)
        })
        .collect();

    Ok(Mesh::new(triangles))
}

fn read_vec3(bytes: &[u8]) -> Vec3 {
    let f = |i: usize| {
        let raw = [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
        f64::from(f32::from_le_bytes(raw))
    };
    Vec3::new(f(0), f(4), f(8))
}

/// Keep the stored normal unless it is missing (all zero)
fn with_file_normal(triangle: Triangle, normal: Vec3) -> Triangle {
    if normal.norm() > 0.0 && normal.iter().all(|c| c.is_finite()) {
        triangle.with_normal(normal.normalize())
    } else {
        triangle
    }
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, LoadError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(LoadError::Stl(format!("failed to parse ASCII STL: {e:?}"))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag_no_case("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endsolid"))(input)?;

    Ok((input, Mesh::new(triangles)))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag_no_case("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag_no_case("loop"))(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, v3) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag_no_case("endfacet"))(input)?;

    Ok((input, with_file_normal(Triangle::new(v1, v2, v3), normal)))
}

fn parse_vertex(input: &str) -> IResult<&str, Vec3> {
    preceded(preceded(multispace0, tag_no_case("vertex")), parse_vector3)(input)
}

fn parse_vector3(input: &str) -> IResult<&str, Vec3> {
    let (input, (_, x, _, y, _, z)) =
        tuple((multispace0, double, multispace1, double, multispace1, double))(input)?;
    Ok((input, Vec3::new(x, y, z)))
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, LoadError> {
    // Binary files may also start with "solid", so ASCII is only a first guess
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let head = &data[start..];
    if head.len() >= 5 && head[..5].eq_ignore_ascii_case(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_stl(facets: &[[[f32; 3]; 4]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_LEN];
        data.extend_from_slice(&(facets.len() as u32).to_le_bytes());
        for facet in facets {
            for v in facet {
                for c in v {
                    data.extend_from_slice(&c.to_le_bytes());
                }
            }
            data.extend_from_slice(&[0, 0]);
        }
        data
    }

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        // Set triangle count to 0
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 0);
        assert_eq!(mesh.bounding_box.size(), Vec3::zeros());
    }

    #[test]
    fn test_parse_binary_triangle() {
        let data = binary_stl(&[[
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [0.0, 3.0, 0.0],
        ]]);
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        let t = &mesh.triangles[0];
        assert_eq!(t.vertices[1], Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(t.normal, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.bounding_box.max, Vec3::new(2.0, 3.0, 0.0));
    }

    #[test]
    fn test_binary_zero_normal_is_recomputed() {
        let data = binary_stl(&[[
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]]);
        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles[0].normal, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_truncated_binary_is_an_error() {
        let mut data = binary_stl(&[[[0.0; 3]; 4]]);
        data[80..84].copy_from_slice(&2u32.to_le_bytes());
        assert!(matches!(parse_binary_stl(&data), Err(LoadError::Stl(_))));
        assert!(parse_binary_stl(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_parse_ascii() {
        let text = "solid pyramid\n\
            facet normal 0 0 1\n\
              outer loop\n\
                vertex 0 0 0\n\
                vertex 1 0 0\n\
                vertex 0 1 0\n\
              endloop\n\
            endfacet\n\
            facet normal 0 0 0\n\
              outer loop\n\
                vertex 0 0 0\n\
                vertex 0 1 0\n\
                vertex -1.5e0 0 0\n\
              endloop\n\
            endfacet\n\
            endsolid pyramid\n";
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.bounding_box.min, Vec3::new(-1.5, 0.0, 0.0));
        // zero normal in the file falls back to the winding
        assert_eq!(mesh.triangles[1].normal, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_parse_ascii_upper_case_keywords() {
        let text = "SOLID CUBE\n\
            FACET NORMAL 0 0 1\n\
              OUTER LOOP\n\
                VERTEX 0 0 0\n\
                VERTEX 1 0 0\n\
                VERTEX 0 1 0\n\
              ENDLOOP\n\
            ENDFACET\n\
            ENDSOLID CUBE\n";
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].normal, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_binary_with_solid_header() {
        let mut data = binary_stl(&[[
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        ]]);
        data[..5].copy_from_slice(b"solid");
        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
    }
}
