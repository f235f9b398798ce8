//! Mesh loaders for STL, OBJ and 3MF sources
//!
//! A loader turns raw bytes into an immutable [`Mesh`]; where the bytes come
//! from is the business of a [`SourceFetcher`].

pub mod obj;
pub mod source;
pub mod stl;
pub mod threemf;

use std::fmt;

use crate::error::LoadError;
use crate::geometry::Mesh;

pub use source::{DefaultFetcher, SourceFetcher};

/// File format of an external mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    Stl,
    Obj,
    ThreeMf,
}

impl MeshFormat {
    /// Decode `data` as a mesh in this format
    pub fn parse(self, data: &[u8]) -> Result<Mesh, LoadError> {
        match self {
            MeshFormat::Stl => stl::parse_stl(data),
            MeshFormat::Obj => obj::parse_obj(data),
            MeshFormat::ThreeMf => threemf::parse_3mf(data),
        }
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MeshFormat::Stl => "stl",
            MeshFormat::Obj => "obj",
            MeshFormat::ThreeMf => "3mf",
        })
    }
}

/// Cache key of an external mesh: the same URL read as two formats is two meshes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshSource {
    pub format: MeshFormat,
    pub url: String,
}

impl MeshSource {
    pub fn new(format: MeshFormat, url: impl Into<String>) -> Self {
        Self {
            format,
            url: url.into(),
        }
    }

    /// Fetch and decode this source
    pub fn load(&self, fetcher: &dyn SourceFetcher) -> Result<Mesh, LoadError> {
        let bytes = fetcher.fetch(&self.url)?;
        self.format.parse(&bytes)
    }
}

impl fmt::Display for MeshSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // data: URLs can be megabytes long
        const MAX: usize = 64;
        match self.url.char_indices().nth(MAX) {
            Some((end, _)) => write!(f, "{} {}...", self.format, &self.url[..end]),
            None => write!(f, "{} {}", self.format, self.url),
        }
    }
}
